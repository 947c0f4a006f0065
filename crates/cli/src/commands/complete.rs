use std::path::Path;
use std::process;
use std::sync::Arc;

use augur_complete::{EngineConfig, ObjectGraph, Session};

use crate::{read_source, report_error, CaretArgs, OutputFormat};

pub(crate) fn cmd_complete(
    file: &Path,
    caret: CaretArgs,
    config: EngineConfig,
    output: OutputFormat,
    quiet: bool,
) {
    let source = read_source(file, output, quiet);
    let mut session = Session::new(config).with_sandbox(Arc::new(ObjectGraph::ecmascript()));

    let set = match session.try_complete(&source, caret.position()) {
        Ok(set) => set,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&set)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            if set.is_empty() {
                if !quiet {
                    eprintln!("no completions");
                }
                return;
            }
            let width = set.iter().map(|c| c.display.len()).max().unwrap_or(0);
            for candidate in set.iter() {
                println!("{:<width$}  {}", candidate.display, candidate.score);
            }
        }
    }
}

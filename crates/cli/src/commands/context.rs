use std::path::Path;
use std::process;

use augur_complete::session::check_caret;
use augur_complete::{contextualize, IntentKind};
use serde::Serialize;

use crate::{read_source, report_error, CaretArgs, OutputFormat};

#[derive(Serialize)]
struct ContextReport<'a> {
    kind: IntentKind,
    chain: &'a [String],
    prefix: &'a str,
}

pub(crate) fn cmd_context(file: &Path, caret: CaretArgs, output: OutputFormat, quiet: bool) {
    let source = read_source(file, output, quiet);
    let position = caret.position();
    if let Err(e) = check_caret(&source, position) {
        report_error(&e.to_string(), output, quiet);
        process::exit(1);
    }

    let intent = contextualize(&source, position);
    match output {
        OutputFormat::Json => {
            let report = intent.as_ref().map(|intent| ContextReport {
                kind: intent.kind,
                chain: &intent.chain,
                prefix: intent.prefix(),
            });
            let json = serde_json::to_string_pretty(&report)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => match &intent {
            Some(intent) => {
                let kind = match intent.kind {
                    IntentKind::Identifier => "identifier",
                    IntentKind::Property => "property",
                    IntentKind::String => "string",
                    IntentKind::Regex => "regex",
                };
                println!("kind:   {}", kind);
                println!("chain:  {}", intent.chain.join("."));
                println!("prefix: {:?}", intent.prefix());
            }
            None => {
                if !quiet {
                    println!("no completion context at {}", position);
                }
            }
        },
    }
}

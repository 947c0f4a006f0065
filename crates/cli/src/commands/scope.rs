use std::path::Path;
use std::process;

use augur_complete::session::check_caret;
use augur_complete::{EngineConfig, Session, TypeStore};

use crate::{read_source, report_error, CaretArgs, OutputFormat};

pub(crate) fn cmd_scope(
    file: &Path,
    caret: CaretArgs,
    config: &EngineConfig,
    output: OutputFormat,
    quiet: bool,
) {
    let source = read_source(file, output, quiet);
    let position = caret.position();
    if let Err(e) = check_caret(&source, position) {
        report_error(&e.to_string(), output, quiet);
        process::exit(1);
    }

    let mut session = Session::new(config.clone());
    session.invalidate_cache(&source, position);
    let Some(store) = session.store() else {
        // the session only keeps the store; parse again for the message
        let msg = match augur_core::parse(&source) {
            Err(e) => e.to_string(),
            Ok(_) => format!("no analysis for '{}'", file.display()),
        };
        report_error(&msg, output, quiet);
        process::exit(1);
    };

    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&*store)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            if store.properties.is_empty() && !quiet {
                println!("(no symbols)");
            }
            for (name, child) in &store.properties {
                print_store(name, child, 0);
            }
        }
    }
}

fn print_store(name: &str, store: &TypeStore, depth: usize) {
    let types: Vec<String> = store
        .ty
        .iter()
        .map(|t| format!("{}#{}", t.origin, t.index))
        .collect();
    println!(
        "{:indent$}{} [{}] weight {}",
        "",
        name,
        types.join(", "),
        store.weight,
        indent = depth * 2
    );
    for (child_name, child) in &store.properties {
        print_store(child_name, child, depth + 1);
    }
    if let Some(sources) = &store.sources {
        for (index, source) in sources.iter().enumerate() {
            if source.is_leaf() {
                continue;
            }
            let label = match index {
                0 => "(this)".to_string(),
                1 => "(return)".to_string(),
                n => format!("(param {})", n - 2),
            };
            print_store(&label, source, depth + 1);
        }
    }
}

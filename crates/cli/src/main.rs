mod commands;
mod tracing_config;

use std::path::{Path, PathBuf};
use std::process;

use augur_complete::EngineConfig;
use augur_core::Position;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// JavaScript code completion from the command line.
#[derive(Parser)]
#[command(name = "augur", version, about = "Scope-aware JavaScript code completion")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Caret location, one-based like an editor's status bar.
#[derive(Args, Debug, Clone, Copy)]
pub(crate) struct CaretArgs {
    /// Line of the caret (1-based)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    line: u32,
    /// Column of the caret in characters (1-based)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    column: u32,
}

impl CaretArgs {
    pub(crate) fn position(&self) -> Position {
        Position::new(self.line - 1, self.column - 1)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List ranked completions at a caret
    Complete {
        /// Path to the JavaScript source file
        file: PathBuf,
        #[command(flatten)]
        caret: CaretArgs,
        /// Do not consult the built-in ECMAScript globals
        #[arg(long)]
        no_sandbox: bool,
        /// Do not offer keywords
        #[arg(long)]
        no_keywords: bool,
    },

    /// Show what is being completed at a caret
    Context {
        /// Path to the JavaScript source file
        file: PathBuf,
        #[command(flatten)]
        caret: CaretArgs,
    },

    /// Dump the symbol table built for a caret
    Scope {
        /// Path to the JavaScript source file
        file: PathBuf,
        #[command(flatten)]
        caret: CaretArgs,
    },
}

fn main() {
    tracing_config::init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.output, cli.quiet);

    match cli.command {
        Commands::Complete {
            file,
            caret,
            no_sandbox,
            no_keywords,
        } => {
            let mut config = config;
            config.sandbox &= !no_sandbox;
            config.keywords &= !no_keywords;
            commands::complete::cmd_complete(&file, caret, config, cli.output, cli.quiet);
        }
        Commands::Context { file, caret } => {
            commands::context::cmd_context(&file, caret, cli.output, cli.quiet);
        }
        Commands::Scope { file, caret } => {
            commands::scope::cmd_scope(&file, caret, &config, cli.output, cli.quiet);
        }
    }
}

fn load_config(path: Option<&Path>, output: OutputFormat, quiet: bool) -> EngineConfig {
    let Some(path) = path else {
        return EngineConfig::default();
    };
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading config '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    match toml::from_str(&text) {
        Ok(config) => config,
        Err(e) => {
            let msg = format!("invalid config '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) fn read_source(file: &Path, output: OutputFormat, quiet: bool) -> String {
    match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", file.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}

//! Diagnostic logging for the `augur` binary.
//!
//! Output format is chosen by `AUGUR_LOG_FORMAT`:
//!
//! - `text` (default): standard `tracing-subscriber` lines
//! - `json`: one JSON object per event
//!
//! ```bash
//! AUGUR_LOG=debug augur complete app.js --line 12 --column 8
//! AUGUR_LOG=augur_complete::scope=trace AUGUR_LOG_FORMAT=json augur scope app.js --line 3 --column 1
//! ```
//!
//! The subscriber is only installed when `AUGUR_LOG` (or `RUST_LOG`) is
//! set. Everything goes to stderr; stdout carries only command output.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn from_env() -> Self {
        match std::env::var("AUGUR_LOG_FORMAT")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// `AUGUR_LOG` wins over `RUST_LOG` when both are set.
fn build_filter() -> EnvFilter {
    match std::env::var("AUGUR_LOG") {
        Ok(val) => EnvFilter::builder().parse_lossy(val),
        Err(_) => EnvFilter::from_default_env(),
    }
}

pub fn init_tracing() {
    let has_augur_log = std::env::var("AUGUR_LOG").is_ok();
    let has_rust_log = std::env::var("RUST_LOG").is_ok();
    if !has_augur_log && !has_rust_log {
        return;
    }

    let filter = build_filter();
    match LogFormat::from_env() {
        LogFormat::Json => {
            let json_layer = fmt::layer().json().with_writer(std::io::stderr);
            Registry::default().with(filter).with(json_layer).init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

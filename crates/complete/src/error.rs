use augur_core::SyntaxError;

/// Errors surfaced by the completion engine.
///
/// Routine failures (unparseable buffers, a caret outside any token) are
/// recovered inside the engine and never show up here; these are the
/// cases a caller has to act on.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The buffer could not be parsed and no earlier analysis exists.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// A background parse task panicked or was cancelled.
    #[error("background parse failed: {0}")]
    Worker(String),

    /// The caret does not map to a location in the buffer. Fields are
    /// zero-based; the message is one-based like every other position.
    #[error("caret {}:{} is outside the buffer", .line + 1, .column + 1)]
    InvalidCaret { line: u32, column: u32 },
}

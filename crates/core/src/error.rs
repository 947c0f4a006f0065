use serde::Serialize;

use crate::span::Position;

/// A lexing or parsing failure.
///
/// The position is where the offending token starts, zero-based.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("syntax error at {position}: {message}")]
pub struct SyntaxError {
    pub message: String,
    pub position: Position,
}

impl SyntaxError {
    pub fn new(position: Position, message: impl Into<String>) -> Self {
        SyntaxError {
            message: message.into(),
            position,
        }
    }
}

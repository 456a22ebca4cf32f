use std::{error::Error, fmt::Display};

use super::Position;

/// Raised when the parse tree has a shape the transformer does not
/// recognize. This indicates grammar drift, i.e. an engine bug rather
/// than a user error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformError {
    pub message: String,
    pub position: Position,
}

impl TransformError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl Display for TransformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (file, line, col) = &self.position;
        f.write_str(&format!(
            "internal transform error: {} ({}:{}:{})",
            self.message, file, line, col
        ))
    }
}

impl Error for TransformError {}

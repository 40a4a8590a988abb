//! Scanner error type.

use thiserror::Error;

/// Raised when a grammar cannot make forward progress.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ScannerError {
    /// Error message.
    pub message: String,
    /// Byte offset where the error occurred.
    pub offset: usize,
}

impl ScannerError {
    /// Creates a new scanner error.
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

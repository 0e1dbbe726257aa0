//! Error types for the rowboat reader

use thiserror::Error;

/// Reader error types
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Parse error at byte offset {offset}: {message}")]
    Parse {
        /// Absolute byte offset of the failing record
        offset: usize,
        /// Human-readable description of the failure
        message: String,
    },
    #[error("Allocation failure while growing output to {requested} rows")]
    Allocation {
        /// Row capacity that could not be allocated
        requested: usize,
    },
    #[error("Read interrupted")]
    Interrupted,
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReadError {
    /// True for the cooperative-cancellation variant, which maps to its own
    /// terminal progress status.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, ReadError::Interrupted)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ReadError>;

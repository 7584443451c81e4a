//! # Centralized Error Handling
//!
//! Unified error types for the entire crate using `thiserror`.

use thiserror::Error;

/// Main error type for diagfill operations
#[derive(Error, Debug)]
pub enum DiagfillError {
    /// I/O errors (thread spawn failures, unreadable files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors (non-positive or out-of-range arguments)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A fill worker could not build its generator, failed, or panicked
    #[error("Worker {worker} failed: {message}")]
    WorkerFailure { worker: usize, message: String },

    /// A filled row whose diagonal does not equal its off-diagonal sum
    #[error("Row-sum invariant violated at row {row}")]
    Invariant { row: usize },

    /// Parse errors in kernel counter text
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Type alias for Results using DiagfillError
pub type Result<T> = std::result::Result<T, DiagfillError>;

impl DiagfillError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a worker failure for the given worker index
    pub fn worker(worker: usize, message: impl Into<String>) -> Self {
        Self::WorkerFailure {
            worker,
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Whether this error came from argument validation
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

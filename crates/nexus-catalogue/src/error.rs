//! Error types for the catalogue crate.
//!
//! These cover loading configuration and writing CSV output. Catalogue
//! problems are reported as [`ValidationError`](crate::ValidationError)
//! values.

use thiserror::Error;

/// Errors that can occur while preparing a validation run or writing its output.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// CSV writer error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Output that is not valid UTF-8.
    #[error("invalid UTF-8 in output: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Configuration values that contradict each other.
    #[error("invalid image size bounds: minimum {min} exceeds maximum {max}")]
    InvalidBounds { min: u64, max: u64 },
}

/// Result type for catalogue operations.
pub type Result<T> = std::result::Result<T, Error>;

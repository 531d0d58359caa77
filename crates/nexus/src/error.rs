//! Error types for the ingestion session.

use thiserror::Error;

/// Errors raised by [`IndexSession`](crate::session::IndexSession).
#[derive(Debug, Error)]
pub enum Error {
    /// Indexing the selected archive failed.
    #[error("failed to index archive: {0}")]
    Index(String),

    /// A newer selection replaced the one being waited on.
    #[error("selection {0} was superseded by a newer archive")]
    Superseded(u64),
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, Error>;

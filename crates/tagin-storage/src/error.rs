use thiserror::Error;

/// Storage-specific error types for the tagin station.
///
/// These errors cover failures reading or writing the member store, the
/// changelog and the daily tap logs.
#[derive(Debug, Error)]
pub enum StorageError {
    /// File system operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored line could not be decoded
    #[error("Malformed record: {0}")]
    Malformed(String),

    /// Commit task did not run to completion
    #[error("Commit task failed: {0}")]
    Commit(#[from] tokio::task::JoinError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Domain type rejected a stored value
    #[error(transparent)]
    Core(#[from] tagin_core::Error),
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

//! Web layer errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tagin_storage::StorageError;
use thiserror::Error;

/// Errors raised while serving the dashboard.
#[derive(Debug, Error)]
pub enum WebError {
    /// Listener could not be bound
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Low-level I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Member store failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for web operations.
pub type WebResult<T> = Result<T, WebError>;

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        // Details stay in the log; the dashboard is on an open workshop LAN.
        tracing::error!(error = %self, "Request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
    }
}

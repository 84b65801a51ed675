//! Client error types

use shared::error::{AppError, ErrorCode};
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed (connect, timeout, body decode)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Authentication required
    #[error("Authentication required")]
    Unauthorized,

    /// Permission denied
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request rejected by the store
    #[error("Validation error: {0}")]
    Validation(String),

    /// Any other non-success status
    #[error("{message}")]
    Status { status: u16, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Text shown to the operator for a failed chunk
    ///
    /// Store-provided bodies are returned verbatim; an empty body was already
    /// replaced with `HTTP <status>` when the response was handled.
    pub fn reason(&self) -> String {
        match self {
            ClientError::Forbidden(text)
            | ClientError::NotFound(text)
            | ClientError::Validation(text)
            | ClientError::InvalidResponse(text) => text.clone(),
            ClientError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Transport-level failure (no response from the store)
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Http(_))
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        let code = match &err {
            ClientError::Http(_) | ClientError::Unauthorized | ClientError::Forbidden(_) => {
                ErrorCode::StoreUnavailable
            }
            ClientError::NotFound(_) => ErrorCode::NotFound,
            ClientError::Validation(_) => ErrorCode::ValidationFailed,
            ClientError::Status { .. } => ErrorCode::StoreUnavailable,
            ClientError::InvalidResponse(_) | ClientError::Serialization(_) => {
                ErrorCode::InvalidStoreResponse
            }
        };
        AppError::with_message(code, err.reason())
    }
}

//! Error types for platform session calls.
//!
//! Widget-level errors (like `AlreadyRunning`) live in `pinwheel-widget`;
//! this module only covers failures reported by the chat-platform client.

use thiserror::Error;

// =============================================================================
// API Errors
// =============================================================================

/// Error type for calls made through a [`Session`](crate::Session).
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The session is not connected.
    #[error("session is not connected")]
    NotConnected,
    /// The API call timed out.
    #[error("API call timed out")]
    Timeout,
    /// The requested message, channel or emoji does not exist.
    #[error("{0} not found")]
    NotFound(String),
    /// The bot lacks the permission for this call.
    #[error("missing permission: {0}")]
    Forbidden(String),
    /// The platform rejected the call.
    #[error("platform error ({code}): {message}")]
    Platform { code: i64, message: String },
    /// Failed to serialize/deserialize.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl ApiError {
    /// Creates a not-found error for the given resource description.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for session calls.
pub type ApiResult<T> = Result<T, ApiError>;

//! Widget error types.

use pinwheel_core::ApiError;
use thiserror::Error;

/// Errors returned by widget operations.
#[derive(Debug, Clone, Error)]
pub enum WidgetError {
    /// Spawn or Hook was called while the listen loop is active.
    #[error("widget already running")]
    AlreadyRunning,

    /// A page index outside the paginator's pages.
    #[error("index {index} is out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// The widget has no message yet.
    #[error("message is nil")]
    NilMessage,

    /// The widget (or the hooked message) has no embed.
    #[error("embed is nil")]
    NilEmbed,

    /// Close was called while no listen loop is active.
    #[error("widget is not running")]
    NotRunning,

    /// No reply arrived before the query deadline.
    #[error("timed out")]
    Timeout,

    /// The platform client reported an error.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result type for widget operations.
pub type WidgetResult<T> = Result<T, WidgetError>;

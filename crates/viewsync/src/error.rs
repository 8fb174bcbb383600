//! Error types for list views.

use viewsync_core::CoreError;

use crate::api::Method;

/// Result type alias for list view operations.
pub type Result<T> = std::result::Result<T, ViewError>;

/// Errors that can occur while handling list view requests.
///
/// All validation errors are raised before any view state is touched.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    /// A negative window start was requested.
    #[error("Negative range start not allowed: {0}")]
    NegativeRangeStart(i64),

    /// The requested sort property is not part of the schema.
    #[error("Invalid sort property '{0}'")]
    InvalidSortProperty(String),

    /// The requested filter property is not part of the schema.
    #[error("Invalid filter property '{0}'")]
    InvalidFilterProperty(String),

    /// The requested filter method is unknown.
    #[error("Invalid filter method {0}")]
    InvalidFilterMethod(u8),

    /// An item range with its end before its start.
    #[error("Invalid item range {start}..{end}")]
    InvalidRange { start: usize, end: usize },

    /// The request body could not be decoded.
    #[error("Invalid request body: {0}")]
    InvalidRequest(#[from] serde_json::Error),

    /// No handler matches the request.
    #[error("No handler for {method} '{path}'")]
    UnknownRoute { method: Method, path: String },

    /// The periodic job failed.
    #[error("Timer error: {0}")]
    Timer(#[from] CoreError),
}

impl ViewError {
    /// Create an unknown-route error.
    pub fn unknown_route(method: Method, path: &[String]) -> Self {
        Self::UnknownRoute {
            method,
            path: path.join("/"),
        }
    }

    /// Whether the error was caused by the client's input, as opposed to an
    /// internal failure.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Timer(_))
    }
}

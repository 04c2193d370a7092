//! Backend gateway error types
//!
//! Defines all errors that can occur while talking to the hosted
//! auth service or the REST tables.

use thiserror::Error;

/// PostgREST code for "the result contains 0 rows" on single-row requests
pub const NO_ROWS_CODE: &str = "PGRST116";

/// Errors that can occur when communicating with the backend
#[derive(Error, Debug)]
pub enum BackendError {
    /// Could not connect to the backend
    #[error("Backend unavailable")]
    Unavailable,

    /// The request did not complete in time
    #[error("Request timeout")]
    Timeout,

    /// Transport-level failure
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with an error status
    #[error("API error {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The identity service rejected the credentials or token
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The operation needs a signed-in session
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Too many requests, retries exhausted
    #[error("Rate limited")]
    RateLimited,

    /// A row addressed by id does not exist
    #[error("Row not found: {0}")]
    RowNotFound(String),

    /// Response body did not match the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Reading or writing the persisted session failed
    #[error("Session file error: {0}")]
    SessionFile(String),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BackendError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendError::Unavailable | BackendError::Timeout | BackendError::RateLimited
        )
    }

    /// Whether this is the "no row" answer to a single-row lookup
    pub fn is_no_rows(&self) -> bool {
        match self {
            BackendError::Api { code, .. } => code.as_deref() == Some(NO_ROWS_CODE),
            BackendError::RowNotFound(_) => true,
            _ => false,
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if err.is_connect() {
            BackendError::Unavailable
        } else {
            BackendError::Request(err)
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Parse(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for BackendError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        BackendError::Timeout
    }
}

/// Result type alias for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

//! Remote call error types.

use thiserror::Error;

/// Errors reported by [`DestinationApi`](super::DestinationApi) and
/// [`AttachmentSource`](super::AttachmentSource) implementations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request did not complete in time.
    #[error("Request timed out")]
    Timeout,

    /// The connection failed before a response was received.
    #[error("Connection error: {0}")]
    Transport(String),

    /// The remote asked us to slow down.
    #[error("Rate limited by remote (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// The remote failed with a 5xx status.
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// The remote rejected the request with a 4xx status.
    #[error("Request rejected with {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The response could not be understood.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Classifies a non-success HTTP status.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>, retry_after_secs: Option<u64>) -> Self {
        let message = message.into();
        match status {
            429 => Self::RateLimited { retry_after_secs },
            408 => Self::Timeout,
            500..=599 => Self::Server { status, message },
            _ => Self::Rejected { status, message },
        }
    }

    /// Returns true if repeating the same request may succeed.
    ///
    /// Validation failures (4xx other than 408/429) and undecodable responses
    /// are permanent.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Transport(_) | Self::RateLimited { .. } | Self::Server { .. }
        )
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::Timeout;
        }
        if let Some(status) = error.status() {
            return Self::from_status(status.as_u16(), error.to_string(), None);
        }
        if error.is_decode() {
            return Self::InvalidResponse(error.to_string());
        }
        Self::Transport(error.to_string())
    }
}

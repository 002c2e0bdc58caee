//! Taiga client error types.

use crate::remote::ApiError;
use thiserror::Error;

/// Errors that prevent the Taiga client from being set up.
#[derive(Debug, Error)]
pub enum TaigaError {
    /// The host is not a valid base URL.
    #[error("Invalid Taiga host '{host}': {source}")]
    InvalidHost {
        host: String,
        #[source]
        source: url::ParseError,
    },

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// Login was refused or failed.
    #[error("Taiga authentication failed for '{username}': {source}")]
    Authentication {
        username: String,
        #[source]
        source: ApiError,
    },

    /// The project could not be loaded.
    #[error("Failed to load Taiga project '{slug}': {source}")]
    Project {
        slug: String,
        #[source]
        source: ApiError,
    },
}

//! Status registry error types.

use serde::Serialize;
use thiserror::Error;

/// A record's status could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusError {
    /// The status does not exist and auto-creation is disabled.
    #[error("Unknown status '{name}'")]
    Unknown { name: String },

    /// Creating the status failed, including the retry after re-listing.
    #[error("Failed to create status '{name}': {message}")]
    Registry { name: String, message: String },
}

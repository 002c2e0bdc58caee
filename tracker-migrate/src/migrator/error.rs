//! Orchestrator error types.

use crate::remote::ApiError;
use thiserror::Error;

/// Errors that stop a migration before any record is processed.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// The destination could not be queried for its roster or statuses.
    #[error("Destination unreachable while listing {what}: {source}")]
    Unreachable {
        what: &'static str,
        #[source]
        source: ApiError,
    },
}

//! Ledger error types.

use thiserror::Error;

/// Errors reading or writing the migration ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Failed to read or write the ledger file.
    #[error("Failed to access ledger '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The ledger file is not valid JSON for this format.
    #[error("Failed to parse ledger '{path}': {source}")]
    JsonError {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The ledger was written by an incompatible version.
    #[error("Ledger '{path}' has unsupported version {version}")]
    UnsupportedVersion { path: String, version: u32 },
}

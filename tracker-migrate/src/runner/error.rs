//! Runner error types.

/// Errors that stop a run before records are processed.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Configuration errors.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// The export could not be read or lacks required columns.
    #[error(transparent)]
    Export(#[from] crate::records::ExportError),

    /// The ledger could not be loaded.
    #[error(transparent)]
    Ledger(#[from] crate::ledger::LedgerError),

    /// Taiga login or project lookup failed.
    #[error(transparent)]
    Taiga(#[from] crate::taiga::TaigaError),

    /// The destination could not be queried.
    #[error(transparent)]
    Migrate(#[from] crate::migrator::MigrateError),

    /// HTTP client initialization errors.
    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

//! Errors raised while building [`MigrationConfig`](super::MigrationConfig).

use thiserror::Error;

/// Errors from reading, parsing or validating migration options.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("Failed to read file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has unknown value types.
    #[error("Failed to parse config '{path}': {source}")]
    TomlError {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// A value is out of range or malformed. `path` names the file or
    /// environment variable it came from.
    #[error("Validation error in '{path}': {message}")]
    ValidationError { path: String, message: String },

    /// An explicitly requested config file does not exist.
    #[error("Missing required file: {path}")]
    MissingFile { path: String },
}

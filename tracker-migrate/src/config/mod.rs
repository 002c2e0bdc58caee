//! Configuration loading.
//!
//! Options come from three layers, later ones winning:
//!
//! 1. built-in defaults ([`MigrationConfig::default`]),
//! 2. an optional TOML file,
//! 3. environment overrides ([`SHORT_USER_MAPPING_ENV`], then [`USER_MAPPING_ENV`]).
//!
//! Command line flags are applied on top by the caller.

mod error;
mod migration;

pub use error::ConfigError;
pub use migration::{MigrationConfig, DEFAULT_COMMENT_TEMPLATE};

use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Environment variable holding extra user mapping entries, in the form
/// `"Jira Name:Taiga Name, Other Name:@username"`.
pub const USER_MAPPING_ENV: &str = "TRACKER_MIGRATE_USER_MAPPING";

/// Unprefixed name for the same mapping. Applied before [`USER_MAPPING_ENV`].
pub const SHORT_USER_MAPPING_ENV: &str = "USER_MAPPING";

/// Builds the migration options from defaults, an optional file and the
/// environment.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be loaded or a value is invalid.
pub fn load_config(path: Option<&Path>) -> Result<MigrationConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            info!(path = %path.display(), "Loading config file");
            MigrationConfig::load(path)?
        }
        None => MigrationConfig::default(),
    };

    for var in [SHORT_USER_MAPPING_ENV, USER_MAPPING_ENV] {
        if let Ok(raw) = std::env::var(var) {
            let mapping = parse_user_mapping(&raw, var)?;
            debug!(var, entries = mapping.len(), "Applying user mapping from environment");
            config.user_mapping.extend(mapping);
        }
    }

    config.validate("configuration")?;
    Ok(config)
}

/// Parses `"A:B, C:D"` into `{A: B, C: D}`. Blank entries are ignored.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] naming `origin` for entries
/// without a `:` or with an empty side.
pub fn parse_user_mapping(
    raw: &str,
    origin: &str,
) -> Result<HashMap<String, String>, ConfigError> {
    let mut mapping = HashMap::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let parsed = entry
            .split_once(':')
            .map(|(from, to)| (from.trim(), to.trim()))
            .filter(|(from, to)| !from.is_empty() && !to.is_empty());

        let Some((from, to)) = parsed else {
            return Err(ConfigError::ValidationError {
                path: origin.to_string(),
                message: format!("user mapping entry '{entry}' is not 'Source Name:Destination Name'"),
            });
        };
        mapping.insert(from.to_string(), to.to_string());
    }

    Ok(mapping)
}

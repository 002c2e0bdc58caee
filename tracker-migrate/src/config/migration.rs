//! Migration options.

use crate::config::ConfigError;
use crate::markup::RenderMode;
use crate::retry::RetryPolicy;
use crate::statuses::UnknownStatusPolicy;
use crate::templates::check_template;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Default Handlebars template for the attribution block put in front of each
/// migrated comment. Variables: `author`, `timestamp`, `body`.
pub const DEFAULT_COMMENT_TEMPLATE: &str =
    "{{#if author}}**{{author}}**{{#if timestamp}} ({{timestamp}}){{/if}}:\n\n{{/if}}{{body}}";

/// Options controlling a migration run.
///
/// Loaded from a TOML file with kebab-case keys; every key is optional.
///
/// ```toml
/// reset-statuses = true
/// unknown-status-policy = "default"
/// fuzzy-match-threshold = 0.85
/// description-format = "markdown"
///
/// [user-mapping]
/// "Jon Smith" = "Jonathan Smith"
///
/// [retry]
/// max-attempts = 5
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MigrationConfig {
    /// Resolve and convert everything but make no mutating calls.
    pub dry_run: bool,

    /// Create statuses the destination project does not have yet.
    pub reset_statuses: bool,

    /// What to do with records whose status is unknown and not created.
    pub unknown_status_policy: UnknownStatusPolicy,

    /// Source display name to destination name, checked before any matching.
    pub user_mapping: HashMap<String, String>,

    /// Minimum Jaro-Winkler score for a fuzzy assignee match.
    pub fuzzy_match_threshold: f64,

    /// Minimum lead of the best fuzzy candidate over the runner-up.
    pub fuzzy_tie_margin: f64,

    /// Maximum concurrent attachment uploads per record.
    pub attachment_upload_concurrency: usize,

    /// Convert comment bodies from Jira markup.
    pub convert_comments: bool,

    /// Format descriptions are sent in.
    pub description_format: RenderMode,

    /// Download and upload attachments. When off, attachments are reported as skipped.
    pub download_attachments: bool,

    /// Handlebars template for migrated comments.
    pub comment_template: String,

    /// Retry settings for remote calls.
    pub retry: RetryPolicy,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            reset_statuses: true,
            unknown_status_policy: UnknownStatusPolicy::default(),
            user_mapping: HashMap::new(),
            fuzzy_match_threshold: 0.8,
            fuzzy_tie_margin: 0.02,
            attachment_upload_concurrency: 4,
            convert_comments: true,
            description_format: RenderMode::default(),
            download_attachments: true,
            comment_template: DEFAULT_COMMENT_TEMPLATE.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl MigrationConfig {
    /// Loads options from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is missing, unreadable, or invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Loading migration config");

        if !path.exists() {
            return Err(ConfigError::MissingFile {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlError {
            path: path.display().to_string(),
            source: e,
        })?;

        config.validate(&path.display().to_string())?;
        Ok(config)
    }

    /// Validates option ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming `origin` for the first
    /// invalid option.
    pub fn validate(&self, origin: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| {
            Err(ConfigError::ValidationError {
                path: origin.to_string(),
                message,
            })
        };

        if !(0.0..=1.0).contains(&self.fuzzy_match_threshold) {
            return invalid(format!(
                "fuzzy-match-threshold must be between 0 and 1, got {}",
                self.fuzzy_match_threshold
            ));
        }
        if self.fuzzy_tie_margin.is_nan() || self.fuzzy_tie_margin < 0.0 {
            return invalid(format!(
                "fuzzy-tie-margin must not be negative, got {}",
                self.fuzzy_tie_margin
            ));
        }
        if self.attachment_upload_concurrency == 0 {
            return invalid("attachment-upload-concurrency must be at least 1".to_string());
        }
        if self.retry.max_attempts == 0 {
            return invalid("retry.max-attempts must be at least 1".to_string());
        }
        if self.comment_template.trim().is_empty() {
            return invalid("comment-template must not be empty".to_string());
        }
        if let Err(e) = check_template(&self.comment_template) {
            return invalid(format!("comment-template: {e}"));
        }
        Ok(())
    }
}

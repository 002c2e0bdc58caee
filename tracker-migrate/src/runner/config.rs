//! Runner configuration.

use crate::config::MigrationConfig;
use crate::jira::JiraCredentials;
use std::path::{Path, PathBuf};

/// Connection settings for the destination Taiga project.
#[derive(Clone)]
pub struct TaigaSettings {
    pub host: String,
    pub username: String,
    pub password: String,
    pub project_slug: String,
}

impl std::fmt::Debug for TaigaSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaigaSettings")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("project_slug", &self.project_slug)
            .finish()
    }
}

/// Configuration for a migration run.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Path to the Jira CSV export.
    export_path: PathBuf,
    /// Where the ledger is kept.
    ledger_path: PathBuf,
    /// Destination project.
    taiga: TaigaSettings,
    /// Credentials for downloading attachments, if they need any.
    jira: Option<JiraCredentials>,
    /// Migration options.
    migration: MigrationConfig,
}

impl RunnerConfig {
    /// Creates a new configuration for a run. The ledger defaults to
    /// `<export>.ledger.json` next to the export.
    pub fn new(export_path: PathBuf, taiga: TaigaSettings, migration: MigrationConfig) -> Self {
        let ledger_path = default_ledger_path(&export_path);
        Self {
            export_path,
            ledger_path,
            taiga,
            jira: None,
            migration,
        }
    }

    /// Sets a custom ledger path.
    pub fn with_ledger_path(mut self, ledger_path: PathBuf) -> Self {
        self.ledger_path = ledger_path;
        self
    }

    /// Sets the credentials used for attachment downloads.
    pub fn with_jira_credentials(mut self, credentials: JiraCredentials) -> Self {
        self.jira = Some(credentials);
        self
    }

    /// Returns the export path.
    pub fn export_path(&self) -> &Path {
        &self.export_path
    }

    /// Returns the ledger path.
    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    /// Returns the Taiga connection settings.
    pub fn taiga(&self) -> &TaigaSettings {
        &self.taiga
    }

    /// Returns the Jira credentials, if set.
    pub fn jira(&self) -> Option<&JiraCredentials> {
        self.jira.as_ref()
    }

    /// Returns the migration options.
    pub fn migration(&self) -> &MigrationConfig {
        &self.migration
    }

    /// Returns whether dry-run mode is enabled.
    pub fn dry_run(&self) -> bool {
        self.migration.dry_run
    }
}

fn default_ledger_path(export_path: &Path) -> PathBuf {
    let mut name = export_path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "export".into());
    name.push(".ledger.json");
    export_path.with_file_name(name)
}

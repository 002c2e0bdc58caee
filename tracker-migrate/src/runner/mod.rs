//! Orchestrates a complete migration run.

mod config;
mod error;

pub use config::{RunnerConfig, TaigaSettings};
pub use error::RunnerError;

use crate::jira::JiraAttachments;
use crate::ledger::Ledger;
use crate::migrator::{Migrator, RunMode};
use crate::records::load_export;
use crate::summary::RunSummary;
use crate::taiga::TaigaClient;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

/// Loads the export, connects to both trackers and migrates every record.
pub struct Runner {
    config: RunnerConfig,
    stop: Option<Arc<AtomicBool>>,
}

impl Runner {
    /// Builds a runner from the provided configuration.
    pub fn new(config: RunnerConfig) -> Self {
        Self { config, stop: None }
    }

    /// Sets a flag that, once raised, makes the run skip the remaining records.
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    /// Executes the full migration flow.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] for problems detected before any record is
    /// processed. Per-record failures are reported in the summary instead.
    pub async fn run(&self) -> Result<RunSummary, RunnerError> {
        let mode = if self.config.dry_run() {
            RunMode::DryRun
        } else {
            RunMode::Apply
        };

        info!(path = %self.config.export_path().display(), "Loading export");
        let export = load_export(self.config.export_path())?;
        if export.records.is_empty() {
            warn!("No records to migrate");
            let mut summary = RunSummary::new(mode == RunMode::DryRun);
            summary.malformed = export.malformed;
            return Ok(summary);
        }

        let ledger = Ledger::load(self.config.ledger_path())?;

        let taiga = self.config.taiga();
        let destination =
            TaigaClient::connect(&taiga.host, &taiga.username, &taiga.password, &taiga.project_slug)
                .await?;
        let attachments = JiraAttachments::new(self.config.jira().cloned())?;

        let mut migrator = Migrator::connect(
            &destination,
            &attachments,
            self.config.migration().clone(),
            ledger,
        )
        .await?;
        if let Some(flag) = &self.stop {
            migrator = migrator.with_stop_flag(Arc::clone(flag));
        }

        let mut summary = migrator.migrate(&export.records, mode).await;
        summary.malformed = export.malformed;
        Ok(summary)
    }
}

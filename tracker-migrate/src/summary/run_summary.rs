//! Run summary types.

use super::result::{MigrationResult, RecordOutcome};
use crate::records::MalformedRowError;
use crate::users::Resolution;
use serde::Serialize;

/// Summary of a complete run. Counts are derived from the results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Whether this was a dry run.
    pub dry_run: bool,

    /// Per-record results in export order.
    pub results: Vec<MigrationResult>,

    /// Rows that could not be parsed.
    pub malformed: Vec<MalformedRowError>,
}

impl RunSummary {
    /// Creates a new empty summary.
    #[must_use]
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    /// Adds a record result.
    pub fn record_result(&mut self, result: MigrationResult) {
        self.results.push(result);
    }

    fn count_outcomes(&self, predicate: impl Fn(&RecordOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| predicate(&r.outcome)).count()
    }

    #[must_use]
    pub fn records_created(&self) -> usize {
        self.count_outcomes(|o| matches!(o, RecordOutcome::Created { .. }))
    }

    #[must_use]
    pub fn records_planned(&self) -> usize {
        self.count_outcomes(|o| matches!(o, RecordOutcome::Planned))
    }

    #[must_use]
    pub fn records_already_migrated(&self) -> usize {
        self.count_outcomes(|o| matches!(o, RecordOutcome::AlreadyMigrated { .. }))
    }

    #[must_use]
    pub fn records_skipped(&self) -> usize {
        self.count_outcomes(|o| matches!(o, RecordOutcome::Skipped { .. }))
    }

    #[must_use]
    pub fn records_failed(&self) -> usize {
        self.count_outcomes(|o| matches!(o, RecordOutcome::Failed { .. }))
    }

    #[must_use]
    pub fn comments_created(&self) -> usize {
        self.results
            .iter()
            .flat_map(|r| &r.comments)
            .filter(|c| c.outcome.is_created())
            .count()
    }

    #[must_use]
    pub fn comments_failed(&self) -> usize {
        self.results
            .iter()
            .flat_map(|r| &r.comments)
            .filter(|c| c.outcome.is_failed())
            .count()
    }

    #[must_use]
    pub fn attachments_uploaded(&self) -> usize {
        self.results
            .iter()
            .flat_map(|r| &r.attachments)
            .filter(|a| a.outcome.is_created())
            .count()
    }

    #[must_use]
    pub fn attachments_failed(&self) -> usize {
        self.results
            .iter()
            .flat_map(|r| &r.attachments)
            .filter(|a| a.outcome.is_failed())
            .count()
    }

    /// Records whose assignee could not be resolved.
    #[must_use]
    pub fn unassigned(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.assignment, Some(Resolution::Unassigned { .. })))
            .count()
    }

    /// Returns true if any record, comment or attachment failed, or any row
    /// was malformed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.malformed.is_empty() || self.results.iter().any(MigrationResult::has_failures)
    }

    /// Returns true if all operations were successful.
    #[must_use]
    pub fn all_success(&self) -> bool {
        !self.has_failures()
    }
}

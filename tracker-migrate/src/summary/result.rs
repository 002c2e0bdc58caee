//! Per-record result types.

use crate::records::SourceRecord;
use crate::statuses::ResolvedStatus;
use crate::users::Resolution;
use serde::Serialize;

/// What happened to the record itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordOutcome {
    /// Created in this run.
    Created { record_id: u64 },
    /// Would be created (dry run).
    Planned,
    /// Found in the ledger; not created again.
    AlreadyMigrated { record_id: u64 },
    /// Deliberately not migrated.
    Skipped { reason: String },
    /// Creation failed. Comments and attachments were not attempted.
    Failed { error: String },
}

/// What happened to one comment or attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// Created in this run.
    Created { id: u64 },
    /// Would be created (dry run).
    Planned,
    /// Created by an earlier run, according to the ledger.
    AlreadyDone { id: u64 },
    Skipped { reason: String },
    Failed { error: String },
}

impl ItemOutcome {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    #[must_use]
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}

/// Outcome of one comment, by export order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentResult {
    pub index: usize,
    pub author: Option<String>,
    pub outcome: ItemOutcome,
}

/// Outcome of one attachment, by export order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentResult {
    pub index: usize,
    pub filename: String,
    pub outcome: ItemOutcome,
}

/// Result of migrating a single source record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationResult {
    /// 1-based export row.
    pub row: usize,

    /// Source issue key, if the export had one.
    pub key: Option<String>,

    pub title: String,

    pub outcome: RecordOutcome,

    /// Status resolution, `None` if resolving failed.
    pub status: Option<ResolvedStatus>,

    /// Assignee resolution, `None` if the record was skipped before it ran.
    pub assignment: Option<Resolution>,

    pub comments: Vec<CommentResult>,

    pub attachments: Vec<AttachmentResult>,

    /// Non-fatal problems worth surfacing, such as ledger write failures.
    pub warnings: Vec<String>,
}

impl MigrationResult {
    /// Starts a result for `record` with a placeholder outcome.
    #[must_use]
    pub fn new(record: &SourceRecord) -> Self {
        Self {
            row: record.row,
            key: record.key.clone(),
            title: record.title.clone(),
            outcome: RecordOutcome::Planned,
            status: None,
            assignment: None,
            comments: Vec::new(),
            attachments: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// A record that was not migrated at all.
    #[must_use]
    pub fn skipped(record: &SourceRecord, reason: impl Into<String>) -> Self {
        Self {
            outcome: RecordOutcome::Skipped {
                reason: reason.into(),
            },
            ..Self::new(record)
        }
    }

    /// True if the record or any of its comments/attachments failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        matches!(self.outcome, RecordOutcome::Failed { .. })
            || self.comments.iter().any(|c| c.outcome.is_failed())
            || self.attachments.iter().any(|a| a.outcome.is_failed())
    }
}

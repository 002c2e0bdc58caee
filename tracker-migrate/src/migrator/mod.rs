//! Migration orchestration.
//!
//! [`Migrator`] takes parsed records through status resolution, assignee
//! resolution and markup conversion, then (in [`RunMode::Apply`]) creates the
//! record, its comments in order, and its attachments with bounded
//! concurrency. Every remote id is written to the [`Ledger`] so that a second
//! run over the same export creates nothing twice and only retries what is
//! missing.
//!
//! Failures never stop the run: a failed record is reported and the next one
//! is processed. Only [`Migrator::connect`] can fail.

mod attachments;
mod error;

pub use error::MigrateError;

use crate::config::MigrationConfig;
use crate::ledger::Ledger;
use crate::markup;
use crate::records::SourceRecord;
use crate::remote::{AttachmentSource, DestinationApi, NewComment, NewRecord};
use crate::retry::with_retry;
use crate::statuses::{ResolvedStatus, StatusError, StatusRegistry, UnknownStatusPolicy};
use crate::summary::{
    AttachmentResult, CommentResult, ItemOutcome, MigrationResult, RecordOutcome, RunSummary,
};
use crate::templates::TemplateRenderer;
use crate::users::{Resolution, UnassignedReason, UserResolver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Reason recorded for records left over after a stop request.
pub const INTERRUPTED_REASON: &str = "run interrupted";

/// Whether remote state may be changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Resolve and convert only. No mutating calls, no ledger writes.
    DryRun,
    /// Create records, comments and attachments.
    Apply,
}

/// Drives a migration against one destination project.
pub struct Migrator<'a> {
    api: &'a dyn DestinationApi,
    source: &'a dyn AttachmentSource,
    config: MigrationConfig,
    ledger: Ledger,
    users: UserResolver,
    statuses: StatusRegistry,
    renderer: TemplateRenderer,
    stop: Option<Arc<AtomicBool>>,
}

/// A comment ready to send, or the reason it cannot be.
type PreparedComment = Result<NewComment, String>;

impl<'a> Migrator<'a> {
    /// Loads the destination roster and statuses.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Unreachable`] if either listing fails after retries.
    pub async fn connect(
        api: &'a dyn DestinationApi,
        source: &'a dyn AttachmentSource,
        config: MigrationConfig,
        ledger: Ledger,
    ) -> Result<Self, MigrateError> {
        let roster = with_retry(&config.retry, "list users", || api.list_users())
            .await
            .map_err(|source| MigrateError::Unreachable {
                what: "project members",
                source,
            })?;
        let statuses = with_retry(&config.retry, "list statuses", || api.list_statuses())
            .await
            .map_err(|source| MigrateError::Unreachable {
                what: "statuses",
                source,
            })?;
        info!(
            members = roster.len(),
            statuses = statuses.len(),
            ledger_entries = ledger.len(),
            "Connected to destination"
        );

        let users = UserResolver::new(
            roster,
            config.user_mapping.clone(),
            config.fuzzy_match_threshold,
            config.fuzzy_tie_margin,
        );
        let statuses = StatusRegistry::new(statuses, config.reset_statuses, config.retry.clone());

        Ok(Self {
            api,
            source,
            config,
            ledger,
            users,
            statuses,
            renderer: TemplateRenderer::new(),
            stop: None,
        })
    }

    /// Checks `flag` between records; once set, remaining records are skipped.
    #[must_use]
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    /// The ledger as updated by the runs so far.
    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Consumes the migrator, returning its ledger.
    #[must_use]
    pub fn into_ledger(self) -> Ledger {
        self.ledger
    }

    fn stop_requested(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Migrates `records` in order.
    pub async fn migrate(&mut self, records: &[SourceRecord], mode: RunMode) -> RunSummary {
        let mut summary = RunSummary::new(mode == RunMode::DryRun);
        info!(records = records.len(), ?mode, "Starting migration");

        for (position, record) in records.iter().enumerate() {
            if self.stop_requested() {
                warn!(
                    remaining = records.len() - position,
                    "Stop requested, skipping remaining records"
                );
                for remaining in &records[position..] {
                    summary.record_result(MigrationResult::skipped(remaining, INTERRUPTED_REASON));
                }
                break;
            }

            let span = info_span!(
                "record",
                row = record.row,
                key = record.key.as_deref().unwrap_or("")
            );
            let result = self.migrate_record(record, mode).instrument(span).await;
            summary.record_result(result);
        }

        info!(
            created = summary.records_created(),
            planned = summary.records_planned(),
            already_migrated = summary.records_already_migrated(),
            skipped = summary.records_skipped(),
            failed = summary.records_failed(),
            "Migration finished"
        );
        summary
    }

    async fn migrate_record(&mut self, record: &SourceRecord, mode: RunMode) -> MigrationResult {
        let mut result = MigrationResult::new(record);
        let dry_run = mode == RunMode::DryRun;
        let key = record.ledger_key();
        let existing = self.ledger.entry(&key).map(|entry| entry.record_id);

        // A migrated record keeps the status it was created with.
        let status = match existing {
            Some(_) => None,
            None => match self.resolve_status(record, dry_run, &mut result).await {
                Ok(status) => Some(status),
                Err(outcome) => {
                    result.outcome = outcome;
                    return result;
                }
            },
        };
        result.status = status;

        let assignment = self.users.resolve(record.assignee.as_deref().unwrap_or(""));
        match &assignment {
            Resolution::Unassigned {
                reason: UnassignedReason::NoAssignee,
            } => debug!("No assignee"),
            Resolution::Unassigned { reason } => {
                warn!(reason = %reason, "Assignee not resolved, leaving unassigned");
            }
            Resolution::Matched { identity, kind, score } => {
                debug!(user = %identity.username, ?kind, score, "Assignee resolved");
            }
        }
        let assignee_id = assignment.user_id();
        result.assignment = Some(assignment);

        let description = markup::render(&record.description, self.config.description_format);
        let comments = self.prepare_comments(record);

        if dry_run {
            result.outcome = match existing {
                Some(record_id) => RecordOutcome::AlreadyMigrated { record_id },
                None => RecordOutcome::Planned,
            };
            result.comments = self.planned_comments(&key, record, &comments);
            result.attachments = self.planned_attachments(&key, record);
            return result;
        }

        let record_id = match existing {
            Some(record_id) => {
                info!(record_id, "Already migrated");
                result.outcome = RecordOutcome::AlreadyMigrated { record_id };
                record_id
            }
            None => {
                let new_record = NewRecord {
                    title: record.title.clone(),
                    description,
                    status_id: status.and_then(|status| status.id()),
                    assignee_id,
                };
                let created = with_retry(&self.config.retry, "create record", || {
                    self.api.create_record(&new_record)
                })
                .await;
                match created {
                    Ok(record_id) => {
                        info!(record_id, title = %record.title, "Created record");
                        self.ledger
                            .record_created(&key, record.row, &record.title, record_id);
                        self.save_ledger(&mut result);
                        result.outcome = RecordOutcome::Created { record_id };
                        record_id
                    }
                    Err(e) => {
                        error!(title = %record.title, error = %e, "Failed to create record");
                        result.outcome = RecordOutcome::Failed {
                            error: e.to_string(),
                        };
                        return result;
                    }
                }
            }
        };

        result.comments = self.create_comments(&key, record_id, record, comments).await;
        result.attachments = self.transfer_attachments(&key, record_id, record).await;
        self.save_ledger(&mut result);

        result
    }

    /// Resolves the record's status, applying the unknown-status policy.
    /// `Err` carries the outcome for a record that cannot proceed.
    async fn resolve_status(
        &mut self,
        record: &SourceRecord,
        dry_run: bool,
        result: &mut MigrationResult,
    ) -> Result<ResolvedStatus, RecordOutcome> {
        let Some(label) = record.status.as_deref() else {
            return Ok(ResolvedStatus::Default);
        };

        match self.statuses.ensure_status(self.api, label, dry_run).await {
            Ok(status) => Ok(status),
            Err(e) if self.config.unknown_status_policy == UnknownStatusPolicy::Default => {
                warn!(status = label, error = %e, "Using the project's default status");
                result.warnings.push(e.to_string());
                Ok(ResolvedStatus::Default)
            }
            Err(e @ StatusError::Unknown { .. }) => {
                warn!(status = label, "Unknown status, skipping record");
                Err(RecordOutcome::Skipped {
                    reason: e.to_string(),
                })
            }
            Err(e @ StatusError::Registry { .. }) => {
                error!(status = label, error = %e, "Status unavailable");
                Err(RecordOutcome::Failed {
                    error: e.to_string(),
                })
            }
        }
    }

    fn prepare_comments(&self, record: &SourceRecord) -> Vec<PreparedComment> {
        record
            .comments
            .iter()
            .map(|comment| -> PreparedComment {
                let body = if self.config.convert_comments {
                    markup::convert(&comment.body)
                } else {
                    comment.body.clone()
                };
                let rendered = self
                    .renderer
                    .render_comment(
                        &self.config.comment_template,
                        comment.author.as_deref(),
                        comment.timestamp.as_ref(),
                        &body,
                    )
                    .map_err(|e| e.to_string())?;
                Ok(NewComment {
                    author: comment.author.clone(),
                    body: rendered,
                    timestamp: comment.timestamp,
                })
            })
            .collect()
    }

    /// Dry-run comment outcomes: done per the ledger, otherwise planned.
    fn planned_comments(
        &self,
        key: &str,
        record: &SourceRecord,
        prepared: &[PreparedComment],
    ) -> Vec<CommentResult> {
        let done = self.ledger.entry(key).map(|entry| &entry.comments);
        record
            .comments
            .iter()
            .zip(prepared)
            .enumerate()
            .map(|(index, (comment, prepared))| CommentResult {
                index,
                author: comment.author.clone(),
                outcome: match (done.and_then(|ids| ids.get(&index)), prepared) {
                    (Some(&id), _) => ItemOutcome::AlreadyDone { id },
                    (None, Ok(_)) => ItemOutcome::Planned,
                    (None, Err(error)) => ItemOutcome::Failed {
                        error: error.clone(),
                    },
                },
            })
            .collect()
    }

    /// Dry-run attachment outcomes: done per the ledger, otherwise planned.
    fn planned_attachments(&self, key: &str, record: &SourceRecord) -> Vec<AttachmentResult> {
        let done = self.ledger.entry(key).map(|entry| &entry.attachments);
        record
            .attachments
            .iter()
            .enumerate()
            .map(|(index, attachment)| AttachmentResult {
                index,
                filename: attachment.filename.clone(),
                outcome: match done.and_then(|ids| ids.get(&index)) {
                    Some(&id) => ItemOutcome::AlreadyDone { id },
                    None => self.planned_attachment(),
                },
            })
            .collect()
    }

    fn planned_attachment(&self) -> ItemOutcome {
        if self.config.download_attachments {
            ItemOutcome::Planned
        } else {
            ItemOutcome::Skipped {
                reason: "attachment downloads disabled".to_string(),
            }
        }
    }

    /// Creates comments one by one, skipping those the ledger already has.
    async fn create_comments(
        &mut self,
        key: &str,
        record_id: u64,
        record: &SourceRecord,
        comments: Vec<PreparedComment>,
    ) -> Vec<CommentResult> {
        let mut results = Vec::with_capacity(comments.len());

        for (index, (original, prepared)) in record.comments.iter().zip(comments).enumerate() {
            let done = self
                .ledger
                .entry(key)
                .and_then(|entry| entry.comments.get(&index).copied());

            let outcome = match (done, prepared) {
                (Some(id), _) => ItemOutcome::AlreadyDone { id },
                (None, Err(error)) => {
                    warn!(index, error = %error, "Comment could not be rendered");
                    ItemOutcome::Failed { error }
                }
                (None, Ok(comment)) => {
                    let created = with_retry(&self.config.retry, "create comment", || {
                        self.api.create_comment(record_id, &comment)
                    })
                    .await;
                    match created {
                        Ok(id) => {
                            self.ledger.comment_created(key, index, id);
                            ItemOutcome::Created { id }
                        }
                        Err(e) => {
                            warn!(index, error = %e, "Failed to create comment");
                            ItemOutcome::Failed {
                                error: e.to_string(),
                            }
                        }
                    }
                }
            };

            results.push(CommentResult {
                index,
                author: original.author.clone(),
                outcome,
            });
        }

        results
    }

    /// Downloads and uploads attachments the ledger does not list yet.
    async fn transfer_attachments(
        &mut self,
        key: &str,
        record_id: u64,
        record: &SourceRecord,
    ) -> Vec<AttachmentResult> {
        let mut outcomes: Vec<Option<ItemOutcome>> = vec![None; record.attachments.len()];
        let mut pending = Vec::new();

        for (index, attachment) in record.attachments.iter().enumerate() {
            let done = self
                .ledger
                .entry(key)
                .and_then(|entry| entry.attachments.get(&index).copied());
            match done {
                Some(id) => outcomes[index] = Some(ItemOutcome::AlreadyDone { id }),
                None if !self.config.download_attachments => {
                    outcomes[index] = Some(self.planned_attachment());
                }
                None => pending.push((index, attachment)),
            }
        }

        if !pending.is_empty() {
            let transferred = attachments::transfer_all(
                self.api,
                self.source,
                &self.config.retry,
                record_id,
                pending,
                self.config.attachment_upload_concurrency,
            )
            .await;

            for (index, uploaded) in transferred {
                outcomes[index] = Some(match uploaded {
                    Ok(id) => {
                        self.ledger.attachment_uploaded(key, index, id);
                        ItemOutcome::Created { id }
                    }
                    Err(e) => ItemOutcome::Failed {
                        error: e.to_string(),
                    },
                });
            }
        }

        record
            .attachments
            .iter()
            .zip(outcomes)
            .enumerate()
            .map(|(index, (attachment, outcome))| AttachmentResult {
                index,
                filename: attachment.filename.clone(),
                outcome: outcome.unwrap_or_else(|| ItemOutcome::Failed {
                    error: "attachment was not processed".to_string(),
                }),
            })
            .collect()
    }

    fn save_ledger(&self, result: &mut MigrationResult) {
        if let Err(e) = self.ledger.save() {
            warn!(error = %e, "Failed to save ledger");
            result.warnings.push(format!("ledger not saved: {e}"));
        }
    }
}

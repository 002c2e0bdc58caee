use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracker_migrate::migrator::INTERRUPTED_REASON;
use tracker_migrate::{
    load_export, ApiError, AttachmentRef, AttachmentSource, DestinationApi, DestinationStatus,
    DestinationUser, ItemOutcome, Ledger, MatchKind, MigrationConfig, Migrator, NewComment,
    NewRecord, RecordOutcome, Resolution, ResolvedStatus, RetryPolicy, RunMode, SourceComment,
    SourceRecord, UnknownStatusPolicy,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn user(id: u64, username: &str, full_name: &str) -> DestinationUser {
    DestinationUser {
        id,
        username: username.to_string(),
        full_name: full_name.to_string(),
    }
}

fn status(id: u64, name: &str, slug: &str) -> DestinationStatus {
    DestinationStatus {
        id,
        name: name.to_string(),
        slug: slug.to_string(),
    }
}

fn config() -> MigrationConfig {
    MigrationConfig {
        retry: RetryPolicy::immediate(2),
        ..MigrationConfig::default()
    }
}

fn record(row: usize, title: &str, status: Option<&str>) -> SourceRecord {
    SourceRecord {
        row,
        key: None,
        title: title.to_string(),
        description: String::new(),
        status: status.map(str::to_string),
        assignee: None,
        comments: Vec::new(),
        attachments: Vec::new(),
    }
}

fn attachment(filename: &str, url: &str) -> AttachmentRef {
    AttachmentRef {
        filename: filename.to_string(),
        url: url.to_string(),
        author: None,
        timestamp: None,
    }
}

fn comment(body: &str) -> SourceComment {
    SourceComment {
        author: Some("Alice Jones".to_string()),
        body: body.to_string(),
        timestamp: None,
    }
}

#[derive(Default)]
struct State {
    next_id: u64,
    statuses: Vec<DestinationStatus>,
    status_creations: usize,
    status_attempts: usize,
    records: Vec<(u64, NewRecord)>,
    comments: Vec<(u64, NewComment)>,
    uploads: Vec<(u64, String, Vec<u8>)>,
}

/// In-memory destination. Requests whose status name, title, comment body or
/// attachment filename contains `fail_marker` are rejected with a server error.
struct FakeTracker {
    users: Vec<DestinationUser>,
    state: Mutex<State>,
    fail_marker: Mutex<Option<String>>,
}

impl FakeTracker {
    fn new() -> Self {
        Self {
            users: vec![
                user(7, "jsmith", "Jonathan Smith"),
                user(3, "ajones", "Alice Jones"),
                user(5, "bmarley", "Bob Marley"),
            ],
            state: Mutex::new(State {
                next_id: 100,
                statuses: vec![
                    status(1, "New", "new"),
                    status(2, "In progress", "in-progress"),
                ],
                ..State::default()
            }),
            fail_marker: Mutex::new(None),
        }
    }

    fn failing_on(self, marker: &str) -> Self {
        *self.fail_marker.lock().unwrap() = Some(marker.to_string());
        self
    }

    fn stop_failing(&self) {
        *self.fail_marker.lock().unwrap() = None;
    }

    fn should_fail(&self, text: &str) -> bool {
        self.fail_marker
            .lock()
            .unwrap()
            .as_deref()
            .is_some_and(|marker| text.contains(marker))
    }

    fn mutations(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.status_creations + state.records.len() + state.comments.len() + state.uploads.len()
    }

    fn status_creations(&self) -> usize {
        self.state.lock().unwrap().status_creations
    }

    fn status_attempts(&self) -> usize {
        self.state.lock().unwrap().status_attempts
    }

    fn records(&self) -> Vec<(u64, NewRecord)> {
        self.state.lock().unwrap().records.clone()
    }

    fn comment_bodies(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.comments.iter().map(|(_, c)| c.body.clone()).collect()
    }

    fn uploads(&self) -> Vec<(u64, String, Vec<u8>)> {
        self.state.lock().unwrap().uploads.clone()
    }
}

fn server_error() -> ApiError {
    ApiError::Server {
        status: 503,
        message: "unavailable".to_string(),
    }
}

#[async_trait]
impl DestinationApi for FakeTracker {
    async fn list_users(&self) -> Result<Vec<DestinationUser>, ApiError> {
        Ok(self.users.clone())
    }

    async fn list_statuses(&self) -> Result<Vec<DestinationStatus>, ApiError> {
        Ok(self.state.lock().unwrap().statuses.clone())
    }

    async fn create_status(&self, name: &str) -> Result<DestinationStatus, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.status_attempts += 1;
        if self.should_fail(name) {
            return Err(server_error());
        }
        state.next_id += 1;
        state.status_creations += 1;
        let created = status(state.next_id, name, &tracker_migrate::slugify(name));
        state.statuses.push(created.clone());
        Ok(created)
    }

    async fn create_record(&self, record: &NewRecord) -> Result<u64, ApiError> {
        if self.should_fail(&record.title) {
            return Err(server_error());
        }
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state.records.push((id, record.clone()));
        Ok(id)
    }

    async fn create_comment(&self, record_id: u64, comment: &NewComment) -> Result<u64, ApiError> {
        if self.should_fail(&comment.body) {
            return Err(server_error());
        }
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        state.comments.push((record_id, comment.clone()));
        Ok(state.next_id)
    }

    async fn upload_attachment(
        &self,
        record_id: u64,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<u64, ApiError> {
        if self.should_fail(filename) {
            return Err(server_error());
        }
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        state.uploads.push((record_id, filename.to_string(), bytes));
        Ok(state.next_id)
    }
}

/// Serves the URL itself as the file contents. URLs containing `missing` are
/// not found. Tracks how many downloads overlap.
#[derive(Default)]
struct FakeSource {
    fetches: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeSource {
    fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AttachmentSource for FakeSource {
    async fn fetch(&self, attachment: &AttachmentRef) -> Result<Vec<u8>, ApiError> {
        self.fetches.lock().unwrap().push(attachment.url.clone());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if attachment.url.contains("missing") {
            return Err(ApiError::Rejected {
                status: 404,
                message: "not found".to_string(),
            });
        }
        Ok(attachment.url.as_bytes().to_vec())
    }
}

#[test]
fn fixture_export_parses_with_one_malformed_row() {
    let export = load_export(&fixture("export.csv")).unwrap();

    assert_eq!(export.records.len(), 3);
    assert_eq!(export.malformed.len(), 1);
    assert_eq!(export.malformed[0].row(), 4);

    let first = &export.records[0];
    assert_eq!(first.key.as_deref(), Some("PROJ-1"));
    assert_eq!(first.comments.len(), 2);
    assert_eq!(first.attachments.len(), 1);
    assert_eq!(first.attachments[0].filename, "ci.log");
}

#[tokio::test]
async fn dry_run_makes_no_remote_changes() {
    let export = load_export(&fixture("export.csv")).unwrap();
    let api = FakeTracker::new();
    let source = FakeSource::default();

    let mut migrator = Migrator::connect(&api, &source, config(), Ledger::in_memory())
        .await
        .unwrap();
    let summary = migrator.migrate(&export.records, RunMode::DryRun).await;

    assert_eq!(api.mutations(), 0);
    assert_eq!(source.fetch_count(), 0);
    assert!(migrator.ledger().is_empty());
    assert!(summary.dry_run);
    assert_eq!(summary.records_planned(), 3);

    let first = &summary.results[0];
    assert_eq!(first.status, Some(ResolvedStatus::Planned));
    assert!(matches!(
        &first.assignment,
        Some(Resolution::Matched { identity, kind: MatchKind::Fuzzy, .. }) if identity.id == 7
    ));
    assert!(first
        .comments
        .iter()
        .all(|c| c.outcome == ItemOutcome::Planned));
    assert_eq!(summary.results[1].status, Some(ResolvedStatus::Existing { id: 2 }));
}

#[tokio::test]
async fn second_run_with_saved_ledger_creates_nothing() {
    let export = load_export(&fixture("export.csv")).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let ledger_path = dir.path().join("export.ledger.json");
    let api = FakeTracker::new();
    let source = FakeSource::default();

    let mut first = Migrator::connect(&api, &source, config(), Ledger::load(&ledger_path).unwrap())
        .await
        .unwrap();
    let summary = first.migrate(&export.records, RunMode::Apply).await;

    assert_eq!(summary.records_created(), 3);
    assert_eq!(summary.comments_created(), 3);
    assert_eq!(summary.attachments_uploaded(), 1);
    assert!(summary.all_success());
    let after_first = api.mutations();

    let mut second =
        Migrator::connect(&api, &source, config(), Ledger::load(&ledger_path).unwrap())
            .await
            .unwrap();
    let summary = second.migrate(&export.records, RunMode::Apply).await;

    assert_eq!(api.mutations(), after_first);
    assert_eq!(source.fetch_count(), 1);
    assert_eq!(summary.records_created(), 0);
    assert_eq!(summary.records_already_migrated(), 3);
    assert!(summary.results[0]
        .comments
        .iter()
        .all(|c| matches!(c.outcome, ItemOutcome::AlreadyDone { .. })));
}

#[tokio::test]
async fn applied_record_carries_converted_description_and_assignee() {
    let export = load_export(&fixture("export.csv")).unwrap();
    let api = FakeTracker::new();
    let source = FakeSource::default();

    let mut migrator = Migrator::connect(&api, &source, config(), Ledger::in_memory())
        .await
        .unwrap();
    migrator.migrate(&export.records, RunMode::Apply).await;

    let records = api.records();
    let (_, first) = &records[0];
    assert_eq!(first.title, "Set up CI");
    assert_eq!(first.assignee_id, Some(7));
    assert!(first.description.contains("<h2>"));
    assert!(first.description.contains("<strong>all</strong>"));

    let uploads = api.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, records[0].0);
    assert_eq!(uploads[0].1, "ci.log");
    assert_eq!(
        uploads[0].2,
        b"https://jira.example.com/secure/attachment/1/ci.log".to_vec()
    );

    let bodies = api.comment_bodies();
    assert!(bodies[0].starts_with("**Jonathan Smith** (2024-01-01 10:05):"));
    assert!(bodies[2].ends_with("Reproduced on `staging`"));
}

#[tokio::test]
async fn new_status_is_created_once_for_many_rows() {
    let records: Vec<SourceRecord> = (1..=10)
        .map(|row| record(row, &format!("Story {row}"), Some("Ready for QA")))
        .collect();
    let api = FakeTracker::new();
    let source = FakeSource::default();

    let mut migrator = Migrator::connect(&api, &source, config(), Ledger::in_memory())
        .await
        .unwrap();
    let summary = migrator.migrate(&records, RunMode::Apply).await;

    assert_eq!(api.status_creations(), 1);
    assert_eq!(summary.records_created(), 10);
    let ids: Vec<Option<u64>> = api.records().iter().map(|(_, r)| r.status_id).collect();
    assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
    assert!(ids[0].is_some());
}

#[tokio::test]
async fn unknown_status_skips_record_when_creation_disabled() {
    let records = vec![
        record(1, "Known", Some("New")),
        record(2, "Unknown", Some("Blocked")),
        record(3, "No status", None),
    ];
    let api = FakeTracker::new();
    let source = FakeSource::default();
    let config = MigrationConfig {
        reset_statuses: false,
        ..config()
    };

    let mut migrator = Migrator::connect(&api, &source, config, Ledger::in_memory())
        .await
        .unwrap();
    let summary = migrator.migrate(&records, RunMode::Apply).await;

    assert_eq!(api.status_creations(), 0);
    assert_eq!(summary.records_created(), 2);
    assert_eq!(summary.records_skipped(), 1);
    assert!(matches!(
        summary.results[1].outcome,
        RecordOutcome::Skipped { .. }
    ));
    assert_eq!(api.records()[1].1.status_id, None);
}

#[tokio::test]
async fn failed_comment_is_reported_and_retried_on_next_run() {
    let mut story = record(1, "Story with comments", None);
    story.comments = ["one", "two", "three FAIL", "four", "five"]
        .into_iter()
        .map(comment)
        .collect();
    let records = vec![story];
    let api = FakeTracker::new().failing_on("FAIL");
    let source = FakeSource::default();

    let mut migrator = Migrator::connect(&api, &source, config(), Ledger::in_memory())
        .await
        .unwrap();
    let summary = migrator.migrate(&records, RunMode::Apply).await;

    assert_eq!(summary.comments_created(), 4);
    assert_eq!(summary.comments_failed(), 1);
    assert!(summary.has_failures());
    assert!(matches!(
        summary.results[0].comments[2].outcome,
        ItemOutcome::Failed { .. }
    ));
    let bodies = api.comment_bodies();
    assert!(bodies[0].ends_with("one"));
    assert!(bodies[3].ends_with("five"));

    api.stop_failing();
    let ledger = migrator.into_ledger();
    let mut rerun = Migrator::connect(&api, &source, config(), ledger)
        .await
        .unwrap();
    let summary = rerun.migrate(&records, RunMode::Apply).await;

    assert_eq!(summary.records_already_migrated(), 1);
    assert_eq!(summary.comments_created(), 1);
    assert_eq!(api.records().len(), 1);
    assert_eq!(api.comment_bodies().len(), 5);
    assert!(summary.all_success());
}

#[tokio::test]
async fn record_creation_failure_does_not_stop_the_run() {
    let records = vec![
        record(1, "First", None),
        record(2, "Broken FAIL", None),
        record(3, "Third", None),
    ];
    let api = FakeTracker::new().failing_on("FAIL");
    let source = FakeSource::default();

    let mut migrator = Migrator::connect(&api, &source, config(), Ledger::in_memory())
        .await
        .unwrap();
    let summary = migrator.migrate(&records, RunMode::Apply).await;

    assert_eq!(summary.records_created(), 2);
    assert_eq!(summary.records_failed(), 1);
    assert!(matches!(
        summary.results[1].outcome,
        RecordOutcome::Failed { .. }
    ));
    assert!(migrator.ledger().entry("2:Broken FAIL").is_none());
    assert_eq!(api.records()[1].1.title, "Third");
}

#[tokio::test]
async fn user_mapping_takes_precedence_over_matching() {
    let mut story = record(1, "Mapped", None);
    story.assignee = Some("Jon Smith".to_string());
    let api = FakeTracker::new();
    let source = FakeSource::default();
    let config = MigrationConfig {
        user_mapping: HashMap::from([("Jon Smith".to_string(), "ajones".to_string())]),
        ..config()
    };

    let mut migrator = Migrator::connect(&api, &source, config, Ledger::in_memory())
        .await
        .unwrap();
    let summary = migrator.migrate(&[story], RunMode::Apply).await;

    assert!(matches!(
        &summary.results[0].assignment,
        Some(Resolution::Matched { identity, kind: MatchKind::Override, .. }) if identity.id == 3
    ));
    assert_eq!(api.records()[0].1.assignee_id, Some(3));
}

#[tokio::test]
async fn stop_flag_skips_remaining_records() {
    let records = vec![record(1, "First", None), record(2, "Second", None)];
    let api = FakeTracker::new();
    let source = FakeSource::default();
    let stop = Arc::new(AtomicBool::new(false));
    stop.store(true, Ordering::SeqCst);

    let mut migrator = Migrator::connect(&api, &source, config(), Ledger::in_memory())
        .await
        .unwrap()
        .with_stop_flag(Arc::clone(&stop));
    let summary = migrator.migrate(&records, RunMode::Apply).await;

    assert_eq!(api.mutations(), 0);
    assert_eq!(summary.records_skipped(), 2);
    assert!(summary.results.iter().all(|r| r.outcome
        == RecordOutcome::Skipped {
            reason: INTERRUPTED_REASON.to_string()
        }));
}

#[tokio::test]
async fn disabled_downloads_skip_attachments() {
    let export = load_export(&fixture("export.csv")).unwrap();
    let api = FakeTracker::new();
    let source = FakeSource::default();
    let config = MigrationConfig {
        download_attachments: false,
        ..config()
    };

    let mut migrator = Migrator::connect(&api, &source, config, Ledger::in_memory())
        .await
        .unwrap();
    let summary = migrator.migrate(&export.records, RunMode::Apply).await;

    assert_eq!(source.fetch_count(), 0);
    assert!(api.uploads().is_empty());
    assert_eq!(summary.records_created(), 3);
    assert!(matches!(
        summary.results[0].attachments[0].outcome,
        ItemOutcome::Skipped { .. }
    ));
}

#[tokio::test]
async fn dry_run_after_apply_reports_ledger_state() {
    let export = load_export(&fixture("export.csv")).unwrap();
    let api = FakeTracker::new();
    let source = FakeSource::default();

    let mut migrator = Migrator::connect(&api, &source, config(), Ledger::in_memory())
        .await
        .unwrap();
    migrator.migrate(&export.records, RunMode::Apply).await;
    let after_apply = api.mutations();

    let mut preview = Migrator::connect(&api, &source, config(), migrator.into_ledger())
        .await
        .unwrap();
    let summary = preview.migrate(&export.records, RunMode::DryRun).await;

    assert_eq!(api.mutations(), after_apply);
    assert_eq!(source.fetch_count(), 1);
    assert_eq!(summary.records_planned(), 0);
    assert_eq!(summary.records_already_migrated(), 3);

    let first = &summary.results[0];
    assert_eq!(first.status, None);
    assert!(first
        .comments
        .iter()
        .all(|c| matches!(c.outcome, ItemOutcome::AlreadyDone { .. })));
    assert!(matches!(
        first.attachments[0].outcome,
        ItemOutcome::AlreadyDone { .. }
    ));
}

#[tokio::test]
async fn migrated_record_resumes_without_resolving_status() {
    let mut story = record(1, "Blocked story", Some("Blocked"));
    story.comments = ["one", "two FAIL"].into_iter().map(comment).collect();
    let records = vec![story];
    let api = FakeTracker::new().failing_on("FAIL");
    let source = FakeSource::default();
    let lenient = MigrationConfig {
        reset_statuses: false,
        unknown_status_policy: UnknownStatusPolicy::Default,
        ..config()
    };

    let mut migrator = Migrator::connect(&api, &source, lenient, Ledger::in_memory())
        .await
        .unwrap();
    let summary = migrator.migrate(&records, RunMode::Apply).await;
    assert_eq!(summary.records_created(), 1);
    assert_eq!(summary.comments_failed(), 1);

    api.stop_failing();
    let strict = MigrationConfig {
        reset_statuses: false,
        unknown_status_policy: UnknownStatusPolicy::Skip,
        ..config()
    };
    let mut rerun = Migrator::connect(&api, &source, strict, migrator.into_ledger())
        .await
        .unwrap();
    let summary = rerun.migrate(&records, RunMode::Apply).await;

    assert_eq!(summary.records_already_migrated(), 1);
    assert_eq!(summary.records_skipped(), 0);
    assert_eq!(summary.results[0].status, None);
    assert_eq!(summary.comments_created(), 1);
    assert_eq!(api.records().len(), 1);
    assert_eq!(api.comment_bodies().len(), 2);
    assert!(summary.all_success());
}

#[tokio::test]
async fn attachment_failures_are_reported_per_item() {
    let mut story = record(1, "With files", None);
    story.attachments = vec![
        attachment("a.txt", "https://files.test/a.txt"),
        attachment("b.txt", "https://files.test/missing/b.txt"),
        attachment("c FAIL.txt", "https://files.test/c.txt"),
    ];
    let records = vec![story];
    let api = FakeTracker::new().failing_on("FAIL");
    let source = FakeSource::default();

    let mut migrator = Migrator::connect(&api, &source, config(), Ledger::in_memory())
        .await
        .unwrap();
    let summary = migrator.migrate(&records, RunMode::Apply).await;

    assert_eq!(summary.records_created(), 1);
    assert_eq!(summary.attachments_uploaded(), 1);
    assert_eq!(summary.attachments_failed(), 2);
    assert!(summary.has_failures());
    let outcomes: Vec<&ItemOutcome> = summary.results[0]
        .attachments
        .iter()
        .map(|a| &a.outcome)
        .collect();
    assert!(matches!(outcomes[0], ItemOutcome::Created { .. }));
    assert!(matches!(outcomes[1], ItemOutcome::Failed { .. }));
    assert!(matches!(outcomes[2], ItemOutcome::Failed { .. }));

    let entry = migrator.ledger().entry("1:With files").unwrap();
    assert_eq!(entry.attachments.keys().copied().collect::<Vec<_>>(), vec![0]);

    // A 404 is not retried; the server error is.
    assert_eq!(source.fetch_count(), 3);
    assert_eq!(api.uploads().len(), 1);

    api.stop_failing();
    let mut rerun = Migrator::connect(&api, &source, config(), migrator.into_ledger())
        .await
        .unwrap();
    let summary = rerun.migrate(&records, RunMode::Apply).await;

    assert_eq!(summary.records_already_migrated(), 1);
    assert_eq!(summary.attachments_uploaded(), 1);
    assert_eq!(summary.attachments_failed(), 1);
    assert_eq!(api.uploads().len(), 2);
}

#[tokio::test]
async fn attachment_transfers_respect_concurrency_limit() {
    let mut story = record(1, "Many files", None);
    story.attachments = (1..=6)
        .map(|n| attachment(&format!("{n}.bin"), &format!("https://files.test/{n}.bin")))
        .collect();
    let api = FakeTracker::new();
    let source = FakeSource::default();
    let config = MigrationConfig {
        attachment_upload_concurrency: 2,
        ..config()
    };

    let mut migrator = Migrator::connect(&api, &source, config, Ledger::in_memory())
        .await
        .unwrap();
    let summary = migrator.migrate(&[story], RunMode::Apply).await;

    assert_eq!(summary.attachments_uploaded(), 6);
    assert_eq!(source.max_in_flight(), 2);
    let names: Vec<String> = summary.results[0]
        .attachments
        .iter()
        .map(|a| a.filename.clone())
        .collect();
    assert_eq!(names, ["1.bin", "2.bin", "3.bin", "4.bin", "5.bin", "6.bin"]);
}

#[tokio::test]
async fn unknown_status_falls_back_to_default_status() {
    let records = vec![record(1, "Unknown", Some("Blocked"))];
    let api = FakeTracker::new();
    let source = FakeSource::default();
    let config = MigrationConfig {
        reset_statuses: false,
        unknown_status_policy: UnknownStatusPolicy::Default,
        ..config()
    };

    let mut migrator = Migrator::connect(&api, &source, config, Ledger::in_memory())
        .await
        .unwrap();
    let summary = migrator.migrate(&records, RunMode::Apply).await;

    assert_eq!(api.status_attempts(), 0);
    assert_eq!(summary.records_created(), 1);
    assert_eq!(summary.results[0].status, Some(ResolvedStatus::Default));
    assert_eq!(summary.results[0].warnings.len(), 1);
    assert!(summary.results[0].warnings[0].contains("Blocked"));
    assert_eq!(api.records()[0].1.status_id, None);
}

#[tokio::test]
async fn failed_status_creation_fails_only_dependent_records() {
    let records = vec![
        record(1, "First", Some("Blocked")),
        record(2, "Second", Some("New")),
        record(3, "Third", Some("Blocked")),
        record(4, "Fourth", None),
    ];
    let api = FakeTracker::new().failing_on("Blocked");
    let source = FakeSource::default();

    let mut migrator = Migrator::connect(&api, &source, config(), Ledger::in_memory())
        .await
        .unwrap();
    let summary = migrator.migrate(&records, RunMode::Apply).await;

    assert_eq!(summary.records_failed(), 2);
    assert_eq!(summary.records_created(), 2);
    assert!(matches!(summary.results[0].outcome, RecordOutcome::Failed { .. }));
    assert!(matches!(summary.results[2].outcome, RecordOutcome::Failed { .. }));
    // Two attempts, a re-list, two more attempts; the third record reuses the failure.
    assert_eq!(api.status_attempts(), 4);
    assert_eq!(api.status_creations(), 0);
    let titles: Vec<String> = api.records().iter().map(|(_, r)| r.title.clone()).collect();
    assert_eq!(titles, ["Second", "Fourth"]);
}

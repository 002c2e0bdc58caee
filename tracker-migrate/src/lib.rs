#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

pub mod config;
pub mod jira;
pub mod ledger;
pub mod markup;
pub mod migrator;
pub mod records;
pub mod remote;
pub mod retry;
pub mod runner;
pub mod statuses;
pub mod summary;
pub mod taiga;
pub mod templates;
pub mod users;

pub use config::{load_config, parse_user_mapping, ConfigError, MigrationConfig};
pub use jira::{JiraAttachments, JiraCredentials};
pub use ledger::{Ledger, LedgerEntry, LedgerError};
pub use markup::{convert, render, RenderMode};
pub use migrator::{MigrateError, Migrator, RunMode};
pub use records::{
    load_export, parse_export, AttachmentRef, ExportError, MalformedRowError, ParsedExport,
    SourceComment, SourceRecord,
};
pub use remote::{
    ApiError, AttachmentSource, DestinationApi, DestinationStatus, DestinationUser, NewComment,
    NewRecord,
};
pub use retry::{with_retry, RetryPolicy};
pub use runner::{Runner, RunnerConfig, RunnerError, TaigaSettings};
pub use statuses::{slugify, ResolvedStatus, StatusError, StatusRegistry, UnknownStatusPolicy};
pub use summary::{
    AttachmentResult, CommentResult, ItemOutcome, MigrationResult, RecordOutcome, RunSummary,
};
pub use taiga::{TaigaClient, TaigaError};
pub use templates::{TemplateError, TemplateRenderer};
pub use users::{MatchKind, Resolution, UnassignedReason, UserResolver};

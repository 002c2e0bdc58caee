//! Parsed export records.

use chrono::NaiveDateTime;
use serde::Serialize;

/// One migratable unit parsed from a single export row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    /// 1-based position among the export's data rows. Stable across runs over
    /// the same file, so it doubles as part of the ledger key.
    pub row: usize,

    /// Source issue key (e.g. "PROJ-12"), when the export carries one.
    pub key: Option<String>,

    /// Record title from the `Summary` column.
    pub title: String,

    /// Description in the source markup dialect.
    pub description: String,

    /// Status label, `None` if the cell was empty.
    pub status: Option<String>,

    /// Assignee display name, `None` if unassigned in the source.
    pub assignee: Option<String>,

    /// Comments in export order.
    pub comments: Vec<SourceComment>,

    /// Attachments in export order.
    pub attachments: Vec<AttachmentRef>,
}

impl SourceRecord {
    /// Key identifying this record in the migration ledger.
    #[must_use]
    pub fn ledger_key(&self) -> String {
        format!("{}:{}", self.row, self.title)
    }
}

/// A comment attached to a source record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceComment {
    /// Author as written in the export. Missing when the cell had no header.
    pub author: Option<String>,

    /// Comment body in the source markup dialect.
    pub body: String,

    /// When the comment was written.
    pub timestamp: Option<NaiveDateTime>,
}

/// A reference to a file attached to a source record.
///
/// Only the location is kept here; the bytes are fetched at upload time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentRef {
    /// File name to upload under.
    pub filename: String,

    /// Location the attachment source downloads from.
    pub url: String,

    /// Who attached the file in the source tracker.
    pub author: Option<String>,

    /// When the file was attached.
    pub timestamp: Option<NaiveDateTime>,
}

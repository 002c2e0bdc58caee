//! Reading Jira CSV exports.
//!
//! This module turns export rows into [`SourceRecord`]s. Rows that cannot be
//! parsed are returned alongside the good ones so the run summary can report
//! them; only an unreadable file or a header missing required columns stops
//! the run.

mod cell;
mod error;
mod record;

pub use error::{ExportError, MalformedRowError};
pub use record::{AttachmentRef, SourceComment, SourceRecord};

use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Column holding the record title.
pub const SUMMARY_COLUMN: &str = "Summary";
/// Column holding the record description.
pub const DESCRIPTION_COLUMN: &str = "Description";
/// Column holding the status label.
pub const STATUS_COLUMN: &str = "Status";
/// Column holding the assignee display name.
pub const ASSIGNEE_COLUMN: &str = "Assignee";
/// Column (repeated once per value) holding attachment entries.
pub const ATTACHMENT_COLUMN: &str = "Attachment";
/// Column (repeated once per value) holding comment entries.
pub const COMMENT_COLUMN: &str = "Comment";
/// Optional column holding the source issue key.
pub const ISSUE_KEY_COLUMN: &str = "Issue key";

/// Columns every export must carry.
pub const REQUIRED_COLUMNS: &[&str] = &[
    SUMMARY_COLUMN,
    DESCRIPTION_COLUMN,
    STATUS_COLUMN,
    ASSIGNEE_COLUMN,
    ATTACHMENT_COLUMN,
    COMMENT_COLUMN,
];

/// Maps header names to their positions. Jira repeats some headers, so a name
/// may map to several columns.
#[derive(Debug, Clone)]
pub struct Columns {
    positions: HashMap<String, Vec<usize>>,
    len: usize,
}

impl Columns {
    /// Indexes a header row and checks that all required columns are present.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::MissingColumns`] listing every absent column.
    pub fn from_headers(headers: &StringRecord) -> Result<Self, ExportError> {
        let mut positions: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, name) in headers.iter().enumerate() {
            let name = name.trim_start_matches('\u{feff}').trim();
            positions.entry(name.to_string()).or_default().push(index);
        }

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|column| !positions.contains_key(**column))
            .map(|column| (*column).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ExportError::MissingColumns { columns: missing });
        }

        Ok(Self {
            positions,
            len: headers.len(),
        })
    }

    /// Number of columns in the header row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the header row was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn first<'r>(&self, row: &'r StringRecord, name: &str) -> Option<&'r str> {
        self.positions
            .get(name)
            .and_then(|indexes| indexes.first())
            .and_then(|index| row.get(*index))
    }

    fn all<'r>(&'r self, row: &'r StringRecord, name: &str) -> impl Iterator<Item = &'r str> + 'r {
        self.positions
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(move |index| row.get(*index))
    }
}

/// Result of reading a whole export.
#[derive(Debug, Default)]
pub struct ParsedExport {
    /// Records in export order.
    pub records: Vec<SourceRecord>,

    /// Rows that were skipped.
    pub malformed: Vec<MalformedRowError>,
}

/// Parses one data row.
///
/// # Arguments
///
/// * `row_number` - 1-based position among the data rows
/// * `row` - The raw CSV record
/// * `columns` - Header index for the export
///
/// # Errors
///
/// Returns [`MalformedRowError`] if the row is the wrong length or has no title.
pub fn parse_row(
    row_number: usize,
    row: &StringRecord,
    columns: &Columns,
) -> Result<SourceRecord, MalformedRowError> {
    if row.len() != columns.len() {
        return Err(MalformedRowError::FieldCount {
            row: row_number,
            expected: columns.len(),
            found: row.len(),
        });
    }

    let title = columns
        .first(row, SUMMARY_COLUMN)
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .ok_or_else(|| MalformedRowError::MissingField {
            row: row_number,
            field: SUMMARY_COLUMN.to_string(),
        })?
        .to_string();

    let optional = |name: &str| {
        columns
            .first(row, name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    let comments = columns
        .all(row, COMMENT_COLUMN)
        .flat_map(cell::parse_comment_cell)
        .collect();
    let attachments = columns
        .all(row, ATTACHMENT_COLUMN)
        .flat_map(cell::parse_attachment_cell)
        .collect();

    Ok(SourceRecord {
        row: row_number,
        key: optional(ISSUE_KEY_COLUMN),
        title,
        description: columns
            .first(row, DESCRIPTION_COLUMN)
            .unwrap_or_default()
            .to_string(),
        status: optional(STATUS_COLUMN),
        assignee: optional(ASSIGNEE_COLUMN),
        comments,
        attachments,
    })
}

/// Reads a complete export from any reader.
///
/// # Errors
///
/// Returns [`ExportError`] if the header row is unreadable or incomplete.
/// Problems with individual rows are collected in [`ParsedExport::malformed`].
pub fn parse_export<R: Read>(reader: R) -> Result<ParsedExport, ExportError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns = Columns::from_headers(rdr.headers()?)?;
    let mut export = ParsedExport::default();

    for (index, result) in rdr.records().enumerate() {
        let row_number = index + 1;
        let parsed = result
            .map_err(|e| MalformedRowError::InvalidCsv {
                row: row_number,
                message: e.to_string(),
            })
            .and_then(|row| parse_row(row_number, &row, &columns));

        match parsed {
            Ok(record) => {
                debug!(
                    row = row_number,
                    title = %record.title,
                    comments = record.comments.len(),
                    attachments = record.attachments.len(),
                    "Parsed row"
                );
                export.records.push(record);
            }
            Err(e) => {
                warn!(row = row_number, error = %e, "Skipping malformed row");
                export.malformed.push(e);
            }
        }
    }

    info!(
        records = export.records.len(),
        malformed = export.malformed.len(),
        "Loaded export"
    );
    Ok(export)
}

/// Reads a complete export from a file.
///
/// # Errors
///
/// Returns [`ExportError`] if the file cannot be opened or its header is invalid.
pub fn load_export(path: &Path) -> Result<ParsedExport, ExportError> {
    info!(path = %path.display(), "Reading export");
    let file = std::fs::File::open(path).map_err(|e| ExportError::IoError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_export(std::io::BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Summary,Issue key,Description,Status,Assignee,Attachment,Comment,Comment";

    fn parse(csv: &str) -> ParsedExport {
        parse_export(csv.as_bytes()).unwrap()
    }

    #[test]
    fn parses_complete_row() {
        let csv = format!(
            "{HEADER}\n\
             Fix login bug,PROJ-1,\"h2. Steps\n* open page\",In Review,Jon Smith,\
             05/Mar/24 10:15 AM;Jane;shot.png;https://jira.example.com/a/1/shot.png,\
             \"05/Mar/24 10:15 AM;Jane;First, with comma\",\
             06/Mar/24 9:00 AM;Bob;Second\n"
        );
        let export = parse(&csv);

        assert!(export.malformed.is_empty());
        let record = &export.records[0];
        assert_eq!(record.row, 1);
        assert_eq!(record.key.as_deref(), Some("PROJ-1"));
        assert_eq!(record.title, "Fix login bug");
        assert_eq!(record.description, "h2. Steps\n* open page");
        assert_eq!(record.status.as_deref(), Some("In Review"));
        assert_eq!(record.assignee.as_deref(), Some("Jon Smith"));
        assert_eq!(record.attachments.len(), 1);
        assert_eq!(record.comments.len(), 2);
        assert_eq!(record.comments[0].body, "First, with comma");
        assert_eq!(record.comments[1].author.as_deref(), Some("Bob"));
        assert_eq!(record.ledger_key(), "1:Fix login bug");
    }

    #[test]
    fn empty_optional_cells_become_none() {
        let export = parse(&format!("{HEADER}\nTitle,,,,,,,\n"));
        let record = &export.records[0];

        assert_eq!(record.key, None);
        assert_eq!(record.status, None);
        assert_eq!(record.assignee, None);
        assert!(record.comments.is_empty());
        assert!(record.attachments.is_empty());
    }

    #[test]
    fn row_without_summary_is_malformed_and_run_continues() {
        let export = parse(&format!("{HEADER}\n,PROJ-1,,Open,,,,\nSecond,,,Open,,,,\n"));

        assert_eq!(export.records.len(), 1);
        assert_eq!(export.records[0].row, 2);
        assert_eq!(
            export.malformed,
            vec![MalformedRowError::MissingField {
                row: 1,
                field: "Summary".to_string()
            }]
        );
    }

    #[test]
    fn short_row_is_malformed() {
        let export = parse(&format!("{HEADER}\nOnly,two\n"));

        assert!(export.records.is_empty());
        assert!(matches!(
            export.malformed[0],
            MalformedRowError::FieldCount {
                row: 1,
                expected: 8,
                found: 2
            }
        ));
    }

    #[test]
    fn missing_columns_are_fatal() {
        let result = parse_export("Summary,Status\nTitle,Open\n".as_bytes());

        match result {
            Err(ExportError::MissingColumns { columns }) => {
                assert_eq!(
                    columns,
                    vec!["Description", "Assignee", "Attachment", "Comment"]
                );
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn strips_byte_order_mark_from_first_header() {
        let csv = format!("\u{feff}{HEADER}\nTitle,,,,,,,\n");
        let export = parse(&csv);
        assert_eq!(export.records.len(), 1);
    }
}

//! Export parsing error types.

use serde::Serialize;
use thiserror::Error;

/// A single row could not be turned into a record. The row is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MalformedRowError {
    /// A required cell was empty.
    #[error("Row {row}: missing required field '{field}'")]
    MissingField { row: usize, field: String },

    /// The row has a different number of cells than the header.
    #[error("Row {row}: expected {expected} fields, found {found}")]
    FieldCount {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// The CSV reader rejected the row.
    #[error("Row {row}: {message}")]
    InvalidCsv { row: usize, message: String },
}

impl MalformedRowError {
    /// Returns the 1-based data row the error refers to.
    #[must_use]
    pub fn row(&self) -> usize {
        match self {
            Self::MissingField { row, .. }
            | Self::FieldCount { row, .. }
            | Self::InvalidCsv { row, .. } => *row,
        }
    }
}

/// Errors that prevent the export from being read at all.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Failed to open the export file.
    #[error("Failed to read export '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The header row could not be read.
    #[error("Failed to read CSV header: {0}")]
    Csv(#[from] csv::Error),

    /// Required columns are absent from the header row.
    #[error("Export is missing required columns: {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },
}

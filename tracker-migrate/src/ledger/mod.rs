//! Persisted map from source records to the remote ids created for them.
//!
//! Keys are `"{row}:{title}"`. Each entry remembers the record id plus the
//! comment and attachment indices that were created, so a re-run skips the
//! record and only retries what is missing.
//!
//! The file is JSON, rewritten atomically (temp file in the same directory,
//! then rename) after every change the orchestrator makes.

mod error;

pub use error::LedgerError;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const LEDGER_VERSION: u32 = 1;

/// Remote ids created for one source record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub row: usize,
    pub title: String,
    pub record_id: u64,
    /// Comment index (export order) to remote comment id.
    #[serde(default)]
    pub comments: BTreeMap<usize, u64>,
    /// Attachment index (export order) to remote attachment id.
    #[serde(default)]
    pub attachments: BTreeMap<usize, u64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    version: u32,
    entries: BTreeMap<String, LedgerEntry>,
}

/// The migration ledger.
#[derive(Debug, Default)]
pub struct Ledger {
    path: Option<PathBuf>,
    entries: BTreeMap<String, LedgerEntry>,
}

impl Ledger {
    /// Loads the ledger at `path`. A missing file is an empty ledger that will
    /// be created on the first save.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        if !path.exists() {
            debug!(path = %path.display(), "No ledger yet, starting empty");
            return Ok(Self {
                path: Some(path),
                entries: BTreeMap::new(),
            });
        }

        let content = std::fs::read_to_string(&path).map_err(|e| LedgerError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;
        let file: LedgerFile =
            serde_json::from_str(&content).map_err(|e| LedgerError::JsonError {
                path: path.display().to_string(),
                source: e,
            })?;
        if file.version != LEDGER_VERSION {
            return Err(LedgerError::UnsupportedVersion {
                path: path.display().to_string(),
                version: file.version,
            });
        }

        debug!(path = %path.display(), entries = file.entries.len(), "Loaded ledger");
        Ok(Self {
            path: Some(path),
            entries: file.entries,
        })
    }

    /// A ledger that is never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn entry(&self, key: &str) -> Option<&LedgerEntry> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records that `key` was created remotely as `record_id`.
    pub fn record_created(&mut self, key: &str, row: usize, title: &str, record_id: u64) {
        self.entries.insert(
            key.to_string(),
            LedgerEntry {
                row,
                title: title.to_string(),
                record_id,
                comments: BTreeMap::new(),
                attachments: BTreeMap::new(),
            },
        );
    }

    /// Records a created comment. Ignored when `key` has no entry.
    pub fn comment_created(&mut self, key: &str, index: usize, comment_id: u64) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.comments.insert(index, comment_id);
        }
    }

    /// Records an uploaded attachment. Ignored when `key` has no entry.
    pub fn attachment_uploaded(&mut self, key: &str, index: usize, attachment_id: u64) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.attachments.insert(index, attachment_id);
        }
    }

    /// Writes the ledger to its backing file. No-op for in-memory ledgers.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<(), LedgerError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let io_error = |source: std::io::Error| LedgerError::IoError {
            path: path.display().to_string(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file = LedgerFile {
            version: LEDGER_VERSION,
            entries: self.entries.clone(),
        };
        let json = serde_json::to_vec_pretty(&file).map_err(|e| LedgerError::JsonError {
            path: path.display().to_string(),
            source: e,
        })?;

        let mut temp = NamedTempFile::new_in(dir).map_err(io_error)?;
        temp.write_all(&json).map_err(io_error)?;
        temp.persist(path).map_err(|e| io_error(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::load(dir.path().join("ledger.json")).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");

        let mut ledger = Ledger::load(&path).unwrap();
        ledger.record_created("1:Fix login", 1, "Fix login", 42);
        ledger.comment_created("1:Fix login", 0, 7);
        ledger.attachment_uploaded("1:Fix login", 1, 9);
        ledger.save().unwrap();

        let reloaded = Ledger::load(&path).unwrap();
        let entry = reloaded.entry("1:Fix login").unwrap();
        assert_eq!(entry.record_id, 42);
        assert_eq!(entry.comments.get(&0), Some(&7));
        assert_eq!(entry.attachments.get(&1), Some(&9));
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn sub_items_without_record_are_ignored() {
        let mut ledger = Ledger::in_memory();
        ledger.comment_created("2:Other", 0, 1);
        assert!(ledger.entry("2:Other").is_none());
    }

    #[test]
    fn in_memory_save_is_noop() {
        let mut ledger = Ledger::in_memory();
        ledger.record_created("1:A", 1, "A", 1);
        assert!(ledger.save().is_ok());
        assert!(ledger.path().is_none());
    }

    #[test]
    fn rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            Ledger::load(&path),
            Err(LedgerError::JsonError { .. })
        ));
    }

    #[test]
    fn rejects_unknown_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, r#"{"version": 99, "entries": {}}"#).unwrap();
        assert!(matches!(
            Ledger::load(&path),
            Err(LedgerError::UnsupportedVersion { version: 99, .. })
        ));
    }
}

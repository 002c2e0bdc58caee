//! Remote data shapes shared by the migrator and the adapters.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A member of the destination project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationUser {
    /// Canonical remote identifier. Used to break fuzzy-match ties.
    pub id: u64,

    /// Login name.
    pub username: String,

    /// Human readable name shown in the destination UI.
    pub full_name: String,
}

/// A status known to the destination project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationStatus {
    /// Remote status id.
    pub id: u64,

    /// Display name.
    pub name: String,

    /// URL-safe key the destination uses to identify the status.
    pub slug: String,
}

/// Payload for creating a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub title: String,
    pub description: String,
    /// `None` leaves the record in the project's default status.
    pub status_id: Option<u64>,
    pub assignee_id: Option<u64>,
}

/// Payload for creating a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    /// Author as it appeared in the source export.
    pub author: Option<String>,
    pub body: String,
    pub timestamp: Option<NaiveDateTime>,
}

//! Resolution result types.

use crate::remote::DestinationUser;
use serde::Serialize;
use thiserror::Error;

/// How an identity was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Explicit entry in the user mapping.
    Override,
    /// Display name, username or `@username` equal to the input.
    Exact,
    /// Best similarity score above the threshold.
    Fuzzy,
}

/// Outcome of resolving a source display name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    Matched {
        identity: DestinationUser,
        kind: MatchKind,
        /// 1.0 for override and exact matches.
        score: f64,
    },
    Unassigned {
        reason: UnassignedReason,
    },
}

impl Resolution {
    /// Returns the matched destination user id, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<u64> {
        match self {
            Self::Matched { identity, .. } => Some(identity.id),
            Self::Unassigned { .. } => None,
        }
    }
}

/// Why a name was left unassigned.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UnassignedReason {
    #[error("no assignee in the export")]
    NoAssignee,

    #[error("user mapping sends '{name}' to '{target}', who is not a project member")]
    UnmappedOverrideTarget { name: String, target: String },

    #[error("no confident match for '{name}' (best score {best:.3}, ambiguous: {ambiguous})")]
    NoConfidentMatch {
        name: String,
        best: f64,
        ambiguous: bool,
    },
}

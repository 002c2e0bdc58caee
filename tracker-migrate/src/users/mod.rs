//! Source display name to destination identity resolution.
//!
//! Resolution order for a trimmed, non-empty name:
//!
//! 1. explicit override (case-sensitive); the target must be a project member,
//! 2. exact match on display name, username or `@username`,
//! 3. Jaro-Winkler similarity against normalised display names, accepted only
//!    above the threshold and outside the tie margin of the runner-up.
//!
//! The roster is kept sorted by id, so results never depend on the order the
//! destination listed its members in.

mod resolution;

pub use resolution::{MatchKind, Resolution, UnassignedReason};

use crate::remote::DestinationUser;
use std::collections::HashMap;

/// Resolves source names against a destination roster.
#[derive(Debug, Clone)]
pub struct UserResolver {
    roster: Vec<DestinationUser>,
    overrides: HashMap<String, String>,
    threshold: f64,
    tie_margin: f64,
}

impl UserResolver {
    /// Creates a resolver.
    ///
    /// # Arguments
    ///
    /// * `roster` - Destination project members
    /// * `overrides` - Source name to destination name (display name, username or `@username`)
    /// * `threshold` - Minimum fuzzy score to accept
    /// * `tie_margin` - Minimum lead the best fuzzy candidate needs over the runner-up
    #[must_use]
    pub fn new(
        mut roster: Vec<DestinationUser>,
        overrides: HashMap<String, String>,
        threshold: f64,
        tie_margin: f64,
    ) -> Self {
        roster.sort_by_key(|user| user.id);
        Self {
            roster,
            overrides,
            threshold,
            tie_margin,
        }
    }

    /// Number of project members known to the resolver.
    #[must_use]
    pub fn roster_len(&self) -> usize {
        self.roster.len()
    }

    /// Resolves a source display name.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Resolution {
        let name = name.trim();
        if name.is_empty() {
            return unassigned(UnassignedReason::NoAssignee);
        }

        if let Some(target) = self.overrides.get(name) {
            return match self.find_exact(target.trim()) {
                Some(identity) => matched(identity, MatchKind::Override, 1.0),
                None => unassigned(UnassignedReason::UnmappedOverrideTarget {
                    name: name.to_string(),
                    target: target.clone(),
                }),
            };
        }

        if let Some(identity) = self.find_exact(name) {
            return matched(identity, MatchKind::Exact, 1.0);
        }

        self.resolve_fuzzy(name)
    }

    fn find_exact(&self, name: &str) -> Option<&DestinationUser> {
        let username = name.strip_prefix('@');
        self.roster.iter().find(|user| {
            user.full_name == name
                || user.username == name
                || username.is_some_and(|username| user.username == username)
        })
    }

    fn resolve_fuzzy(&self, name: &str) -> Resolution {
        let input = normalize(name);
        let mut scored: Vec<(f64, &DestinationUser)> = self
            .roster
            .iter()
            .map(|user| (strsim::jaro_winkler(&input, &normalize(display_name(user))), user))
            .collect();
        // Stable sort over an id-sorted roster: equal scores stay in id order.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let Some(&(best, identity)) = scored.first() else {
            return unassigned(UnassignedReason::NoConfidentMatch {
                name: name.to_string(),
                best: 0.0,
                ambiguous: false,
            });
        };
        let ambiguous = scored
            .get(1)
            .is_some_and(|&(second, _)| best - second <= self.tie_margin);

        if best >= self.threshold && !ambiguous {
            matched(identity, MatchKind::Fuzzy, best)
        } else {
            unassigned(UnassignedReason::NoConfidentMatch {
                name: name.to_string(),
                best,
                ambiguous,
            })
        }
    }
}

fn display_name(user: &DestinationUser) -> &str {
    if user.full_name.trim().is_empty() {
        &user.username
    } else {
        &user.full_name
    }
}

/// Lowercases and collapses whitespace.
pub(crate) fn normalize(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn matched(identity: &DestinationUser, kind: MatchKind, score: f64) -> Resolution {
    Resolution::Matched {
        identity: identity.clone(),
        kind,
        score,
    }
}

fn unassigned(reason: UnassignedReason) -> Resolution {
    Resolution::Unassigned { reason }
}

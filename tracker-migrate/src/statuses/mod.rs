//! Destination status bookkeeping.
//!
//! Statuses are matched by slug, the same key the destination uses. Missing
//! statuses are created on first use when auto-creation is enabled. The set only
//! ever grows: nothing is renamed or deleted.

mod error;

pub use error::StatusError;

use crate::remote::{DestinationApi, DestinationStatus};
use crate::retry::{with_retry, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// How a record's status label was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolvedStatus {
    /// Already defined in the destination project.
    Existing { id: u64 },
    /// Created during this run.
    Created { id: u64 },
    /// Would be created (dry run).
    Planned,
    /// Empty label, or unknown label under the `default` policy: the record
    /// keeps the project's default status.
    Default,
}

impl ResolvedStatus {
    /// Status id to send with the record, `None` for the project default.
    #[must_use]
    pub fn id(&self) -> Option<u64> {
        match self {
            Self::Existing { id } | Self::Created { id } => Some(*id),
            Self::Planned | Self::Default => None,
        }
    }
}

/// What to do with a record whose status is unknown and cannot be created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownStatusPolicy {
    /// Skip the record and report it.
    #[default]
    Skip,
    /// Create the record in the project's default status.
    Default,
}

/// Lowercases and collapses every run of non-alphanumerics into one `-`.
///
/// `"Dev Done"` and `"dev-done"` share the slug `dev-done`.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Known destination statuses plus the outcome of every creation attempt.
#[derive(Debug)]
pub struct StatusRegistry {
    by_slug: HashMap<String, DestinationStatus>,
    planned: HashSet<String>,
    failed: HashMap<String, StatusError>,
    auto_create: bool,
    retry: RetryPolicy,
}

impl StatusRegistry {
    /// Creates a registry from the project's current statuses.
    #[must_use]
    pub fn new(statuses: Vec<DestinationStatus>, auto_create: bool, retry: RetryPolicy) -> Self {
        let mut registry = Self {
            by_slug: HashMap::new(),
            planned: HashSet::new(),
            failed: HashMap::new(),
            auto_create,
            retry,
        };
        registry.extend(statuses);
        registry
    }

    /// Number of known statuses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_slug
            .values()
            .map(|status| status.id)
            .collect::<HashSet<_>>()
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_slug.is_empty()
    }

    fn extend(&mut self, statuses: Vec<DestinationStatus>) {
        for status in statuses {
            let by_name = slugify(&status.name);
            let by_remote_slug = slugify(&status.slug);
            if !by_remote_slug.is_empty() && by_remote_slug != by_name {
                self.by_slug.insert(by_remote_slug, status.clone());
            }
            self.by_slug.insert(by_name, status);
        }
    }

    /// Resolves a status label, creating it remotely if needed and allowed.
    ///
    /// In a dry run nothing is created: unknown labels resolve to
    /// [`ResolvedStatus::Planned`] when creation is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`StatusError::Unknown`] when the label is unknown and creation
    /// is disabled, or [`StatusError::Registry`] when creation failed. A failed
    /// creation is cached; later calls for the same label fail immediately.
    pub async fn ensure_status(
        &mut self,
        api: &dyn DestinationApi,
        name: &str,
        dry_run: bool,
    ) -> Result<ResolvedStatus, StatusError> {
        let name = name.trim();
        let slug = slugify(name);
        if slug.is_empty() {
            return Ok(ResolvedStatus::Default);
        }

        if let Some(status) = self.by_slug.get(&slug) {
            return Ok(ResolvedStatus::Existing { id: status.id });
        }
        if let Some(error) = self.failed.get(&slug) {
            return Err(error.clone());
        }
        if !self.auto_create {
            return Err(StatusError::Unknown {
                name: name.to_string(),
            });
        }
        if dry_run {
            if self.planned.insert(slug) {
                info!(status = name, "Would create status");
            }
            return Ok(ResolvedStatus::Planned);
        }

        match self.create(api, name, &slug).await {
            Ok(resolved) => Ok(resolved),
            Err(error) => {
                self.failed.insert(slug, error.clone());
                Err(error)
            }
        }
    }

    async fn create(
        &mut self,
        api: &dyn DestinationApi,
        name: &str,
        slug: &str,
    ) -> Result<ResolvedStatus, StatusError> {
        let retry = self.retry.clone();
        let first_error =
            match with_retry(&retry, "create status", || api.create_status(name)).await {
                Ok(status) => return Ok(self.created(slug, status)),
                Err(e) => e,
            };
        warn!(status = name, error = %first_error, "Failed to create status, re-listing");

        // Another client may have created it in the meantime.
        match with_retry(&retry, "list statuses", || api.list_statuses()).await {
            Ok(statuses) => {
                self.extend(statuses);
                if let Some(status) = self.by_slug.get(slug) {
                    return Ok(ResolvedStatus::Existing { id: status.id });
                }
            }
            Err(e) => warn!(error = %e, "Failed to re-list statuses"),
        }

        match with_retry(&retry, "create status", || api.create_status(name)).await {
            Ok(status) => Ok(self.created(slug, status)),
            Err(e) => Err(StatusError::Registry {
                name: name.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn created(&mut self, slug: &str, status: DestinationStatus) -> ResolvedStatus {
        info!(status = %status.name, id = status.id, "Created status");
        let id = status.id;
        self.by_slug.insert(slug.to_string(), status.clone());
        self.extend(vec![status]);
        ResolvedStatus::Created { id }
    }
}

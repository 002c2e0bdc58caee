//! Capability traits for the systems on either side of a migration.
//!
//! The migration core never speaks HTTP. It talks to the destination tracker
//! through [`DestinationApi`] and downloads attachment bytes through
//! [`AttachmentSource`]. Concrete implementations live in [`crate::taiga`] and
//! [`crate::jira`]; tests substitute in-memory fakes.

mod error;
pub(crate) mod http;
mod types;

pub use error::ApiError;
pub use types::{DestinationStatus, DestinationUser, NewComment, NewRecord};

use crate::records::AttachmentRef;
use async_trait::async_trait;

/// Operations the migrator needs from the destination tracker.
///
/// Every method maps to one remote call. Retrying is the caller's job, so
/// implementations should report transient failures through [`ApiError`]
/// rather than retrying internally.
#[async_trait]
pub trait DestinationApi: Send + Sync {
    /// Lists the members of the destination project.
    async fn list_users(&self) -> Result<Vec<DestinationUser>, ApiError>;

    /// Lists the statuses currently defined in the destination project.
    async fn list_statuses(&self) -> Result<Vec<DestinationStatus>, ApiError>;

    /// Creates a new status with the given display name.
    async fn create_status(&self, name: &str) -> Result<DestinationStatus, ApiError>;

    /// Creates a record and returns its remote id.
    async fn create_record(&self, record: &NewRecord) -> Result<u64, ApiError>;

    /// Adds a comment to an existing record and returns the comment's remote id.
    async fn create_comment(&self, record_id: u64, comment: &NewComment) -> Result<u64, ApiError>;

    /// Uploads a file to an existing record and returns the attachment's remote id.
    async fn upload_attachment(
        &self,
        record_id: u64,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<u64, ApiError>;
}

/// Fetches attachment contents from the source tracker.
#[async_trait]
pub trait AttachmentSource: Send + Sync {
    /// Downloads the bytes behind an attachment reference.
    async fn fetch(&self, attachment: &AttachmentRef) -> Result<Vec<u8>, ApiError>;
}

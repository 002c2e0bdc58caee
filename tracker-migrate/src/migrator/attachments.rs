//! Attachment transfer.

use crate::records::AttachmentRef;
use crate::remote::{ApiError, AttachmentSource, DestinationApi};
use crate::retry::{with_retry, RetryPolicy};
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

/// Transfers `pending` attachments to `record_id` with at most `concurrency`
/// in flight. Results come back in the order of `pending`.
pub(super) async fn transfer_all(
    api: &dyn DestinationApi,
    source: &dyn AttachmentSource,
    retry: &RetryPolicy,
    record_id: u64,
    pending: Vec<(usize, &AttachmentRef)>,
    concurrency: usize,
) -> Vec<(usize, Result<u64, ApiError>)> {
    let mut slots: Vec<(usize, Result<u64, ApiError>)> = stream::iter(pending)
        .map(|(index, attachment)| async move {
            let uploaded = transfer(api, source, retry, record_id, attachment).await;
            (index, uploaded)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    slots.sort_by_key(|(index, _)| *index);
    slots
}

/// Downloads one attachment and uploads it. The bytes are dropped on return.
async fn transfer(
    api: &dyn DestinationApi,
    source: &dyn AttachmentSource,
    retry: &RetryPolicy,
    record_id: u64,
    attachment: &AttachmentRef,
) -> Result<u64, ApiError> {
    let filename = attachment.filename.as_str();
    debug!(filename, url = %attachment.url, "Downloading attachment");

    let bytes = with_retry(retry, "download attachment", || source.fetch(attachment))
        .await
        .inspect_err(|e| warn!(filename, error = %e, "Failed to download attachment"))?;

    let size = bytes.len();
    let id = with_retry(retry, "upload attachment", || {
        api.upload_attachment(record_id, filename, bytes.clone())
    })
    .await
    .inspect_err(|e| warn!(filename, error = %e, "Failed to upload attachment"))?;

    debug!(filename, size, id, "Uploaded attachment");
    Ok(id)
}

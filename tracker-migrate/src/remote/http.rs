//! Response handling shared by the HTTP adapters.

use super::ApiError;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Response;

/// Longest error body kept in an [`ApiError`] message.
const MAX_ERROR_BODY: usize = 512;

/// Returns the response if its status is a success, otherwise the matching
/// [`ApiError`] with the (truncated) body as message.
pub(crate) async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = retry_after_secs(response.headers());
    let mut message = response.text().await.unwrap_or_default();
    if message.len() > MAX_ERROR_BODY {
        let cut = (0..=MAX_ERROR_BODY)
            .rev()
            .find(|&i| message.is_char_boundary(i))
            .unwrap_or(0);
        message.truncate(cut);
    }
    if message.trim().is_empty() {
        message = status.canonical_reason().unwrap_or("no body").to_string();
    }

    Err(ApiError::from_status(status.as_u16(), message, retry_after))
}

/// Reads a `Retry-After` header given in seconds.
pub(crate) fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

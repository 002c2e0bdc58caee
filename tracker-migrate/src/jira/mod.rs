//! Jira attachment downloads.

use crate::records::AttachmentRef;
use crate::remote::http::check_status;
use crate::remote::{ApiError, AttachmentSource};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Jira Cloud credentials: account email plus API token.
#[derive(Clone)]
pub struct JiraCredentials {
    pub username: String,
    pub api_token: String,
}

impl std::fmt::Debug for JiraCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraCredentials")
            .field("username", &self.username)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

/// Downloads attachments from the URLs in a Jira export.
#[derive(Debug)]
pub struct JiraAttachments {
    http: Client,
    credentials: Option<JiraCredentials>,
}

impl JiraAttachments {
    /// Creates a downloader. Without credentials, requests are anonymous.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(credentials: Option<JiraCredentials>) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("tracker-migrate/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, credentials })
    }
}

#[async_trait]
impl AttachmentSource for JiraAttachments {
    async fn fetch(&self, attachment: &AttachmentRef) -> Result<Vec<u8>, ApiError> {
        let url = url::Url::parse(&attachment.url).map_err(|e| ApiError::Rejected {
            status: 0,
            message: format!("invalid attachment URL '{}': {e}", attachment.url),
        })?;

        let mut request = self.http.get(url);
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.api_token));
        }

        let response = check_status(request.send().await?).await?;
        let bytes = response.bytes().await?;
        debug!(filename = %attachment.filename, size = bytes.len(), "Downloaded attachment");
        Ok(bytes.to_vec())
    }
}

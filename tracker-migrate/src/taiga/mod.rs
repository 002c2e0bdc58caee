//! Taiga REST client.
//!
//! Implements [`DestinationApi`] for user stories in one Taiga project. Comments
//! are added through Taiga's story history: the story is patched with a
//! `comment` field and the returned story version serves as the comment id.

mod error;
mod wire;

pub use error::TaigaError;

use crate::remote::http::check_status;
use crate::remote::{ApiError, DestinationApi, DestinationStatus, DestinationUser, NewComment, NewRecord};
use crate::statuses::slugify;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Colours assigned to new statuses, in rotation.
const STATUS_COLORS: &[&str] = &[
    "#70728F", "#E47C40", "#A58C43", "#DA6095", "#8E44AD", "#2ECC71", "#3498DB",
];

/// Status names (by slug) created as closed statuses.
const CLOSED_STATUSES: &[&str] = &["done", "dev-done", "closed", "ready-for-prod"];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Authenticated client bound to one Taiga project.
pub struct TaigaClient {
    http: Client,
    base: Url,
    token: String,
    project_id: u64,
    project_slug: String,
    next_color: AtomicUsize,
}

impl std::fmt::Debug for TaigaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaigaClient")
            .field("base", &self.base.as_str())
            .field("project_id", &self.project_id)
            .field("project_slug", &self.project_slug)
            .finish_non_exhaustive()
    }
}

impl TaigaClient {
    /// Logs in and loads the project.
    ///
    /// # Arguments
    ///
    /// * `host` - Taiga base URL, e.g. `https://tree.taiga.io`
    /// * `username` - Login name or email
    /// * `password` - Account password
    /// * `project_slug` - Slug of the destination project
    ///
    /// # Errors
    ///
    /// Returns [`TaigaError`] if the host is invalid, login fails, or the
    /// project cannot be loaded.
    pub async fn connect(
        host: &str,
        username: &str,
        password: &str,
        project_slug: &str,
    ) -> Result<Self, TaigaError> {
        let base = parse_host(host)?;
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("tracker-migrate/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let auth_url = endpoint(&base, "auth").map_err(|source| TaigaError::Authentication {
            username: username.to_string(),
            source,
        })?;
        let request = http.post(auth_url).json(&wire::AuthRequest {
            kind: "normal",
            username,
            password,
        });
        let auth: wire::AuthResponse =
            read_json(request)
                .await
                .map_err(|source| TaigaError::Authentication {
                    username: username.to_string(),
                    source,
                })?;
        info!(username, "Authenticated with Taiga");

        let mut client = Self {
            http,
            base,
            token: auth.auth_token,
            project_id: 0,
            project_slug: project_slug.to_string(),
            next_color: AtomicUsize::new(0),
        };
        let project = client
            .project()
            .await
            .map_err(|source| TaigaError::Project {
                slug: project_slug.to_string(),
                source,
            })?;
        info!(project = %project.name, id = project.id, "Connected to Taiga project");
        client.project_id = project.id;

        Ok(client)
    }

    /// Id of the connected project.
    #[must_use]
    pub fn project_id(&self) -> u64 {
        self.project_id
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        endpoint(&self.base, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.token)
    }

    async fn project(&self) -> Result<wire::Project, ApiError> {
        let mut url = self.url("projects/by_slug")?;
        url.query_pairs_mut().append_pair("slug", &self.project_slug);
        read_json(self.authorized(self.http.get(url))).await
    }

    async fn story(&self, story_id: u64) -> Result<wire::Story, ApiError> {
        let url = self.url(&format!("userstories/{story_id}"))?;
        read_json(self.authorized(self.http.get(url))).await
    }

    fn next_status_color(&self) -> &'static str {
        let index = self.next_color.fetch_add(1, Ordering::Relaxed);
        STATUS_COLORS[index % STATUS_COLORS.len()]
    }
}

#[async_trait]
impl DestinationApi for TaigaClient {
    async fn list_users(&self) -> Result<Vec<DestinationUser>, ApiError> {
        let project = self.project().await?;
        Ok(project
            .members
            .into_iter()
            .filter(|member| member.is_active)
            .map(|member| DestinationUser {
                id: member.id,
                full_name: if member.full_name_display.is_empty() {
                    member.full_name
                } else {
                    member.full_name_display
                },
                username: member.username,
            })
            .collect())
    }

    async fn list_statuses(&self) -> Result<Vec<DestinationStatus>, ApiError> {
        let mut url = self.url("userstory-statuses")?;
        url.query_pairs_mut()
            .append_pair("project", &self.project_id.to_string());
        let statuses: Vec<wire::Status> = read_json(self.authorized(self.http.get(url))).await?;
        Ok(statuses
            .into_iter()
            .map(|status| DestinationStatus {
                id: status.id,
                name: status.name,
                slug: status.slug,
            })
            .collect())
    }

    async fn create_status(&self, name: &str) -> Result<DestinationStatus, ApiError> {
        let slug = slugify(name);
        let payload = wire::NewStatus {
            project: self.project_id,
            name,
            slug: &slug,
            is_closed: is_closed_status(name),
            color: self.next_status_color(),
        };
        let url = self.url("userstory-statuses")?;
        let status: wire::Status =
            read_json(self.authorized(self.http.post(url).json(&payload))).await?;
        debug!(status = name, id = status.id, "Created Taiga status");
        Ok(DestinationStatus {
            id: status.id,
            name: status.name,
            slug: status.slug,
        })
    }

    async fn create_record(&self, record: &NewRecord) -> Result<u64, ApiError> {
        let payload = wire::NewStory {
            project: self.project_id,
            subject: &record.title,
            description: &record.description,
            status: record.status_id,
            assigned_to: record.assignee_id,
        };
        let url = self.url("userstories")?;
        let story: wire::Story =
            read_json(self.authorized(self.http.post(url).json(&payload))).await?;
        Ok(story.id)
    }

    async fn create_comment(&self, record_id: u64, comment: &NewComment) -> Result<u64, ApiError> {
        let current = self.story(record_id).await?;
        let payload = wire::CommentPatch {
            comment: &comment.body,
            version: current.version,
        };
        let url = self.url(&format!("userstories/{record_id}"))?;
        let updated: wire::Story =
            read_json(self.authorized(self.http.patch(url).json(&payload))).await?;
        Ok(updated.version)
    }

    async fn upload_attachment(
        &self,
        record_id: u64,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<u64, ApiError> {
        let form = Form::new()
            .text("project", self.project_id.to_string())
            .text("object_id", record_id.to_string())
            .part(
                "attached_file",
                Part::bytes(bytes).file_name(filename.to_string()),
            );
        let url = self.url("userstories/attachments")?;
        let attachment: wire::Attachment =
            read_json(self.authorized(self.http.post(url).multipart(form))).await?;
        Ok(attachment.id)
    }
}

/// Sends a request and decodes the JSON body of a successful response.
async fn read_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
    let response = check_status(request.send().await?).await?;
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

/// Parses the host, accepting it with or without a trailing slash.
fn parse_host(host: &str) -> Result<Url, TaigaError> {
    let trimmed = host.trim().trim_end_matches('/');
    Url::parse(&format!("{trimmed}/")).map_err(|source| TaigaError::InvalidHost {
        host: host.to_string(),
        source,
    })
}

/// `{base}/api/v1/{path}`
fn endpoint(base: &Url, path: &str) -> Result<Url, ApiError> {
    base.join("api/v1/")
        .and_then(|api| api.join(path))
        .map_err(|e| ApiError::InvalidResponse(format!("invalid endpoint '{path}': {e}")))
}

/// Whether a newly created status should count as closed.
fn is_closed_status(name: &str) -> bool {
    CLOSED_STATUSES.contains(&slugify(name).as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_endpoints_under_the_host_path() {
        let base = parse_host("https://taiga.example.com/").unwrap();
        assert_eq!(
            endpoint(&base, "userstories/12").unwrap().as_str(),
            "https://taiga.example.com/api/v1/userstories/12"
        );

        let nested = parse_host("https://example.com/taiga").unwrap();
        assert_eq!(
            endpoint(&nested, "auth").unwrap().as_str(),
            "https://example.com/taiga/api/v1/auth"
        );
    }

    #[test]
    fn rejects_invalid_host() {
        assert!(matches!(
            parse_host("not a url"),
            Err(TaigaError::InvalidHost { .. })
        ));
    }

    #[test]
    fn closed_statuses() {
        assert!(is_closed_status("Done"));
        assert!(is_closed_status("Dev Done"));
        assert!(is_closed_status("Ready for Prod"));
        assert!(!is_closed_status("In Progress"));
    }

    #[test]
    fn story_payload_omits_missing_ids() {
        let payload = wire::NewStory {
            project: 3,
            subject: "Title",
            description: "<p>x</p>",
            status: None,
            assigned_to: Some(9),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["project"], 3);
        assert_eq!(json["assigned_to"], 9);
        assert!(json.get("status").is_none());
    }

    #[test]
    fn member_display_name_defaults() {
        let member: wire::Member =
            serde_json::from_str(r#"{"id": 4, "username": "ann"}"#).unwrap();
        assert!(member.is_active);
        assert!(member.full_name_display.is_empty());
    }
}

//! Taiga REST payloads.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(super) struct AuthRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct AuthResponse {
    pub auth_token: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct Project {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub members: Vec<Member>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Member {
    pub id: u64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub full_name_display: String,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub(super) struct Status {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Serialize)]
pub(super) struct NewStatus<'a> {
    pub project: u64,
    pub name: &'a str,
    pub slug: &'a str,
    pub is_closed: bool,
    pub color: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct NewStory<'a> {
    pub project: u64,
    pub subject: &'a str,
    pub description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Story {
    pub id: u64,
    pub version: u64,
}

#[derive(Debug, Serialize)]
pub(super) struct CommentPatch<'a> {
    pub comment: &'a str,
    pub version: u64,
}

#[derive(Debug, Deserialize)]
pub(super) struct Attachment {
    pub id: u64,
}

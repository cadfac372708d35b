//! JSON response bodies.

use serde::Serialize;

/// Error body returned with every non-2xx JSON response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// A navigation link offered to the visitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavLink {
    pub href: String,
    pub text: String,
}

/// `GET /` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeResponse {
    pub authenticated: bool,
    pub links: Vec<NavLink>,
}

/// `GET /health` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions: usize,
}

/// `GET /user` body: the signed-in GitLab user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    pub name: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub last_activity_on: Option<String>,
}

/// One entry of `GET /activities`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// 1-based position in the feed.
    pub n: usize,
    #[serde(rename = "type")]
    pub kind: String,
    pub action: String,
    pub title: String,
    pub created_at: String,
}

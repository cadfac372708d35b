//! GitLab REST client for the signed-in user.
//!
//! Profile and event lookups; every call is authorised with the session's
//! access token.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::models::{Activity, UserProfile};

/// Largest page requested from the events API.
pub const EVENTS_PAGE_SIZE: usize = 10;

const PLACEHOLDER: &str = " - ";

/// GitLab API errors.
#[derive(Debug, Error)]
pub enum GitlabError {
    #[error("GitLab rejected the access token")]
    Unauthorized,

    #[error("GitLab request failed: {0}")]
    Request(String),

    #[error("GitLab returned HTTP {0}")]
    Status(StatusCode),

    #[error("GitLab response parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Deserialize)]
struct GitlabUser {
    id: u64,
    username: String,
    name: String,
    email: Option<String>,
    public_email: Option<String>,
    avatar_url: Option<String>,
    last_activity_on: Option<String>,
}

/// An entry of `GET /api/v4/users/:id/events`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitlabEvent {
    #[serde(default)]
    pub action_name: String,
    pub target_type: Option<String>,
    pub target_title: Option<String>,
    #[serde(default)]
    pub created_at: String,
    pub push_data: Option<PushData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushData {
    #[serde(default)]
    pub commit_count: u64,
    #[serde(rename = "ref")]
    pub ref_name: Option<String>,
    pub commit_title: Option<String>,
}

impl GitlabEvent {
    /// Display form: target title, else the pushed commit's title.
    fn title(&self) -> String {
        let commit_title = self.push_data.as_ref().and_then(|p| p.commit_title.as_ref());
        self.target_title
            .iter()
            .chain(commit_title)
            .find(|t| !t.is_empty())
            .cloned()
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }

    /// Display form: the target type, or a push summary for pushes.
    fn kind(&self) -> String {
        if self.action_name != "pushed to"
            && let Some(target) = self.target_type.as_ref().filter(|t| !t.is_empty())
        {
            return target.clone();
        }
        match &self.push_data {
            Some(PushData {
                commit_count,
                ref_name: Some(ref_name),
                ..
            }) if *commit_count > 0 && !ref_name.is_empty() => {
                format!("{commit_count} files {} {ref_name}", self.action_name)
            }
            _ => PLACEHOLDER.to_string(),
        }
    }

    pub fn into_activity(self, n: usize) -> Activity {
        Activity {
            n,
            kind: self.kind(),
            title: self.title(),
            action: self.action_name,
            created_at: self.created_at,
        }
    }
}

#[derive(Clone)]
pub struct GitlabClient {
    client: Client,
    host: Url,
}

impl GitlabClient {
    pub fn new(host: Url, timeout: Duration) -> Result<Self, GitlabError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GitlabError::Request(e.to_string()))?;
        Ok(Self { client, host })
    }

    /// `GET /api/v4/user` for the token's owner.
    pub async fn current_user(&self, access_token: &str) -> Result<UserProfile, GitlabError> {
        let url = format!("{}/api/v4/user", self.base());
        let user: GitlabUser = self.get_json(&url, access_token, &[]).await?;

        Ok(UserProfile {
            id: user.id,
            username: user.username,
            name: user.name,
            email: user.email.or(user.public_email).filter(|e| !e.is_empty()),
            avatar_url: user.avatar_url.map(|url| self.absolute_avatar(url)),
            last_activity_on: user.last_activity_on,
        })
    }

    /// One page of `GET /api/v4/users/:id/events`.
    pub async fn events(
        &self,
        access_token: &str,
        user_id: u64,
        page: usize,
        per_page: usize,
    ) -> Result<Vec<GitlabEvent>, GitlabError> {
        let url = format!("{}/api/v4/users/{user_id}/events", self.base());
        self.get_json(&url, access_token, &[("page", page), ("per_page", per_page)])
            .await
    }

    /// Up to `limit` of the token owner's newest events, numbered from 1.
    ///
    /// Pages are walked at a fixed size until enough events are collected
    /// or GitLab returns an empty page.
    pub async fn recent_activities(
        &self,
        access_token: &str,
        limit: usize,
    ) -> Result<Vec<Activity>, GitlabError> {
        let user = self.current_user(access_token).await?;
        let per_page = limit.clamp(1, EVENTS_PAGE_SIZE);

        let mut events = Vec::with_capacity(limit);
        let mut page = 1;
        while events.len() < limit {
            let batch = self.events(access_token, user.id, page, per_page).await?;
            if batch.is_empty() {
                break;
            }
            events.extend(batch);
            page += 1;
        }
        events.truncate(limit);
        debug!(user_id = user.id, count = events.len(), pages = page - 1, "fetched GitLab events");

        Ok(events
            .into_iter()
            .enumerate()
            .map(|(i, event)| event.into_activity(i + 1))
            .collect())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
        query: &[(&str, usize)],
    ) -> Result<T, GitlabError> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| GitlabError::Request(e.to_string()))?;

        match resp.status() {
            StatusCode::UNAUTHORIZED => return Err(GitlabError::Unauthorized),
            status if !status.is_success() => return Err(GitlabError::Status(status)),
            _ => {}
        }

        resp.json()
            .await
            .map_err(|e| GitlabError::Parse(e.to_string()))
    }

    fn base(&self) -> &str {
        self.host.as_str().trim_end_matches('/')
    }

    /// GitLab-hosted avatars come back as `/uploads/...`; gravatars are absolute.
    fn absolute_avatar(&self, url: String) -> String {
        if url.starts_with("/uploads/") {
            format!("{}{url}", self.base())
        } else {
            url
        }
    }
}

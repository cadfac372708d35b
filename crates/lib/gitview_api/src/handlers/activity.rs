//! Signed-in user's activity feed.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;
use tracing::warn;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::session::{self, BoundSession};
use crate::services::gitlab::GitlabError;

/// Events returned when the caller gives no `limit`.
pub const DEFAULT_ACTIVITY_LIMIT: usize = 101;
pub const MAX_ACTIVITY_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
pub struct ActivityParams {
    pub limit: Option<usize>,
}

/// `GET /activities`: the newest events of the session's owner.
pub async fn activities_handler(
    State(state): State<AppState>,
    Extension(bound): Extension<BoundSession>,
    jar: PrivateCookieJar,
    Query(params): Query<ActivityParams>,
) -> AppResult<Response> {
    let id = bound
        .cookie_id()
        .ok_or_else(|| AppError::Unauthorized("No session".into()))?;
    let limit = params.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    if limit == 0 || limit > MAX_ACTIVITY_LIMIT {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {MAX_ACTIVITY_LIMIT}"
        )));
    }
    let details = state.sessions.get_session(&id.to_string())?;

    match state
        .gitlab
        .recent_activities(details.access_token(), limit)
        .await
    {
        Ok(activities) => Ok(Json(activities).into_response()),
        Err(GitlabError::Unauthorized) => {
            warn!(session_id = %id, "GitLab rejected the session token");
            Ok(session::reauthenticate(&state, jar, id))
        }
        Err(e) => Err(e.into()),
    }
}

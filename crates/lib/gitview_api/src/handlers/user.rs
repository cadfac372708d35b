//! Signed-in user's profile.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use axum_extra::extract::PrivateCookieJar;
use tracing::warn;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::session::{self, BoundSession};
use crate::services::gitlab::GitlabError;

/// `GET /user`: the GitLab profile of the session's owner.
///
/// A token GitLab no longer accepts ends the session.
pub async fn profile_handler(
    State(state): State<AppState>,
    Extension(bound): Extension<BoundSession>,
    jar: PrivateCookieJar,
) -> AppResult<Response> {
    let id = bound
        .cookie_id()
        .ok_or_else(|| AppError::Unauthorized("No session".into()))?;
    let details = state.sessions.get_session(&id.to_string())?;

    match state.gitlab.current_user(details.access_token()).await {
        Ok(profile) => Ok(Json(profile).into_response()),
        Err(GitlabError::Unauthorized) => {
            warn!(session_id = %id, "GitLab rejected the session token");
            Ok(session::reauthenticate(&state, jar, id))
        }
        Err(e) => Err(e.into()),
    }
}

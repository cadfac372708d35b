//! GitLab OAuth login, callback and logout.

use axum::Extension;
use axum::extract::{Query, State};
use axum::response::Redirect;
use axum_extra::extract::PrivateCookieJar;
use gitview_core::auth::TokenProvider;
use gitview_core::session::{SessionError, SessionId};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::session::BoundSession;
use crate::routes;
use crate::services::cookies;

/// Query parameters GitLab appends to the callback URL.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// `GET /auth/gitlab`: send the browser to GitLab's authorize page.
pub async fn login_handler(State(state): State<AppState>) -> AppResult<Redirect> {
    let url = state
        .authenticator
        .authorize_url(&state.config.callback_url(), &state.config.scopes)?;
    Ok(Redirect::to(url.as_str()))
}

/// `GET /auth/gitlab-callback`: exchange the code and start a session.
pub async fn callback_handler(
    State(state): State<AppState>,
    Extension(bound): Extension<BoundSession>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> AppResult<(PrivateCookieJar, Redirect)> {
    if let Some(error) = &params.error {
        let description = params.error_description.as_deref().unwrap_or(error);
        warn!(error = %error, description = %description, "authorization denied by GitLab");
        return Err(AppError::Unauthorized(description.to_string()));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::Validation("No code provided".into()))?;

    let details = state
        .authenticator
        .authenticate(&code, &state.config.callback_url())
        .await?;

    // Never reuse an id the browser already presented; the old session ends here.
    let session_id = match bound.cookie_id() {
        Some(old) => {
            match state.sessions.delete_session(&old.to_string()) {
                Ok(()) => debug!(session_id = %old, "replaced session on re-login"),
                Err(SessionError::SessionNotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
            SessionId::generate()
        }
        None => bound.id,
    };
    let session_id = state
        .sessions
        .add_session(&session_id.to_string(), details)?;

    let cookie = cookies::session_cookie(
        &state.config.session_cookie_name,
        &session_id.to_string(),
        state.config.session_ttl_secs,
        state.config.secure_cookies,
    );
    info!(session_id = %session_id, "GitLab login successful");

    Ok((jar.add(cookie), Redirect::to(routes::GET_HOME)))
}

/// `GET /auth/logout`: drop the session and its cookie.
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(bound): Extension<BoundSession>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Redirect) {
    if let Some(id) = bound.cookie_id() {
        match state.sessions.delete_session(&id.to_string()) {
            Ok(()) => info!(session_id = %id, "logged out"),
            Err(e) => debug!(session_id = %id, error = %e, "logout without live session"),
        }
    }

    let jar = jar.remove(cookies::clear_session_cookie(
        &state.config.session_cookie_name,
    ));
    (jar, Redirect::to(routes::GET_HOME))
}

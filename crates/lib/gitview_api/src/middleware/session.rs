//! Session binding, expiry sweep, access gate and proactive refresh.
//!
//! Layered as: `bind_session` -> `sweep_expired_sessions` on every route,
//! then `require_session` -> `refresh_session` on protected routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;
use gitview_core::refresh::RefreshOutcome;
use gitview_core::session::SessionId;
use tracing::{debug, warn};

use crate::AppState;
use crate::routes;
use crate::services::cookies;

/// Session id associated with the current request.
///
/// When the request carried no usable cookie a fresh id is minted and
/// `from_cookie` is `false`; such an id never has a stored session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundSession {
    pub id: SessionId,
    pub from_cookie: bool,
}

impl BoundSession {
    /// The cookie id, if the request presented one.
    pub fn cookie_id(&self) -> Option<SessionId> {
        self.from_cookie.then_some(self.id)
    }
}

/// Read the session id from the encrypted cookie and store a
/// [`BoundSession`] in request extensions.
pub async fn bind_session(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let from_cookie = jar
        .get(&state.config.session_cookie_name)
        .and_then(|cookie| SessionId::parse(cookie.value()).ok());

    let bound = match from_cookie {
        Some(id) => BoundSession {
            id,
            from_cookie: true,
        },
        None => BoundSession {
            id: SessionId::generate(),
            from_cookie: false,
        },
    };

    request.extensions_mut().insert(bound);
    next.run(request).await
}

/// Evict expired sessions before the request is handled.
pub async fn sweep_expired_sessions(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    state.sessions.clear_expired_sessions();
    state.refresher.prune_locks();
    next.run(request).await
}

/// Redirect to the home page unless the request has a live session.
pub async fn require_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let live = request
        .extensions()
        .get::<BoundSession>()
        .and_then(BoundSession::cookie_id)
        .is_some_and(|id| matches!(state.sessions.has_session(&id.to_string()), Ok(true)));

    if !live {
        debug!(path = %request.uri().path(), "no session, redirecting home");
        return Redirect::to(routes::GET_HOME).into_response();
    }
    next.run(request).await
}

/// Refresh the session's token when it is about to expire.
///
/// A failed refresh drops the session and sends the browser back through
/// the login flow.
pub async fn refresh_session(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    request: Request,
    next: Next,
) -> Response {
    let Some(id) = request
        .extensions()
        .get::<BoundSession>()
        .and_then(BoundSession::cookie_id)
    else {
        return Redirect::to(routes::GET_HOME).into_response();
    };

    match state.refresher.refresh_if_needed(&id.to_string()).await {
        Ok(RefreshOutcome::Fresh | RefreshOutcome::Refreshed) => next.run(request).await,
        Ok(RefreshOutcome::Absent) => Redirect::to(routes::GET_HOME).into_response(),
        Err(e) => {
            warn!(session_id = %id, error = %e, "refresh failed, re-authenticating");
            reauthenticate(&state, jar, id)
        }
    }
}

/// Drop the session, clear its cookie and send the browser back through
/// the GitLab login.
pub fn reauthenticate(state: &AppState, jar: PrivateCookieJar, id: SessionId) -> Response {
    if let Err(e) = state.sessions.delete_session(&id.to_string()) {
        debug!(session_id = %id, error = %e, "session already gone");
    }
    let jar = jar.remove(cookies::clear_session_cookie(
        &state.config.session_cookie_name,
    ));
    (jar, Redirect::to(routes::GET_AUTH_GITLAB)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_id_only_for_cookie_bound_sessions() {
        let id = SessionId::generate();
        let bound = BoundSession {
            id,
            from_cookie: true,
        };
        assert_eq!(bound.cookie_id(), Some(id));

        let minted = BoundSession {
            id,
            from_cookie: false,
        };
        assert_eq!(minted.cookie_id(), None);
    }
}

//! # gitview_api
//!
//! HTTP front end for GitView: login via GitLab OAuth, session cookies,
//! and the routes that read the signed-in user's data.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::FromRef;
use axum::routing::get;
use axum_extra::extract::cookie::Key;
use gitview_core::auth::{OAuthError, OAuthenticator};
use gitview_core::refresh::SessionRefresher;
use gitview_core::session::{SessionLifecycleManager, SessionStore};
use tower_http::trace::TraceLayer;

use crate::config::{ApiConfig, MIN_SESSION_SECRET_LEN};
use crate::handlers::{activity, auth, health, home, user};
use crate::middleware::session;
use crate::services::gitlab::{GitlabClient, GitlabError};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    /// Session lifecycle over the process-wide session store.
    pub sessions: SessionLifecycleManager,
    pub refresher: Arc<SessionRefresher>,
    pub authenticator: Arc<OAuthenticator>,
    pub gitlab: GitlabClient,
    /// Key for the encrypted session cookie.
    pub cookie_key: Key,
}

impl AppState {
    /// Wire up the session store, OAuth client and GitLab client.
    pub fn new(config: ApiConfig) -> Result<Self, OAuthError> {
        if config.session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(OAuthError::InvalidConfiguration(format!(
                "SESSION_SECRET must be at least {MIN_SESSION_SECRET_LEN} bytes"
            )));
        }
        let timeout = Duration::from_secs(config.http_timeout_secs);
        let authenticator = Arc::new(OAuthenticator::with_timeout(config.gitlab.clone(), timeout)?);
        let gitlab = GitlabClient::new(authenticator.host().clone(), timeout)
            .map_err(|e: GitlabError| OAuthError::InvalidConfiguration(e.to_string()))?;

        let sessions = SessionLifecycleManager::new(Arc::new(SessionStore::new()));
        let refresher = Arc::new(SessionRefresher::new(
            sessions.clone(),
            authenticator.clone(),
            chrono::Duration::seconds(config.refresh_threshold_secs),
        ));
        let cookie_key = Key::derive_from(config.session_secret.as_bytes());

        Ok(Self {
            config,
            sessions,
            refresher,
            authenticator,
            gitlab,
            cookie_key,
        })
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    // Public routes (no session required)
    let public = Router::new()
        .route(routes::GET_HOME, get(home::home_handler))
        .route(routes::GET_HEALTH, get(health::health_handler))
        .route(routes::GET_AUTH_GITLAB, get(auth::login_handler))
        .route(routes::GET_AUTH_GITLAB_CALLBACK, get(auth::callback_handler))
        .route(routes::GET_AUTH_LOGOUT, get(auth::logout_handler));

    // Protected routes: require a live session, then refresh it if needed.
    // Route layers only, so unmatched paths fall through to a plain 404.
    let protected = Router::new()
        .route(routes::GET_USER, get(user::profile_handler))
        .route(routes::GET_ACTIVITIES, get(activity::activities_handler))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session::refresh_session,
        ))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session::require_session,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session::sweep_expired_sessions,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session::bind_session,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

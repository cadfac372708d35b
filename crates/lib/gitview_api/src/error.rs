//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gitview_core::auth::OAuthError;
use gitview_core::refresh::RefreshError;
use gitview_core::session::SessionError;
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::services::gitlab::GitlabError;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Upstream(m) => (StatusCode::BAD_GATEWAY, "upstream_error", m.as_str()),
            AppError::Internal(m) => {
                tracing::error!(error = %m, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::InvalidSessionId(_) => AppError::Validation(e.to_string()),
            SessionError::SessionNotFound(_) => AppError::Unauthorized(e.to_string()),
        }
    }
}

impl From<OAuthError> for AppError {
    fn from(e: OAuthError) -> Self {
        match e {
            OAuthError::InvalidConfiguration(msg) => AppError::Internal(msg),
            OAuthError::TokenExchangeFailed(msg) => AppError::Upstream(msg),
        }
    }
}

impl From<RefreshError> for AppError {
    fn from(e: RefreshError) -> Self {
        match e {
            RefreshError::Session(e) => AppError::from(e),
            RefreshError::OAuth(e) => AppError::from(e),
            RefreshError::MissingRefreshToken(_) => AppError::Unauthorized(e.to_string()),
        }
    }
}

impl From<GitlabError> for AppError {
    fn from(e: GitlabError) -> Self {
        match e {
            GitlabError::Unauthorized => AppError::Unauthorized(e.to_string()),
            _ => AppError::Upstream(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use gitview_core::session::SessionId;

    use super::*;

    #[test]
    fn session_errors_map_to_client_statuses() {
        let invalid = AppError::from(SessionError::InvalidSessionId("x".into()));
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);

        let missing = AppError::from(SessionError::SessionNotFound(SessionId::generate()));
        assert_eq!(missing.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn oauth_errors_map_to_server_statuses() {
        let failed = AppError::from(OAuthError::TokenExchangeFailed("down".into()));
        assert_eq!(failed.into_response().status(), StatusCode::BAD_GATEWAY);

        let config = AppError::from(OAuthError::InvalidConfiguration("bad host".into()));
        assert_eq!(
            config.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

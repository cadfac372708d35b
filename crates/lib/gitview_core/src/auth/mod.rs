//! OAuth grants and the token exchange against the provider.

pub mod details;
pub mod oauth;

pub use details::AuthDetails;
pub use oauth::{GitlabApplicationSettings, OAuthenticator, TokenProvider};

use thiserror::Error;

/// OAuth errors.
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),
}

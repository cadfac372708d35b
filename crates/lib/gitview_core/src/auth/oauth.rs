//! OAuth 2.0 token exchange against the GitLab token endpoint.
//!
//! Supports the `authorization_code` grant for logins and the
//! `refresh_token` grant for renewing a session. No retries happen here;
//! failures surface as [`OAuthError::TokenExchangeFailed`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::{AuthDetails, OAuthError};

/// Default timeout for a single token-endpoint request.
pub const DEFAULT_TOKEN_TIMEOUT: Duration = Duration::from_secs(30);

/// Registered GitLab application credentials.
#[derive(Clone)]
pub struct GitlabApplicationSettings {
    pub application_id: String,
    pub application_secret: String,
    /// Base URL of the GitLab instance (e.g. `https://gitlab.com`).
    pub host: String,
}

/// Exchanges codes and refresh tokens for new grants.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Complete a login: trade an authorization code for a grant.
    async fn authenticate(&self, code: &str, redirect_url: &str)
    -> Result<AuthDetails, OAuthError>;

    /// Renew a grant. `code` is carried into the new grant unchanged.
    async fn refresh(
        &self,
        code: Option<&str>,
        refresh_token: &str,
    ) -> Result<AuthDetails, OAuthError>;
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_uri: Option<&'a str>,
}

/// Response from the provider's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
}

/// Stateless client for the provider's `/oauth/token` endpoint.
#[derive(Clone)]
pub struct OAuthenticator {
    client: Client,
    client_id: String,
    client_secret: String,
    host: Url,
    token_url: Url,
}

impl OAuthenticator {
    /// Validate settings and build an authenticator with the default timeout.
    pub fn new(settings: GitlabApplicationSettings) -> Result<Self, OAuthError> {
        Self::with_timeout(settings, DEFAULT_TOKEN_TIMEOUT)
    }

    pub fn with_timeout(
        settings: GitlabApplicationSettings,
        timeout: Duration,
    ) -> Result<Self, OAuthError> {
        if settings.application_id.trim().is_empty() {
            return Err(OAuthError::InvalidConfiguration(
                "client id must not be empty".into(),
            ));
        }
        if settings.application_secret.trim().is_empty() {
            return Err(OAuthError::InvalidConfiguration(
                "client secret must not be empty".into(),
            ));
        }

        let host = parse_host(&settings.host)?;
        let token_url = endpoint(&host, "oauth/token")?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OAuthError::InvalidConfiguration(format!("http client: {e}")))?;

        Ok(Self {
            client,
            client_id: settings.application_id,
            client_secret: settings.application_secret,
            host,
            token_url,
        })
    }

    /// The provider base URL.
    pub fn host(&self) -> &Url {
        &self.host
    }

    /// Build the URL the browser is sent to for the authorization step.
    pub fn authorize_url(&self, redirect_url: &str, scopes: &[String]) -> Result<Url, OAuthError> {
        let mut url = endpoint(&self.host, "oauth/authorize")?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", &scopes.join(" "));
        Ok(url)
    }

    async fn request_grant(&self, request: &TokenRequest<'_>) -> Result<TokenResponse, OAuthError> {
        let resp = self
            .client
            .post(self.token_url.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(grant_type = request.grant_type, error = %e, "token request failed");
                OAuthError::TokenExchangeFailed(format!("{} request failed: {e}", request.grant_type))
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(grant_type = request.grant_type, %status, "token endpoint rejected request");
            return Err(OAuthError::TokenExchangeFailed(format!(
                "{} HTTP {status}: {body}",
                request.grant_type
            )));
        }

        resp.json::<TokenResponse>().await.map_err(|e| {
            OAuthError::TokenExchangeFailed(format!(
                "{} response parse error: {e}",
                request.grant_type
            ))
        })
    }
}

#[async_trait]
impl TokenProvider for OAuthenticator {
    async fn authenticate(
        &self,
        code: &str,
        redirect_url: &str,
    ) -> Result<AuthDetails, OAuthError> {
        let tokens = self
            .request_grant(&TokenRequest {
                client_id: &self.client_id,
                client_secret: &self.client_secret,
                grant_type: "authorization_code",
                code: Some(code),
                refresh_token: None,
                redirect_uri: Some(redirect_url),
            })
            .await?;

        debug!(expires_in = tokens.expires_in, "authorization code exchanged");
        Ok(AuthDetails::new(
            Some(code.to_string()),
            tokens.access_token,
            tokens.refresh_token,
            tokens.expires_in,
        ))
    }

    async fn refresh(
        &self,
        code: Option<&str>,
        refresh_token: &str,
    ) -> Result<AuthDetails, OAuthError> {
        let tokens = self
            .request_grant(&TokenRequest {
                client_id: &self.client_id,
                client_secret: &self.client_secret,
                grant_type: "refresh_token",
                code: None,
                refresh_token: Some(refresh_token),
                redirect_uri: None,
            })
            .await?;

        debug!(expires_in = tokens.expires_in, "refresh token exchanged");
        Ok(AuthDetails::new(
            code.map(str::to_string),
            tokens.access_token,
            tokens.refresh_token,
            tokens.expires_in,
        ))
    }
}

fn parse_host(raw: &str) -> Result<Url, OAuthError> {
    let host = Url::parse(raw.trim())
        .map_err(|e| OAuthError::InvalidConfiguration(format!("invalid host URL '{raw}': {e}")))?;
    if !matches!(host.scheme(), "http" | "https") || host.host_str().is_none() {
        return Err(OAuthError::InvalidConfiguration(format!(
            "host URL must be http(s) with a host: '{raw}'"
        )));
    }
    Ok(host)
}

/// Join `path` onto the host, keeping any path prefix the host carries.
fn endpoint(host: &Url, path: &str) -> Result<Url, OAuthError> {
    let base = host.as_str().trim_end_matches('/');
    Url::parse(&format!("{base}/{path}"))
        .map_err(|e| OAuthError::InvalidConfiguration(format!("invalid endpoint URL: {e}")))
}

//! Front end configuration.

use gitview_core::auth::GitlabApplicationSettings;
use thiserror::Error;

/// Minimum length of the cookie encryption secret, in bytes.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

/// Configuration errors. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0} is not set")]
    Missing(&'static str),

    #[error("Invalid configuration: {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Configuration for the web front end.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3000").
    pub bind_addr: String,
    /// Public base URL of this service, used to build the OAuth callback.
    pub base_url: String,
    /// GitLab application credentials and host.
    pub gitlab: GitlabApplicationSettings,
    /// OAuth scopes requested at login.
    pub scopes: Vec<String>,
    /// Master secret for the encrypted session cookie.
    pub session_secret: String,
    pub session_cookie_name: String,
    /// Session cookie max-age in seconds.
    pub session_ttl_secs: i64,
    /// Refresh tokens when fewer than this many seconds remain.
    pub refresh_threshold_secs: i64,
    /// Timeout for token endpoint and GitLab API requests.
    pub http_timeout_secs: u64,
    pub secure_cookies: bool,
}

impl ApiConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable                 | Default                  |
    /// |--------------------------|--------------------------|
    /// | `BIND_ADDR`              | `127.0.0.1:3000`         |
    /// | `BASE_URL`               | `http://localhost:3000`  |
    /// | `GITLAB_HOST_URL`        | required                 |
    /// | `GITLAB_CLIENT_ID`       | required                 |
    /// | `GITLAB_CLIENT_SECRET`   | required                 |
    /// | `GITLAB_SCOPES`          | `read_user read_api`     |
    /// | `SESSION_SECRET`         | required, >= 32 bytes    |
    /// | `SESSION_COOKIE_NAME`    | `gitview_session`        |
    /// | `SESSION_TTL_SECS`       | `3600`                   |
    /// | `REFRESH_THRESHOLD_SECS` | `300`                    |
    /// | `OAUTH_TIMEOUT_SECS`     | `30`                     |
    /// | `SECURE_COOKIES`         | `false`                  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| var(key).ok_or(ConfigError::Missing(key));

        let session_secret = required("SESSION_SECRET")?;
        if session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(ConfigError::Invalid {
                name: "SESSION_SECRET",
                reason: format!("must be at least {MIN_SESSION_SECRET_LEN} bytes"),
            });
        }

        let base_url = var("BASE_URL").unwrap_or_else(|| "http://localhost:3000".into());
        url::Url::parse(&base_url).map_err(|e| ConfigError::Invalid {
            name: "BASE_URL",
            reason: e.to_string(),
        })?;

        Ok(Self {
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:3000".into()),
            base_url: base_url.trim_end_matches('/').to_string(),
            gitlab: GitlabApplicationSettings {
                application_id: required("GITLAB_CLIENT_ID")?,
                application_secret: required("GITLAB_CLIENT_SECRET")?,
                host: required("GITLAB_HOST_URL")?,
            },
            scopes: var("GITLAB_SCOPES")
                .unwrap_or_else(|| "read_user read_api".into())
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            session_secret,
            session_cookie_name: var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|| "gitview_session".into()),
            session_ttl_secs: parse_or(&var, "SESSION_TTL_SECS", 3600)?,
            refresh_threshold_secs: parse_or(&var, "REFRESH_THRESHOLD_SECS", 300)?,
            http_timeout_secs: parse_or(&var, "OAUTH_TIMEOUT_SECS", 30)?,
            secure_cookies: parse_or(&var, "SECURE_COOKIES", false)?,
        })
    }

    /// Absolute URL GitLab redirects back to after authorization.
    pub fn callback_url(&self) -> String {
        format!("{}{}", self.base_url, crate::routes::GET_AUTH_GITLAB_CALLBACK)
    }
}

fn parse_or<T, F>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name: key,
            reason: e.to_string(),
        }),
    }
}

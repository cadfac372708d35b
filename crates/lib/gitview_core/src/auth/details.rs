//! A single OAuth grant.
//!
//! `AuthDetails` is never mutated after construction. Sessions are updated
//! by swapping in a whole new value.

use std::fmt;

use chrono::{DateTime, Duration, Utc};

/// Tokens and timing for one OAuth grant.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthDetails {
    code: Option<String>,
    access_token: String,
    refresh_token: Option<String>,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl AuthDetails {
    /// Build a grant issued now, valid for `expires_in` seconds.
    pub fn new(
        code: Option<String>,
        access_token: String,
        refresh_token: Option<String>,
        expires_in: i64,
    ) -> Self {
        Self::issued_at(code, access_token, refresh_token, expires_in, Utc::now())
    }

    /// Build a grant with an explicit issue time.
    ///
    /// Negative lifetimes are clamped to zero, which yields a grant that is
    /// already expired.
    pub fn issued_at(
        code: Option<String>,
        access_token: String,
        refresh_token: Option<String>,
        expires_in: i64,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let expires_at = issued_at + Duration::seconds(expires_in.max(0));
        Self {
            code,
            access_token,
            refresh_token,
            issued_at,
            expires_at,
        }
    }

    /// The authorization code the grant originated from.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Bearer token for GitLab API calls.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn issued(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Time left until expiry; negative once expired.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at - now
    }

    /// `true` once the current time has reached `expires_at`.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// Token material stays out of logs.
impl fmt::Debug for AuthDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthDetails")
            .field("code", &self.code.as_ref().map(|_| "<redacted>"))
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

//! Session cookie helpers.
//!
//! The cookie carries only the session id. It travels inside a
//! `PrivateCookieJar`, so the value is encrypted and authenticated.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

/// Build the http-only session cookie.
pub fn session_cookie(name: &str, session_id: &str, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), session_id.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(Duration::seconds(max_age_secs))
        .build()
}

/// Build the removal cookie for the session.
pub fn clear_session_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), String::new()))
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}

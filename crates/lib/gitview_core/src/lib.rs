//! # gitview_core
//!
//! Session and OAuth token lifecycle for GitView.
//!
//! Holds the in-memory mapping from browser session ids to OAuth grants,
//! exchanges and refreshes tokens against the GitLab token endpoint, and
//! applies the proactive refresh policy before requests are served.

pub mod auth;
pub mod refresh;
pub mod session;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

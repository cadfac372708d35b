//! Browser sessions mapped to OAuth grants.
//!
//! [`SessionStore`] owns the mapping; [`SessionLifecycleManager`] adds id
//! validation and the create/read/replace/delete/sweep policy on top.

pub mod id;
pub mod manager;
pub mod store;

pub use id::SessionId;
pub use manager::SessionLifecycleManager;
pub use store::SessionStore;

use thiserror::Error;

/// Session errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),
}

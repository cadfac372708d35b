//! Services used by handlers and middleware.

pub mod cookies;
pub mod gitlab;

//! Route paths.

pub const GET_HOME: &str = "/";
pub const GET_HEALTH: &str = "/health";
pub const GET_AUTH_GITLAB: &str = "/auth/gitlab";
pub const GET_AUTH_GITLAB_CALLBACK: &str = "/auth/gitlab-callback";
pub const GET_AUTH_LOGOUT: &str = "/auth/logout";
pub const GET_USER: &str = "/user";
pub const GET_ACTIVITIES: &str = "/activities";

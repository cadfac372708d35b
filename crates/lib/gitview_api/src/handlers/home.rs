//! Home page data.

use axum::extract::State;
use axum::{Extension, Json};

use crate::AppState;
use crate::middleware::session::BoundSession;
use crate::models::{HomeResponse, NavLink};
use crate::routes;

fn link(href: &str, text: &str) -> NavLink {
    NavLink {
        href: href.to_string(),
        text: text.to_string(),
    }
}

/// Navigation links for signed-in or anonymous visitors.
pub fn nav_links(authenticated: bool) -> Vec<NavLink> {
    if authenticated {
        vec![
            link(routes::GET_USER, "Profile"),
            link(routes::GET_ACTIVITIES, "Activities"),
            link(routes::GET_AUTH_LOGOUT, "Logout"),
        ]
    } else {
        vec![link(routes::GET_AUTH_GITLAB, "Login with GitLab")]
    }
}

/// `GET /`: whether the visitor is signed in and where they can go.
pub async fn home_handler(
    State(state): State<AppState>,
    Extension(bound): Extension<BoundSession>,
) -> Json<HomeResponse> {
    let authenticated = bound
        .cookie_id()
        .is_some_and(|id| matches!(state.sessions.has_session(&id.to_string()), Ok(true)));

    Json(HomeResponse {
        authenticated,
        links: nav_links(authenticated),
    })
}

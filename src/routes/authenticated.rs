use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes for any signed-in user regardless of role. The enclosing router wraps this module
/// in `gate::require_auth`, so anonymous callers are redirected to `/login` before any
/// handler runs.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /dashboard
        // Landing page after registration and login.
        .route("/dashboard", get(handlers::dashboard))
        // GET /me
        .route("/me", get(handlers::get_me))
}

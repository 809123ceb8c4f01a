use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// Routes exclusively for users whose record has `is_admin = true`.
///
/// Access Control:
/// The enclosing router wraps this module in `gate::require_admin`. Anonymous callers get a
/// 302 to `/login`, signed-in non-admins get a 403, and handlers here can assume an admin
/// `AuthUser` is present in the request extensions.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/test
        // A trivial protected page.
        .route("/test", get(handlers::admin_test))
        // GET /admin/users/create
        // Form for creating a user, with an "Administrator" checkbox.
        .route("/users/create", get(handlers::show_create_user_form))
        // POST /admin/users
        // Creates a user with the submitted `is_admin` flag. Does not switch sessions.
        .route("/users", post(handlers::create_user))
}

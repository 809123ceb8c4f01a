use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable by anonymous callers. `/register` is not unconditionally open:
/// its handlers consult `RegistrationPolicy`, which only admits anonymous callers while the
/// user store is empty.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers.
        .route("/health", get(|| async { "ok" }))
        .route("/", get(handlers::index))
        // GET/POST /register
        // Bootstrap registration for the first user, admin-only afterwards.
        .route(
            "/register",
            get(handlers::show_register_form).post(handlers::register),
        )
        .route(
            "/login",
            get(handlers::show_login_form).post(handlers::login),
        )
        .route("/logout", post(handlers::logout))
}

//! Router Module Index
//!
//! Routes are segregated by the access they require, so that a gate is applied once per
//! module (via `route_layer`) rather than remembered per handler.

/// Routes reachable without a session. Registration applies its own policy in the handlers.
pub mod public;

/// Routes behind `gate::require_auth`.
pub mod authenticated;

/// Routes behind `gate::require_admin`, nested under `/admin`.
pub mod admin;

//! Request interceptors that run before a route handler and decide whether it runs at all.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{AppState, auth::{self, AuthUser}, error::AppError};

/// GateDecision
///
/// Outcome of a gate check. A denial carries the error that will be rendered in place of
/// the handler's response.
#[derive(Debug)]
pub enum GateDecision {
    Allow,
    Deny(AppError),
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allow)
    }
}

/// Gate
///
/// A stateless capability check over the resolved principal. `None` means nobody is
/// signed in.
pub trait Gate: Send + Sync {
    fn check(&self, principal: Option<&AuthUser>) -> GateDecision;
}

/// Any signed-in user.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticatedGate;

impl Gate for AuthenticatedGate {
    fn check(&self, principal: Option<&AuthUser>) -> GateDecision {
        match principal {
            Some(_) => GateDecision::Allow,
            None => GateDecision::Deny(AppError::Unauthenticated),
        }
    }
}

/// Signed-in users whose record carries `is_admin = true`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminGate;

impl Gate for AdminGate {
    fn check(&self, principal: Option<&AuthUser>) -> GateDecision {
        match principal {
            None => GateDecision::Deny(AppError::Unauthenticated),
            Some(user) if !user.is_admin => GateDecision::Deny(AppError::Forbidden),
            Some(_) => GateDecision::Allow,
        }
    }
}

/// Resolves the principal, applies `gate`, and either forwards the request or renders the
/// denial. On success the principal is stashed in the request extensions so handlers
/// extracting `AuthUser` do not hit the store again.
async fn run_gate<G: Gate>(gate: G, state: AppState, mut request: Request, next: Next) -> Response {
    let principal = match auth::resolve_principal(request.headers(), &state.repo, &state.config).await {
        Ok(principal) => principal,
        Err(e) => return e.into_response(),
    };

    match gate.check(principal.as_ref()) {
        GateDecision::Allow => {
            if let Some(user) = principal {
                request.extensions_mut().insert(user);
            }
            next.run(request).await
        }
        GateDecision::Deny(err) => {
            tracing::debug!(
                path = %request.uri().path(),
                user_id = ?principal.as_ref().map(|u| u.id),
                reason = %err,
                "request denied by gate"
            );
            err.into_response()
        }
    }
}

/// Middleware for admin-only routes.
pub async fn require_admin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    run_gate(AdminGate, state, request, next).await
}

/// Middleware for routes that need any signed-in user.
pub async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    run_gate(AuthenticatedGate, state, request, next).await
}

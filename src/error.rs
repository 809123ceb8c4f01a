use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{repository::RepoError, validation::ValidationErrors};

/// Where unauthenticated callers are sent.
pub const LOGIN_PATH: &str = "/login";

/// A `302 Found` redirect. `axum::response::Redirect::to` emits 303, which browsers and
/// form-driven clients treat differently.
pub fn found(location: &'static str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// AppError
///
/// The single error type returned by handlers and middleware. Each variant maps to exactly
/// one HTTP outcome in `into_response`; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No valid session accompanies the request.
    #[error("unauthenticated")]
    Unauthenticated,
    /// A session exists but lacks the required privilege.
    #[error("forbidden")]
    Forbidden,
    /// The submitted form failed validation.
    #[error("the given data was invalid")]
    Validation(ValidationErrors),
    #[error("repository failure: {0}")]
    Repository(RepoError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            // Losing the bootstrap race is indistinguishable from arriving second.
            RepoError::NotEmpty => AppError::Forbidden,
            RepoError::DuplicateEmail => AppError::Validation(ValidationErrors::single(
                "email",
                "The email has already been taken.",
            )),
            other => AppError::Repository(other),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Unauthenticated => found(LOGIN_PATH),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden").into_response(),
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "message": "The given data was invalid.",
                    "errors": errors,
                })),
            )
                .into_response(),
            AppError::Repository(e) => {
                tracing::error!(error = %e, "repository failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

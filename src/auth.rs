use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    models::User,
    repository::RepositoryState,
};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

/// Development-only header naming a user id to act as.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// Payload of a session token. Only the subject is trusted; the admin bit is always
/// re-read from the user store so revocations take effect immediately.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's id.
    pub sub: Uuid,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
}

/// AuthUser
///
/// The resolved principal of an authenticated request. Absence of an `AuthUser`
/// is what "not authenticated" means throughout the crate.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub is_admin: bool,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            is_admin: user.is_admin,
        }
    }
}

fn ttl_out_of_range(ttl: u64) -> AppError {
    AppError::Internal(format!("session ttl of {ttl}s is out of range"))
}

/// Signs a session token for `user_id` valid for the configured TTL.
pub fn issue_token(user_id: Uuid, config: &AppConfig) -> Result<String, AppError> {
    let ttl = config.session_ttl_secs;
    let now = Utc::now().timestamp().max(0) as usize;
    let exp = usize::try_from(ttl)
        .ok()
        .and_then(|ttl| now.checked_add(ttl))
        .ok_or_else(|| ttl_out_of_range(ttl))?;
    let claims = Claims {
        sub: user_id,
        iat: now,
        exp,
    };
    let key = EncodingKey::from_secret(config.session_secret.as_bytes());
    encode(&Header::default(), &claims, &key)
        .map_err(|e| AppError::Internal(format!("failed to sign session token: {e}")))
}

/// Validates signature and expiry. Any failure yields `None`.
pub fn decode_token(token: &str, config: &AppConfig) -> Option<Claims> {
    let key = DecodingKey::from_secret(config.session_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<Claims>(token, &key, &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            tracing::debug!(error = %e, "rejected session token");
            None
        }
    }
}

/// Bearer header first, then the session cookie.
pub fn extract_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    if let Some(token) = bearer {
        return Some(token.to_string());
    }
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Max-Age matches the token lifetime.
pub fn session_cookie(token: &str, config: &AppConfig) -> Result<Cookie<'static>, AppError> {
    let ttl = config.session_ttl_secs;
    let max_age = i64::try_from(ttl).map_err(|_| ttl_out_of_range(ttl))?;
    let mut cookie = Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age))
        .build();
    if config.secure_cookies() {
        cookie.set_secure(true);
    }
    Ok(cookie)
}

pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, String::new()))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::seconds(0))
        .build()
}

/// resolve_principal
///
/// Works out who, if anyone, is making the request:
/// 1. `Env::Local` only: an `x-user-id` header naming an existing user.
/// 2. A session token from the bearer header or the session cookie.
/// 3. A store lookup of the token subject, so deleted users lose access.
///
/// Returns `Ok(None)` for every flavour of "no usable credentials"; errors are reserved
/// for the store itself failing.
pub async fn resolve_principal(
    headers: &HeaderMap,
    repo: &RepositoryState,
    config: &AppConfig,
) -> Result<Option<AuthUser>, AppError> {
    if config.env == Env::Local {
        let dev_id = headers
            .get(DEV_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok());
        if let Some(user_id) = dev_id {
            if let Some(user) = repo.get_user(user_id).await? {
                return Ok(Some(user.into()));
            }
        }
    }

    let jar = CookieJar::from_headers(headers);
    let Some(token) = extract_token(headers, &jar) else {
        return Ok(None);
    };
    let Some(claims) = decode_token(&token, config) else {
        return Ok(None);
    };

    let user = repo.get_user(claims.sub).await?;
    if user.is_none() {
        tracing::debug!(user_id = %claims.sub, "session token names an unknown user");
    }
    Ok(user.map(AuthUser::from))
}

/// Required principal: rejects with `Unauthenticated` (302 to the login page).
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // A gate earlier in the stack may already have resolved the principal.
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);
        resolve_principal(&parts.headers, &repo, &config)
            .await?
            .ok_or(AppError::Unauthenticated)
    }
}

/// Optional principal, for routes whose behaviour depends on who is asking.
impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(Some(user.clone()));
        }
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);
        resolve_principal(&parts.headers, &repo, &config).await
    }
}

#![allow(dead_code)]

use admin_portal::{
    AppConfig, AppState, InMemoryRepository, auth,
    create_router,
    models::{NewUser, User},
    repository::{CreateGuard, Repository},
};
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

/// Seeded users never log in with a password, so a placeholder hash keeps tests fast.
const STUB_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c3R1YnNhbHQ$c3R1Ymhhc2g";

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<InMemoryRepository>,
    pub config: AppConfig,
}

impl TestApp {
    pub fn new() -> Self {
        let repo = Arc::new(InMemoryRepository::new());
        let config = AppConfig::default();
        let state = AppState {
            repo: repo.clone(),
            config: config.clone(),
        };
        Self {
            router: create_router(state),
            repo,
            config,
        }
    }

    pub async fn seed_user(&self, email: &str, is_admin: bool) -> User {
        self.repo
            .create_user(
                NewUser {
                    name: "Seeded User".to_string(),
                    email: email.to_string(),
                    password_hash: STUB_HASH.to_string(),
                    is_admin,
                },
                CreateGuard::None,
            )
            .await
            .expect("seed user")
    }

    /// `Cookie` header value carrying a fresh session for `user_id`.
    pub fn session_for(&self, user_id: Uuid) -> String {
        let token = auth::issue_token(user_id, &self.config).expect("issue token");
        format!("{}={}", auth::SESSION_COOKIE, token)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
}

/// The `name=value` pair of the session cookie set by a response, if any.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .find(|pair| pair.starts_with(&format!("{}=", auth::SESSION_COOKIE)))
        .map(str::to_string)
}

pub fn user_form(name: &str, email: &str, password: &str) -> String {
    format!(
        "name={name}&email={email}&password={password}&password_confirmation={password}"
    )
}

mod common;

use admin_portal::repository::Repository;
use axum::http::StatusCode;
use common::{TestApp, body_string, location, session_cookie, user_form};

#[tokio::test]
async fn register_form_is_open_while_no_users_exist() {
    let app = TestApp::new();

    let response = app.get("/register", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("action=\"/register\""));
}

#[tokio::test]
async fn register_form_is_closed_to_anonymous_once_a_user_exists() {
    let app = TestApp::new();
    app.seed_user("first@example.com", false).await;

    let response = app.get("/register", None).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn register_form_is_closed_to_non_admins_once_a_user_exists() {
    let app = TestApp::new();
    let user = app.seed_user("first@example.com", false).await;
    let cookie = app.session_for(user.id);

    let response = app.get("/register", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn register_form_stays_open_to_admins() {
    let app = TestApp::new();
    let admin = app.seed_user("admin@example.com", true).await;
    let cookie = app.session_for(admin.id);

    let response = app.get("/register", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn first_registration_creates_non_admin_and_signs_in() {
    let app = TestApp::new();
    let body = format!(
        "{}&is_admin=1",
        user_form("Ada", "ada@example.com", "password123")
    );

    let response = app.post_form("/register", &body, None).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/dashboard"));
    let cookie = session_cookie(&response).expect("session cookie set");

    let users = app.repo.users();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].email, "ada@example.com");
    assert_eq!(users[0].name, "Ada");
    assert!(!users[0].is_admin, "submitted is_admin must be ignored");
    assert_ne!(users[0].password_hash, "password123");

    // The new session is immediately usable.
    let dashboard = app.get("/dashboard", Some(&cookie)).await;
    assert_eq!(dashboard.status(), StatusCode::OK);
}

#[tokio::test]
async fn second_anonymous_registration_is_forbidden() {
    let app = TestApp::new();
    app.seed_user("first@example.com", false).await;

    let response = app
        .post_form(
            "/register",
            &user_form("Eve", "eve@example.com", "password123"),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.repo.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn admin_registration_after_bootstrap_creates_non_admin_and_switches_session() {
    let app = TestApp::new();
    let admin = app.seed_user("admin@example.com", true).await;
    let admin_cookie = app.session_for(admin.id);
    let body = format!(
        "{}&is_admin=1",
        user_form("Grace", "grace@example.com", "password123")
    );

    let response = app.post_form("/register", &body, Some(&admin_cookie)).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/dashboard"));
    let new_cookie = session_cookie(&response).expect("session cookie set");
    assert_ne!(new_cookie, admin_cookie);

    let users = app.repo.users();
    assert_eq!(users.len(), 2);
    let created = users
        .iter()
        .find(|u| u.email == "grace@example.com")
        .expect("registered user stored");
    assert!(!created.is_admin, "submitted is_admin must be ignored");

    // The returned session belongs to the new, non-admin user.
    let dashboard = app.get("/dashboard", Some(&new_cookie)).await;
    assert_eq!(dashboard.status(), StatusCode::OK);
    assert!(body_string(dashboard).await.contains("grace@example.com"));
    let gated = app.get("/admin/test", Some(&new_cookie)).await;
    assert_eq!(gated.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invalid_registration_is_rejected_with_field_errors() {
    let app = TestApp::new();
    let body = "name=&email=nope&password=short&password_confirmation=other";

    let response = app.post_form("/register", body, None).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json: serde_json::Value =
        serde_json::from_str(&body_string(response).await).expect("json body");
    assert!(json["errors"]["name"].is_array());
    assert!(json["errors"]["email"].is_array());
    assert!(json["errors"]["password"].is_array());
    assert!(app.repo.users().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bootstrap_registrations_admit_exactly_one() {
    let app = TestApp::new();

    let mut handles = Vec::new();
    for i in 0..6 {
        let router = app.router.clone();
        let body = user_form("Racer", &format!("racer{i}@example.com"), "password123");
        handles.push(tokio::spawn(async move {
            use tower::ServiceExt;
            let request = axum::http::Request::builder()
                .method("POST")
                .uri("/register")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(axum::body::Body::from(body))
                .unwrap();
            router.oneshot(request).await.unwrap().status()
        }));
    }

    let mut created = 0;
    for handle in handles {
        let status = handle.await.unwrap();
        if status == StatusCode::FOUND {
            created += 1;
        } else {
            assert_eq!(status, StatusCode::FORBIDDEN);
        }
    }

    assert_eq!(created, 1);
    assert_eq!(app.repo.users().len(), 1);
}

#[tokio::test]
async fn admin_create_form_renders_for_admin() {
    let app = TestApp::new();
    let admin = app.seed_user("admin@example.com", true).await;
    let cookie = app.session_for(admin.id);

    let response = app.get("/admin/users/create", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("name=\"is_admin\""));
}

#[tokio::test]
async fn admin_can_create_another_admin() {
    let app = TestApp::new();
    let admin = app.seed_user("admin@example.com", true).await;
    let cookie = app.session_for(admin.id);
    let body = format!(
        "{}&is_admin=1",
        user_form("Grace", "grace@example.com", "password123")
    );

    let response = app.post_form("/admin/users", &body, Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some("/dashboard"));
    assert!(
        session_cookie(&response).is_none(),
        "admin must stay signed in as themselves"
    );

    let created = app
        .repo
        .find_user_by_email("grace@example.com")
        .await
        .unwrap()
        .expect("user created");
    assert!(created.is_admin);
}

#[tokio::test]
async fn admin_created_user_without_flag_is_not_admin() {
    let app = TestApp::new();
    let admin = app.seed_user("admin@example.com", true).await;
    let cookie = app.session_for(admin.id);

    let response = app
        .post_form(
            "/admin/users",
            &user_form("Linus", "linus@example.com", "password123"),
            Some(&cookie),
        )
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    let created = app
        .repo
        .find_user_by_email("linus@example.com")
        .await
        .unwrap()
        .expect("user created");
    assert!(!created.is_admin);
}

#[tokio::test]
async fn admin_creation_rejects_unparseable_flag() {
    let app = TestApp::new();
    let admin = app.seed_user("admin@example.com", true).await;
    let cookie = app.session_for(admin.id);
    let body = format!(
        "{}&is_admin=yes-please",
        user_form("Mallory", "mallory@example.com", "password123")
    );

    let response = app.post_form("/admin/users", &body, Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.repo.users().len(), 1);
}

#[tokio::test]
async fn duplicate_email_is_a_validation_error() {
    let app = TestApp::new();
    let admin = app.seed_user("admin@example.com", true).await;
    let cookie = app.session_for(admin.id);

    let response = app
        .post_form(
            "/admin/users",
            &user_form("Dup", "ADMIN@example.com", "password123"),
            Some(&cookie),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json: serde_json::Value =
        serde_json::from_str(&body_string(response).await).expect("json body");
    assert!(json["errors"]["email"].is_array());
}

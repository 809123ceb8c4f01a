use crate::{
    AppState,
    auth::{self, AuthUser},
    error::{AppError, found},
    models::{CreateUserForm, LoginForm, NewUser, RegisterForm, UserProfile},
    password,
    policy::RegistrationPolicy,
    repository::CreateGuard,
    validation::{self, UserInput, ValidationErrors},
};
use axum::{
    Form, Json,
    extract::State,
    response::{Html, IntoResponse},
};
use axum_extra::extract::cookie::CookieJar;

/// Landing page after registration and login.
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Hashes the validated password. The plaintext does not outlive this call.
fn into_new_user(input: UserInput) -> Result<NewUser, AppError> {
    let password_hash = password::hash_password(&input.password)?;
    Ok(NewUser {
        name: input.name,
        email: input.email,
        password_hash,
        is_admin: input.is_admin,
    })
}

// --- Public Handlers ---

/// index
///
/// [Public Route] Landing page linking to login and registration.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Landing page", body = String, content_type = "text/html"))
)]
pub async fn index() -> Html<String> {
    Html(views::page(
        "Welcome",
        r#"<p><a href="/login">Log in</a> or <a href="/register">register</a>.</p>"#,
    ))
}

/// show_register_form
///
/// [Public Route] Open while no user exists; afterwards only admins get the form.
#[utoipa::path(
    get,
    path = "/register",
    responses(
        (status = 200, description = "Registration form", body = String, content_type = "text/html"),
        (status = 403, description = "Registration closed to this caller")
    )
)]
pub async fn show_register_form(
    principal: Option<AuthUser>,
    State(state): State<AppState>,
) -> Result<Html<String>, AppError> {
    let user_count = state.repo.count_users().await?;
    RegistrationPolicy.can_register(user_count, principal.as_ref())?;
    Ok(Html(views::register_form()))
}

/// register
///
/// [Public Route] Creates a non-admin account and signs the new user in.
///
/// Any `is_admin` field in the submission is ignored: `RegisterForm` has no such field.
/// Non-admin callers insert under `CreateGuard::RequireEmpty`, so of two racing bootstrap
/// registrations exactly one succeeds and the other receives 403.
#[utoipa::path(
    post,
    path = "/register",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Registered; redirect to /dashboard"),
        (status = 403, description = "Registration closed to this caller"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn register(
    principal: Option<AuthUser>,
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<impl IntoResponse, AppError> {
    let policy = RegistrationPolicy;
    let user_count = state.repo.count_users().await?;
    policy.can_register(user_count, principal.as_ref())?;

    let input = validation::validate_registration(&form)?;
    let new_user = into_new_user(input)?;
    let guard = policy.guard_for(principal.as_ref());
    let user = state.repo.create_user(new_user, guard).await?;

    tracing::info!(
        user_id = %user.id,
        bootstrap = (guard == CreateGuard::RequireEmpty),
        "user registered"
    );

    let token = auth::issue_token(user.id, &state.config)?;
    let jar = jar.add(auth::session_cookie(&token, &state.config)?);
    Ok((jar, found(DASHBOARD_PATH)))
}

/// show_login_form
#[utoipa::path(
    get,
    path = "/login",
    responses((status = 200, description = "Login form", body = String, content_type = "text/html"))
)]
pub async fn show_login_form() -> Html<String> {
    Html(views::login_form())
}

/// login
///
/// [Public Route] Verifies credentials and sets the session cookie.
/// Unknown email and wrong password produce the same error.
#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Signed in; redirect to /dashboard"),
        (status = 422, description = "Bad credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse, AppError> {
    let credentials = validation::validate_login(&form)?;
    let user = state.repo.find_user_by_email(&credentials.email).await?;

    let verified = match &user {
        Some(u) => password::verify_password(&u.password_hash, &credentials.password)?,
        None => false,
    };
    let Some(user) = user.filter(|_| verified) else {
        tracing::warn!(email = %credentials.email, "failed login attempt");
        return Err(ValidationErrors::single(
            "email",
            "These credentials do not match our records.",
        )
        .into());
    };

    let token = auth::issue_token(user.id, &state.config)?;
    let jar = jar.add(auth::session_cookie(&token, &state.config)?);
    Ok((jar, found(DASHBOARD_PATH)))
}

/// logout
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 302, description = "Session cleared; redirect to /"))
)]
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (jar.add(auth::clear_session_cookie()), found("/"))
}

// --- Authenticated Handlers ---

/// dashboard
///
/// [Authenticated Route] Post-login landing page.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Dashboard", body = String, content_type = "text/html"),
        (status = 302, description = "Not signed in; redirect to /login")
    )
)]
pub async fn dashboard(user: AuthUser) -> Html<String> {
    Html(views::dashboard(&user))
}

/// get_me
///
/// [Authenticated Route] Profile of the signed-in user.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, AppError> {
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    Ok(Json(user.into()))
}

// --- Admin Handlers ---

/// admin_test
///
/// [Admin Route] Minimal protected page for exercising the admin gate.
#[utoipa::path(
    get,
    path = "/admin/test",
    responses(
        (status = 200, description = "Admin area", body = String),
        (status = 302, description = "Not signed in; redirect to /login"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn admin_test() -> &'static str {
    "Admin area"
}

/// show_create_user_form
#[utoipa::path(
    get,
    path = "/admin/users/create",
    responses((status = 200, description = "User creation form", body = String, content_type = "text/html"))
)]
pub async fn show_create_user_form() -> Html<String> {
    Html(views::create_user_form())
}

/// create_user
///
/// [Admin Route] Creates an account with the submitted `is_admin` value. The acting admin
/// stays signed in as themselves.
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body(content = CreateUserForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Created; redirect to /dashboard"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create_user(
    admin: AuthUser,
    State(state): State<AppState>,
    Form(form): Form<CreateUserForm>,
) -> Result<impl IntoResponse, AppError> {
    let input = validation::validate_admin_creation(&form)?;
    let new_user = into_new_user(input)?;
    let user = state.repo.create_user(new_user, CreateGuard::None).await?;

    tracing::info!(
        created_by = %admin.id,
        user_id = %user.id,
        is_admin = user.is_admin,
        "user created by admin"
    );

    Ok(found(DASHBOARD_PATH))
}

mod views {
    use crate::auth::AuthUser;

    fn escape(raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        for c in raw.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                '\'' => out.push_str("&#39;"),
                _ => out.push(c),
            }
        }
        out
    }

    pub fn page(title: &str, body: &str) -> String {
        format!(
            "<!doctype html><html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
             <body><h1>{title}</h1>{body}</body></html>"
        )
    }

    const USER_FIELDS: &str = r#"
<label>Name <input name="name" required></label>
<label>Email <input name="email" type="email" required></label>
<label>Password <input name="password" type="password" required></label>
<label>Confirm Password <input name="password_confirmation" type="password" required></label>"#;

    pub fn register_form() -> String {
        page(
            "Register",
            &format!(r#"<form method="post" action="/register">{USER_FIELDS}<button>Register</button></form>"#),
        )
    }

    pub fn create_user_form() -> String {
        page(
            "Create User",
            &format!(
                r#"<form method="post" action="/admin/users">{USER_FIELDS}
<label><input name="is_admin" type="checkbox" value="1"> Administrator</label>
<button>Create</button></form>"#
            ),
        )
    }

    pub fn login_form() -> String {
        page(
            "Log in",
            r#"<form method="post" action="/login">
<label>Email <input name="email" type="email" required></label>
<label>Password <input name="password" type="password" required></label>
<button>Log in</button></form>"#,
        )
    }

    pub fn dashboard(user: &AuthUser) -> String {
        let admin_link = if user.is_admin {
            r#"<p><a href="/admin/users/create">Create a user</a></p>"#
        } else {
            ""
        };
        page(
            "Dashboard",
            &format!(
                "<p>Signed in as {}.</p>{admin_link}\
                 <form method=\"post\" action=\"/logout\"><button>Log out</button></form>",
                escape(&user.email)
            ),
        )
    }

}

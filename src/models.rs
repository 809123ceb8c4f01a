use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The canonical identity record stored in the `users` table.
/// `password_hash` is an Argon2 PHC string and is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    // Login identifier. Unique, stored lower-cased.
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    // The single RBAC bit consulted by the admin gate.
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// NewUser
///
/// A validated, hashed record ready for insertion. Produced only by the validation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

// --- Request Schemas (Form Input) ---

/// RegisterForm
///
/// Form payload for self-service registration (POST /register).
/// There is deliberately no `is_admin` field: anything submitted under that name is dropped.
#[derive(Debug, Clone, Deserialize, Serialize, TS, ToSchema, Default)]
#[ts(export)]
#[serde(default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

/// CreateUserForm
///
/// Form payload for admin-initiated user creation (POST /admin/users).
#[derive(Debug, Clone, Deserialize, Serialize, TS, ToSchema, Default)]
#[ts(export)]
#[serde(default)]
pub struct CreateUserForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    /// Checkbox value: `"1"` when ticked, absent otherwise.
    #[schema(example = "1")]
    pub is_admin: Option<String>,
}

/// LoginForm
#[derive(Debug, Clone, Deserialize, Serialize, TS, ToSchema, Default)]
#[ts(export)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

// --- Response Schemas ---

/// UserProfile
///
/// Output schema for the authenticated user's profile (GET /me).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            is_admin: user.is_admin,
        }
    }
}

use crate::models::{NewUser, User};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, name, email, password_hash, is_admin, created_at";

/// RepoError
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("a user with this email already exists")]
    DuplicateEmail,
    /// The insert required an empty user table and found at least one row.
    #[error("user table is not empty")]
    NotEmpty,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// CreateGuard
///
/// Precondition evaluated atomically with a user insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateGuard {
    /// Insert unconditionally (admin-initiated creation).
    None,
    /// Insert only if no user exists yet (bootstrap registration).
    RequireEmpty,
}

/// Repository Trait
///
/// The persistence contract for user records. Handlers and the auth extractor only ever see
/// `Arc<dyn Repository>`, so Postgres and the in-memory store are interchangeable.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn count_users(&self) -> Result<i64, RepoError>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError>;
    // Expects an already-normalized (lower-cased) address.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
    // The guard is checked in the same critical section as the insert.
    async fn create_user(&self, user: NewUser, guard: CreateGuard) -> Result<User, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_insert_error(err: sqlx::Error) -> RepoError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::DuplicateEmail,
        _ => RepoError::Database(err),
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn count_users(&self) -> Result<i64, RepoError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// create_user
    ///
    /// For `RequireEmpty` the table is locked against concurrent inserts for the lifetime of
    /// the transaction, so two simultaneous first registrations cannot both observe an empty
    /// table. Dropping the transaction on an early return rolls it back.
    async fn create_user(&self, user: NewUser, guard: CreateGuard) -> Result<User, RepoError> {
        let mut tx = self.pool.begin().await?;

        if guard == CreateGuard::RequireEmpty {
            sqlx::query("LOCK TABLE users IN SHARE ROW EXCLUSIVE MODE")
                .execute(&mut *tx)
                .await?;
            let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users)")
                .fetch_one(&mut *tx)
                .await?;
            if exists {
                return Err(RepoError::NotEmpty);
            }
        }

        let created = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, name, email, password_hash, is_admin) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_insert_error)?;

        tx.commit().await?;
        Ok(created)
    }
}

/// InMemoryRepository
///
/// A mutex-guarded `Vec<User>` implementing the same contract, including the atomic
/// bootstrap guard. Used by the test suite and for running without a database.
#[derive(Default)]
pub struct InMemoryRepository {
    users: Mutex<Vec<User>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users: Mutex::new(users),
        }
    }

    /// Snapshot of every stored user, in insertion order.
    pub fn users(&self) -> Vec<User> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<User>> {
        // A panic while holding the lock cannot leave a half-written Vec behind.
        self.users.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn count_users(&self) -> Result<i64, RepoError> {
        Ok(self.lock().len() as i64)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.lock().iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        Ok(self.lock().iter().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser, guard: CreateGuard) -> Result<User, RepoError> {
        let mut users = self.lock();
        if guard == CreateGuard::RequireEmpty && !users.is_empty() {
            return Err(RepoError::NotEmpty);
        }
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepoError::DuplicateEmail);
        }
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            is_admin: user.is_admin,
            created_at: Utc::now(),
        };
        users.push(created.clone());
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str, is_admin: bool) -> NewUser {
        NewUser {
            name: "Test".into(),
            email: email.into(),
            password_hash: "$argon2id$stub".into(),
            is_admin,
        }
    }

    #[tokio::test]
    async fn require_empty_admits_only_the_first_user() {
        let repo = InMemoryRepository::new();
        let first = repo
            .create_user(new_user("a@example.com", false), CreateGuard::RequireEmpty)
            .await
            .unwrap();
        assert_eq!(first.email, "a@example.com");

        let second = repo
            .create_user(new_user("b@example.com", false), CreateGuard::RequireEmpty)
            .await;
        assert!(matches!(second, Err(RepoError::NotEmpty)));
        assert_eq!(repo.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unguarded_insert_rejects_duplicate_email() {
        let repo = InMemoryRepository::new();
        repo.create_user(new_user("a@example.com", true), CreateGuard::None)
            .await
            .unwrap();
        let dup = repo
            .create_user(new_user("a@example.com", false), CreateGuard::None)
            .await;
        assert!(matches!(dup, Err(RepoError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn lookups_find_stored_user() {
        let repo = InMemoryRepository::new();
        let created = repo
            .create_user(new_user("a@example.com", true), CreateGuard::None)
            .await
            .unwrap();
        let by_id = repo.get_user(created.id).await.unwrap().unwrap();
        assert!(by_id.is_admin);
        let by_email = repo.find_user_by_email("a@example.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(created.id));
        assert!(repo.get_user(Uuid::new_v4()).await.unwrap().is_none());
    }
}

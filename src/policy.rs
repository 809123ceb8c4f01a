use crate::{auth::AuthUser, error::AppError, repository::CreateGuard};

/// RegistrationPolicy
///
/// Decides who may register new accounts. The only bootstrap signal is the user count:
/// while the store is empty anyone may sign up, afterwards only admins may.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistrationPolicy;

impl RegistrationPolicy {
    /// Access rule shared by `GET /register` and `POST /register`.
    pub fn can_register(
        &self,
        user_count: i64,
        principal: Option<&AuthUser>,
    ) -> Result<(), AppError> {
        if user_count == 0 || principal.is_some_and(|p| p.is_admin) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    /// Precondition to enforce atomically with the insert. Non-admins may only ever create
    /// the very first account, so their insert must still find the table empty.
    pub fn guard_for(&self, principal: Option<&AuthUser>) -> CreateGuard {
        match principal {
            Some(p) if p.is_admin => CreateGuard::None,
            _ => CreateGuard::RequireEmpty,
        }
    }
}

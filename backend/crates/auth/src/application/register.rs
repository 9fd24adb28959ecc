//! Register Use Case
//!
//! Creates a new user account. Default-role assignment belongs to the
//! registration flow around this engine, not to it.

use platform::password::ClearTextPassword;
use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::domain::entity::User;
use crate::domain::repository::AuthStore;
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};

/// Maximum display name length
const NAME_MAX_CHARS: usize = 100;

/// Register input
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Register use case
pub struct RegisterUseCase<S: AuthStore> {
    store: Arc<S>,
    config: Arc<AuthConfig>,
}

impl<S: AuthStore> RegisterUseCase<S> {
    pub fn new(store: Arc<S>, config: Arc<AuthConfig>) -> Self {
        Self { store, config }
    }

    pub async fn execute(&self, input: RegisterInput) -> AuthResult<User> {
        let name = input.name.trim();
        if name.is_empty() || name.chars().count() > NAME_MAX_CHARS {
            return Err(AuthError::InvalidInput(format!(
                "Name must be between 1 and {NAME_MAX_CHARS} characters"
            )));
        }

        let email = Email::new(&input.email)?;

        if self.store.email_exists(&email).await? {
            return Err(AuthError::EmailTaken);
        }

        let password = ClearTextPassword::new(input.password)?;
        let password_hash = password.hash(self.config.pepper())?;

        let user = User::new(name, email, password_hash);
        self.store.create_user(&user).await?;

        tracing::info!(user_id = %user.id, "User registered");

        Ok(user)
    }
}

//! User validator
//!
//! Login-time credential and account-state checks, including the lockout
//! counter.

use chrono::Utc;
use platform::password::ClearTextPassword;
use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::domain::entity::User;
use crate::domain::repository::AuthStore;
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};

pub struct UserValidator<S: AuthStore> {
    store: Arc<S>,
    config: Arc<AuthConfig>,
}

impl<S: AuthStore> UserValidator<S> {
    pub fn new(store: Arc<S>, config: Arc<AuthConfig>) -> Self {
        Self { store, config }
    }

    /// Check credentials and account state.
    ///
    /// An unknown email and a wrong password both yield
    /// [`AuthError::InvalidCredentials`]. A wrong password bumps the failure
    /// counter and locks the account once it reaches the threshold.
    pub async fn validate_for_login(&self, email: &str, password: String) -> AuthResult<User> {
        let email = Email::new(email).map_err(|_| AuthError::InvalidCredentials)?;

        let mut user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let now = Utc::now();
        if user.lock_expired(now) {
            self.store.reset_login_lock(user.id).await?;
            user.clear_lock();
            tracing::info!(user_id = %user.id, "Expired account lock cleared");
        }

        if let Some(until) = user.locked_until.filter(|_| user.is_locked(now)) {
            return Err(AuthError::AccountLocked { until });
        }

        let password = ClearTextPassword::for_verification(password);
        if !user.password_hash.verify(&password, self.config.pepper()) {
            self.record_failure(&user).await?;
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    async fn record_failure(&self, user: &User) -> AuthResult<()> {
        let attempts = self.store.increment_failed_logins(user.id).await?;

        if attempts >= self.config.max_failed_logins {
            let until = Utc::now() + self.config.lock_duration_chrono();
            self.store.lock_user(user.id, until).await?;
            tracing::warn!(
                user_id = %user.id,
                attempts,
                locked_until = %until,
                "Account locked after repeated failed logins"
            );
        } else {
            tracing::warn!(user_id = %user.id, attempts, "Failed login attempt");
        }

        Ok(())
    }
}

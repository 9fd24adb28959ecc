//! User Entity
//!
//! Identity, credential hash and account state. The lockout fields are
//! mutated by the login validator; everything else by registration and
//! profile flows.

use chrono::{DateTime, Utc};
use kernel::id::UserId;
use platform::password::HashedPassword;

use crate::domain::value_object::email::Email;

#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub avatar: Option<String>,
    pub password_hash: HashedPassword,
    /// Disabled accounts cannot log in or refresh.
    pub is_active: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    /// Consecutive failed logins. Reset to 0 when a lock expires or a login
    /// succeeds.
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: impl Into<String>, email: Email, password_hash: HashedPassword) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            name: name.into(),
            email,
            avatar: None,
            password_hash,
            is_active: true,
            email_verified_at: None,
            failed_login_attempts: 0,
            locked_until: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_email_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }

    /// A lock is in force.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }

    /// A lock was set and has run out, but has not been cleared yet.
    pub fn lock_expired(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| now >= until)
    }

    /// Clear lock state in memory (mirrors the store-side reset).
    pub fn clear_lock(&mut self) {
        self.failed_login_attempts = 0;
        self.locked_until = None;
        self.updated_at = Utc::now();
    }

    /// Record a successful login in memory (mirrors the store-side update).
    pub fn record_login(&mut self, at: DateTime<Utc>) {
        self.failed_login_attempts = 0;
        self.locked_until = None;
        self.last_login_at = Some(at);
        self.updated_at = at;
    }
}

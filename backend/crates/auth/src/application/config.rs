//! Application Configuration
//!
//! Configuration for the Auth application layer. Built once at start-up and
//! passed to constructors behind an `Arc`.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Length of generated development secrets
const RANDOM_SECRET_LEN: usize = 32;

/// Upper bound for every configured lifetime (ten years)
pub const MAX_DURATION: Duration = Duration::from_secs(10 * 365 * 24 * 3600);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} secret must not be empty")]
    EmptySecret(&'static str),

    #[error("access and refresh secrets must differ")]
    SharedSecret,

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("{0} must not exceed ten years")]
    TooLong(&'static str),
}

/// Auth application configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC key for access tokens
    pub access_secret: Vec<u8>,
    /// HMAC key for refresh tokens; must differ from `access_secret`
    pub refresh_secret: Vec<u8>,
    /// `iss` claim written and required on every token
    pub issuer: String,
    /// Access token lifetime (15 minutes)
    pub access_token_ttl: Duration,
    /// Refresh token and session lifetime (7 days). Also the TTL of cached
    /// permission sets.
    pub refresh_token_ttl: Duration,
    /// Consecutive failed logins before the account is locked
    pub max_failed_logins: i32,
    /// How long a lock lasts (15 minutes)
    pub lock_duration: Duration,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
    /// Bound of the audit job queue
    pub audit_queue_capacity: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_secret: Vec::new(),
            refresh_secret: Vec::new(),
            issuer: "auth-engine".to_string(),
            access_token_ttl: Duration::from_secs(15 * 60), // 15 minutes
            refresh_token_ttl: Duration::from_secs(7 * 24 * 3600), // 7 days
            max_failed_logins: 5,
            lock_duration: Duration::from_secs(15 * 60), // 15 minutes
            password_pepper: None,
            audit_queue_capacity: 1024,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("max_failed_logins", &self.max_failed_logins)
            .field("lock_duration", &self.lock_duration)
            .field("password_pepper", &self.password_pepper.as_ref().map(|_| "<redacted>"))
            .field("audit_queue_capacity", &self.audit_queue_capacity)
            .finish()
    }
}

impl AuthConfig {
    /// Create config with random, independent token secrets (for development)
    pub fn with_random_secrets() -> Self {
        Self {
            access_secret: platform::crypto::random_bytes(RANDOM_SECRET_LEN),
            refresh_secret: platform::crypto::random_bytes(RANDOM_SECRET_LEN),
            ..Default::default()
        }
    }

    /// Create config for development
    pub fn development() -> Self {
        Self::with_random_secrets()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_secret.is_empty() {
            return Err(ConfigError::EmptySecret("access"));
        }
        if self.refresh_secret.is_empty() {
            return Err(ConfigError::EmptySecret("refresh"));
        }
        if self.access_secret == self.refresh_secret {
            return Err(ConfigError::SharedSecret);
        }
        if self.access_token_ttl.is_zero() {
            return Err(ConfigError::ZeroValue("access_token_ttl"));
        }
        if self.refresh_token_ttl.is_zero() {
            return Err(ConfigError::ZeroValue("refresh_token_ttl"));
        }
        for (name, value) in [
            ("access_token_ttl", self.access_token_ttl),
            ("refresh_token_ttl", self.refresh_token_ttl),
            ("lock_duration", self.lock_duration),
        ] {
            if value > MAX_DURATION {
                return Err(ConfigError::TooLong(name));
            }
        }
        if self.max_failed_logins <= 0 {
            return Err(ConfigError::ZeroValue("max_failed_logins"));
        }
        if self.audit_queue_capacity == 0 {
            return Err(ConfigError::ZeroValue("audit_queue_capacity"));
        }
        Ok(())
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }

    pub fn access_ttl_chrono(&self) -> chrono::Duration {
        to_chrono(self.access_token_ttl)
    }

    pub fn refresh_ttl_chrono(&self) -> chrono::Duration {
        to_chrono(self.refresh_token_ttl)
    }

    pub fn lock_duration_chrono(&self) -> chrono::Duration {
        to_chrono(self.lock_duration)
    }
}

fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or(chrono::Duration::MAX)
}

//! Auth Error Types
//!
//! Domain errors of the engine and their mapping onto the boundary taxonomy
//! in `kernel::error`.
//!
//! Every credential failure renders the same "Unauthorized" message so a
//! caller cannot tell which check rejected it. The specific reason is kept
//! for the log line only.

use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

use crate::application::token_codec::TokenError;
use crate::infra::cache::CacheError;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Message rendered for every Unauthorized-class error
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";

#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing, malformed, expired, revoked or unknown bearer token
    #[error("Unauthorized")]
    Unauthorized { reason: &'static str },

    /// Token codec rejected the token
    #[error("Unauthorized")]
    Token(#[from] TokenError),

    /// Unknown email or wrong password; never distinguished
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Account is temporarily locked")]
    AccountLocked { until: DateTime<Utc> },

    #[error("Permission denied")]
    PermissionDenied { permission: String },

    #[error("Email is already registered")]
    EmailTaken,

    #[error("User not found")]
    UserNotFound,

    #[error("Session not found")]
    SessionNotFound,

    /// Input failed validation (email format, password policy)
    #[error("{0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn unauthorized(reason: &'static str) -> Self {
        AuthError::Unauthorized { reason }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Unauthorized { .. } | AuthError::InvalidCredentials => {
                ErrorKind::Unauthorized
            }
            AuthError::Token(e) if e.is_server_fault() => ErrorKind::InternalServerError,
            AuthError::Token(_) => ErrorKind::Unauthorized,
            AuthError::AccountDisabled
            | AuthError::AccountLocked { .. }
            | AuthError::PermissionDenied { .. } => ErrorKind::Forbidden,
            AuthError::EmailTaken => ErrorKind::Conflict,
            AuthError::UserNotFound | AuthError::SessionNotFound => ErrorKind::NotFound,
            AuthError::InvalidInput(_) => ErrorKind::BadRequest,
            AuthError::Database(_) | AuthError::Cache(_) | AuthError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Boundary form. Unauthorized and server errors are collapsed to fixed
    /// messages; the detail stays in the log.
    pub fn to_app_error(&self) -> AppError {
        match self.kind() {
            ErrorKind::Unauthorized if !matches!(self, AuthError::InvalidCredentials) => {
                AppError::unauthorized(UNAUTHORIZED_MESSAGE)
            }
            ErrorKind::InternalServerError => AppError::internal("Internal server error"),
            kind => AppError::new(kind, self.to_string()),
        }
    }

    fn log(&self, app_error: &AppError) {
        match self {
            AuthError::Database(_) | AuthError::Cache(_) | AuthError::Internal(_) => {
                tracing::error!(
                    correlation_id = ?app_error.correlation_id(),
                    error = %self,
                    "Auth internal error"
                );
            }
            AuthError::Token(e) if e.is_server_fault() => {
                tracing::error!(
                    correlation_id = ?app_error.correlation_id(),
                    error = %e,
                    "Token signing failed"
                );
            }
            AuthError::Unauthorized { reason } => {
                tracing::debug!(reason, "Request rejected as unauthorized");
            }
            AuthError::Token(e) => {
                tracing::debug!(reason = %e, "Token rejected");
            }
            AuthError::InvalidCredentials => tracing::warn!("Invalid login attempt"),
            AuthError::AccountLocked { until } => {
                tracing::warn!(locked_until = %until, "Login attempt on locked account");
            }
            AuthError::PermissionDenied { permission } => {
                tracing::info!(permission = %permission, "Permission denied");
            }
            _ => tracing::debug!(error = %self, "Auth error"),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let app_error = self.to_app_error();
        self.log(&app_error);
        app_error.into_response()
    }
}

impl From<crate::domain::value_object::email::InvalidEmail> for AuthError {
    fn from(err: crate::domain::value_object::email::InvalidEmail) -> Self {
        AuthError::InvalidInput(err.to_string())
    }
}

impl From<platform::password::PasswordPolicyError> for AuthError {
    fn from(err: platform::password::PasswordPolicyError) -> Self {
        AuthError::InvalidInput(err.to_string())
    }
}

impl From<platform::password::PasswordHashError> for AuthError {
    fn from(err: platform::password::PasswordHashError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::Internal(format!("serialization: {err}"))
    }
}

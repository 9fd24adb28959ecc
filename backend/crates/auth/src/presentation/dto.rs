//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use kernel::id::{SessionId, UserId};
use serde::{Deserialize, Serialize};

use crate::application::{AuthOutput, RevokeAllOutcome};
use crate::domain::entity::{Menu, TokenPair, User, UserSession};

// ============================================================================
// Register
// ============================================================================

/// Register request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Register response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user: UserResponse,
}

// ============================================================================
// Login / Refresh
// ============================================================================

/// Login request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login and refresh response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserResponse,
    pub menus: Vec<Menu>,
    pub permissions: Vec<String>,
    pub tokens: TokenPair,
    pub session: SessionResponse,
}

impl From<AuthOutput> for AuthResponse {
    fn from(output: AuthOutput) -> Self {
        Self {
            user: UserResponse::from(&output.user),
            menus: output.menus,
            permissions: output.permissions,
            tokens: output.tokens,
            session: SessionResponse::from(&output.session),
        }
    }
}

// ============================================================================
// Logout All
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutAllResponse {
    pub tokens_revoked: u64,
    pub sessions_deactivated: u64,
}

impl From<RevokeAllOutcome> for LogoutAllResponse {
    fn from(outcome: RevokeAllOutcome) -> Self {
        Self {
            tokens_revoked: outcome.tokens_revoked,
            sessions_deactivated: outcome.sessions_deactivated,
        }
    }
}

// ============================================================================
// Shared
// ============================================================================

/// Public view of a user; never carries the credential hash
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub email_verified: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.as_str().to_owned(),
            avatar: user.avatar.clone(),
            email_verified: user.is_email_verified(),
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

/// Public view of a session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: SessionId,
    pub device_id: String,
    pub device_name: Option<String>,
    pub device_type: String,
    pub ip_address: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

impl From<&UserSession> for SessionResponse {
    fn from(session: &UserSession) -> Self {
        Self {
            id: session.id,
            device_id: session.device_id.clone(),
            device_name: session.device_name.clone(),
            device_type: session.device_type.clone(),
            ip_address: session.ip_address.clone(),
            expires_at: session.expires_at,
            last_used_at: session.last_used_at,
        }
    }
}

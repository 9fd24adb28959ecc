//! User Session Entity
//!
//! One row per authenticated device. Logout-all deactivates sessions rather
//! than deleting them so the audit trail survives; single logout deletes
//! the session together with its token pair.

use chrono::{DateTime, Utc};
use kernel::id::{SessionId, UserId};
use platform::device::DeviceContext;
use serde::{Deserialize, Serialize};

use crate::domain::value_object::token_hash::TokenHash;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSession {
    pub id: SessionId,
    pub user_id: UserId,
    pub refresh_token_hash: TokenHash,
    pub device_id: String,
    pub device_fingerprint: String,
    pub device_name: Option<String>,
    pub device_type: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub is_active: bool,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl UserSession {
    pub fn new(
        id: SessionId,
        user_id: UserId,
        refresh_token_hash: TokenHash,
        device: &DeviceContext,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            refresh_token_hash,
            device_id: device.device_id.clone(),
            device_fingerprint: device.fingerprint.clone(),
            device_name: device.device_name.clone(),
            device_type: device.device_type.clone(),
            ip_address: device.ip_string(),
            user_agent: device.user_agent.clone(),
            is_active: true,
            expires_at,
            last_used_at: now,
            created_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Active and not past its expiry.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now)
    }
}

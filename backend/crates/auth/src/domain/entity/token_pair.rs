use chrono::{DateTime, Utc};
use serde::Serialize;

/// Access + refresh token strings handed back to the client. Never persisted
/// as such; the store only ever sees their hashes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Always `"Bearer"`
    pub token_type: &'static str,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    /// Seconds until the access token expires
    pub access_expires_in: i64,
    /// Seconds until the refresh token expires
    pub refresh_expires_in: i64,
}

impl TokenPair {
    pub fn new(
        access_token: String,
        access_expires_at: DateTime<Utc>,
        refresh_token: String,
        refresh_expires_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer",
            access_expires_at,
            refresh_expires_at,
            access_expires_in: (access_expires_at - now).num_seconds().max(0),
            refresh_expires_in: (refresh_expires_at - now).num_seconds().max(0),
        }
    }
}

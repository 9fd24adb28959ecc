//! Device / request context
//!
//! Identifies the device a login or refresh comes from. The auth engine
//! stores these values on the session and otherwise treats them as opaque.

use axum::http::{HeaderMap, header};
use std::net::IpAddr;

use crate::crypto::sha256_hex;

/// Optional client-supplied stable device identifier
pub const DEVICE_ID_HEADER: &str = "x-device-id";

/// Optional human-readable device name ("Alice's laptop")
pub const DEVICE_NAME_HEADER: &str = "x-device-name";

/// Device context captured at login/refresh time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceContext {
    /// Stable identifier: the client-supplied device id when present,
    /// otherwise the fingerprint.
    pub device_id: String,
    /// Hex SHA-256 over the User-Agent and the client device id
    pub fingerprint: String,
    pub device_name: Option<String>,
    /// `mobile`, `tablet`, `desktop` or `unknown`
    pub device_type: String,
    pub ip: Option<IpAddr>,
    pub user_agent: Option<String>,
}

impl DeviceContext {
    /// Build a context from raw parts.
    pub fn new(
        client_device_id: Option<String>,
        device_name: Option<String>,
        ip: Option<IpAddr>,
        user_agent: Option<String>,
    ) -> Self {
        let ua = user_agent.as_deref().unwrap_or_default();
        let fingerprint = sha256_hex(&format!(
            "{}|{}",
            ua,
            client_device_id.as_deref().unwrap_or_default()
        ));

        Self {
            device_id: client_device_id.unwrap_or_else(|| fingerprint.clone()),
            fingerprint,
            device_name,
            device_type: classify_user_agent(ua).to_string(),
            ip,
            user_agent,
        }
    }

    /// IP as string (for storage)
    pub fn ip_string(&self) -> Option<String> {
        self.ip.map(|ip| ip.to_string())
    }
}

/// Extract the device context from request headers.
///
/// Unlike session-binding fingerprints, a missing User-Agent is not an
/// error here: the context is informational.
pub fn extract_device_context(headers: &HeaderMap, client_ip: Option<IpAddr>) -> DeviceContext {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    DeviceContext::new(
        header_str(DEVICE_ID_HEADER),
        header_str(DEVICE_NAME_HEADER),
        client_ip,
        header_str(header::USER_AGENT.as_str()),
    )
}

/// Extract client IP address from headers
///
/// Checks X-Forwarded-For first (reverse proxy setups), then falls back to
/// the direct connection IP.
pub fn extract_client_ip(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|xff| xff.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok())
        .or(direct_ip)
}

fn classify_user_agent(ua: &str) -> &'static str {
    let lower = ua.to_ascii_lowercase();
    if lower.is_empty() {
        "unknown"
    } else if lower.contains("ipad") || lower.contains("tablet") {
        "tablet"
    } else if lower.contains("mobi") || lower.contains("iphone") || lower.contains("android") {
        "mobile"
    } else {
        "desktop"
    }
}

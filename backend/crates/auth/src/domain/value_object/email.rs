//! Email Value Object
//!
//! A syntactically valid, lowercased email address. Deliverability is the
//! business of the verification flow, not of this type.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum email length (RFC 5321)
const EMAIL_MAX_LENGTH: usize = 254;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid email address")]
pub struct InvalidEmail;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn new(email: impl AsRef<str>) -> Result<Self, InvalidEmail> {
        let email = email.as_ref().trim().to_lowercase();

        if email.is_empty() || email.len() > EMAIL_MAX_LENGTH || !Self::is_valid_format(&email) {
            return Err(InvalidEmail);
        }

        Ok(Self(email))
    }

    fn is_valid_format(email: &str) -> bool {
        let Some((local, domain)) = email.split_once('@') else {
            return false;
        };

        if local.is_empty() || local.len() > 64 || domain.contains('@') {
            return false;
        }

        if domain.is_empty() || !domain.contains('.') {
            return false;
        }

        if !domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return false;
        }

        !(domain.starts_with(['.', '-']) || domain.ends_with(['.', '-']) || domain.contains(".."))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = InvalidEmail;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalises_case_and_whitespace() {
        let email = Email::new("  Alice@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "alice@example.com");
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in [
            "",
            "no-at-sign",
            "@example.com",
            "a@b@example.com",
            "alice@localhost",
            "alice@-example.com",
            "alice@example..com",
            "alice@exa mple.com",
        ] {
            assert!(Email::new(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_rejects_overlong() {
        let local = "a".repeat(65);
        assert!(Email::new(format!("{local}@example.com")).is_err());
    }
}

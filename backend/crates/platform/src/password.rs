//! Credential Hashing and Verification
//!
//! - Argon2id hashing (memory-hard) in PHC string format
//! - Optional application-wide pepper
//! - NFKC normalisation so visually identical input hashes identically
//! - Zeroization of clear text on drop
//!
//! Policy checks apply only when a credential is being *set*
//! ([`ClearTextPassword::new`]). Login uses
//! [`ClearTextPassword::for_verification`], which never rejects input: a
//! policy error at login time would tell an attacker something about the
//! stored credential.

use std::fmt;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::rngs::OsRng;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Minimum password length in code points
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length in code points
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Password policy violation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },

    #[error("Password must be at most {max} characters (got {actual})")]
    TooLong { max: usize, actual: usize },

    #[error("Password cannot be empty or contain only whitespace")]
    EmptyOrWhitespace,

    #[error("Password contains invalid control characters")]
    InvalidCharacter,
}

/// Password hashing errors
#[derive(Debug, Error)]
pub enum PasswordHashError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

/// Clear text password, zeroized on drop. Not `Clone`; `Debug` is redacted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    /// Normalise and validate a password that is about to be stored.
    pub fn new(raw: String) -> Result<Self, PasswordPolicyError> {
        let normalized = Self::normalize(raw);

        if normalized.trim().is_empty() {
            return Err(PasswordPolicyError::EmptyOrWhitespace);
        }

        let char_count = normalized.chars().count();
        if char_count < MIN_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooShort {
                min: MIN_PASSWORD_LENGTH,
                actual: char_count,
            });
        }
        if char_count > MAX_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooLong {
                max: MAX_PASSWORD_LENGTH,
                actual: char_count,
            });
        }

        if normalized
            .chars()
            .any(|ch| ch.is_control() && ch != '\t' && ch != '\n')
        {
            return Err(PasswordPolicyError::InvalidCharacter);
        }

        Ok(Self(normalized))
    }

    /// Normalise a password presented for verification. No policy checks.
    pub fn for_verification(raw: String) -> Self {
        Self(Self::normalize(raw))
    }

    fn normalize(mut raw: String) -> String {
        let normalized = raw.nfkc().collect();
        raw.zeroize();
        normalized
    }

    fn peppered(&self, pepper: Option<&[u8]>) -> Vec<u8> {
        let mut bytes = self.0.as_bytes().to_vec();
        if let Some(p) = pepper {
            bytes.extend_from_slice(p);
        }
        bytes
    }

    /// Hash with Argon2id (default parameters, random 16-byte salt).
    pub fn hash(&self, pepper: Option<&[u8]>) -> Result<HashedPassword, PasswordHashError> {
        let mut bytes = self.peppered(pepper);
        let salt = SaltString::generate(OsRng);

        let result = Argon2::default()
            .hash_password(&bytes, &salt)
            .map(|h| HashedPassword { hash: h.to_string() })
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()));

        bytes.zeroize();
        result
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

/// Argon2id hash in PHC string format. Safe to store.
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: String,
}

impl HashedPassword {
    /// Load a PHC string (e.g. from the database), rejecting malformed input.
    pub fn from_phc_string(s: impl Into<String>) -> Result<Self, PasswordHashError> {
        let hash = s.into();
        PasswordHash::new(&hash).map_err(|_| PasswordHashError::InvalidHashFormat)?;
        Ok(Self { hash })
    }

    pub fn as_phc_string(&self) -> &str {
        &self.hash
    }

    /// Constant-time verification. A malformed stored hash verifies as false.
    pub fn verify(&self, password: &ClearTextPassword, pepper: Option<&[u8]>) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.hash) else {
            return false;
        };

        let mut bytes = password.peppered(pepper);
        let ok = Argon2::default().verify_password(&bytes, &parsed).is_ok();
        bytes.zeroize();
        ok
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_rejects_short_and_long() {
        assert!(matches!(
            ClearTextPassword::new("short".into()),
            Err(PasswordPolicyError::TooShort { .. })
        ));
        assert!(matches!(
            ClearTextPassword::new("a".repeat(MAX_PASSWORD_LENGTH + 1)),
            Err(PasswordPolicyError::TooLong { .. })
        ));
    }

    #[test]
    fn test_policy_rejects_blank_and_control() {
        assert!(matches!(
            ClearTextPassword::new("         ".into()),
            Err(PasswordPolicyError::EmptyOrWhitespace)
        ));
        assert!(matches!(
            ClearTextPassword::new("abc\u{0007}defgh".into()),
            Err(PasswordPolicyError::InvalidCharacter)
        ));
    }

    #[test]
    fn test_verification_skips_policy() {
        // Too short to register, still accepted for a verification attempt.
        let pw = ClearTextPassword::for_verification("x".into());
        assert!(format!("{pw:?}").contains("REDACTED"));
    }

    #[test]
    fn test_hash_and_verify() {
        let password = ClearTextPassword::new("Correct-Horse-42".into()).unwrap();
        let hashed = password.hash(None).unwrap();

        assert!(hashed.verify(&password, None));
        let wrong = ClearTextPassword::for_verification("Wrong-Horse-42".into());
        assert!(!hashed.verify(&wrong, None));
    }

    #[test]
    fn test_pepper_must_match() {
        let password = ClearTextPassword::new("Correct-Horse-42".into()).unwrap();
        let hashed = password.hash(Some(b"pepper")).unwrap();

        assert!(hashed.verify(&password, Some(b"pepper")));
        assert!(!hashed.verify(&password, None));
        assert!(!hashed.verify(&password, Some(b"other")));
    }

    #[test]
    fn test_nfkc_normalisation() {
        // Fullwidth "Ａ" normalises to "A".
        let stored = ClearTextPassword::new("ＡBCDEFGH1".into()).unwrap();
        let hashed = stored.hash(None).unwrap();
        let presented = ClearTextPassword::for_verification("ABCDEFGH1".into());
        assert!(hashed.verify(&presented, None));
    }

    #[test]
    fn test_phc_string_roundtrip() {
        let password = ClearTextPassword::new("Correct-Horse-42".into()).unwrap();
        let hashed = password.hash(None).unwrap();
        let restored = HashedPassword::from_phc_string(hashed.as_phc_string()).unwrap();
        assert!(restored.verify(&password, None));
        assert!(HashedPassword::from_phc_string("not_a_hash").is_err());
    }
}

//! Platform Crate - Technical Infrastructure
//!
//! Shared technical foundations for the auth engine:
//! - Cryptographic utilities (SHA-256 digests, secure random bytes)
//! - Credential hashing (Argon2id)
//! - Device/request context extraction from HTTP headers

pub mod crypto;
pub mod device;
pub mod password;

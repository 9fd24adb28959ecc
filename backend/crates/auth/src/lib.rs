//! Auth (Authentication & Authorization) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, permission merge, repository traits
//! - `application/` - Use cases, token/permission/menu services, audit queue
//! - `infra/` - PostgreSQL and in-memory stores, Redis and in-memory caches
//! - `presentation/` - HTTP handlers, DTOs, router, middleware
//!
//! ## Features
//! - Registration and email + password login with lockout
//! - Stateless access/refresh token pair with server-side session records
//! - Revocation through a TTL-bounded blacklist
//! - Role- and user-level permissions, permission-filtered menu tree
//!
//! ## Security Model
//! - Passwords hashed with Argon2id, optional pepper
//! - Access and refresh tokens signed with independent keys
//! - Only SHA-256 hashes of tokens are ever stored
//! - Every credential failure renders the same Unauthorized response

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::AuthConfig;
pub use application::{AuditQueue, AuditWorker, AuthOrchestrator};
pub use error::{AuthError, AuthResult};
pub use infra::cache::CacheStore;
pub use infra::memory::MemoryAuthRepository;
pub use infra::postgres::PgAuthRepository;
pub use presentation::router::auth_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::{
        email::Email, token_hash::TokenHash, token_type::TokenType,
    };
    pub use crate::presentation::dto::*;
}

pub mod middleware {
    pub use crate::presentation::middleware::*;
}

#[cfg(test)]
mod tests;

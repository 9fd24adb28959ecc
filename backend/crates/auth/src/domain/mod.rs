//! Domain Layer
//!
//! Entities, value objects, the permission merge rule and repository traits.

pub mod entity;
pub mod permission;
pub mod repository;
pub mod value_object;

pub use entity::{Menu, TokenPair, User, UserSession, UserToken};
pub use permission::{PermissionSet, merge_permissions};
pub use repository::{
    AuthStore, MenuRepository, PermissionRepository, SessionRepository, TokenRepository,
    UserRepository,
};
pub use value_object::{email::Email, token_hash::TokenHash, token_type::TokenType};

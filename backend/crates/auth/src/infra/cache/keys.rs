//! Cache key layout
//!
//! Per-user keys embed the user id so a whole user's entries can be removed
//! with one pattern delete.

use kernel::id::{SessionId, UserId};

use crate::domain::value_object::token_hash::TokenHash;

pub fn blacklist(token_hash: &TokenHash) -> String {
    format!("auth:blacklist:{token_hash}")
}

pub fn token(user_id: UserId, token_hash: &TokenHash) -> String {
    format!("auth:token:{user_id}:{token_hash}")
}

pub fn user_tokens(user_id: UserId) -> String {
    format!("auth:token:{user_id}:*")
}

pub fn session(user_id: UserId, session_id: SessionId) -> String {
    format!("auth:session:{user_id}:{session_id}")
}

pub fn user_sessions(user_id: UserId) -> String {
    format!("auth:session:{user_id}:*")
}

pub fn permissions(user_id: UserId) -> String {
    format!("auth:perm:{user_id}")
}

pub const ALL_PERMISSIONS: &str = "auth:perm:*";

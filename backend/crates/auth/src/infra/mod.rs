//! Infrastructure Layer
//!
//! Durable store implementations and cache backends.

pub mod cache;
pub mod memory;
pub mod postgres;

pub use cache::{CacheError, CacheStore};
pub use memory::MemoryAuthRepository;
pub use postgres::PgAuthRepository;

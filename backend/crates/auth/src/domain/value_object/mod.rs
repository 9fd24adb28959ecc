//! Value Object Module

pub mod email;
pub mod token_hash;
pub mod token_type;

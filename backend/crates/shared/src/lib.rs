//! Shared Kernel
//!
//! Vocabulary shared by every backend crate:
//! - The error taxonomy ([`error::kind::ErrorKind`]) and the unified
//!   [`error::app_error::AppError`]
//! - Typed identifiers ([`id::Id`])

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;

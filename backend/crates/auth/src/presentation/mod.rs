//! Presentation Layer
//!
//! HTTP handlers, DTOs, router, and middleware.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use handlers::{AuthAppState, RequestDevice};
pub use middleware::{
    PermissionGuard, require_access_token, require_permission, require_refresh_token,
};
pub use router::auth_router;

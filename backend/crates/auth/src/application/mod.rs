//! Application Layer
//!
//! Use cases and application services.

pub mod audit;
pub mod config;
pub mod login;
pub mod logout;
pub mod menu_service;
pub mod orchestrator;
pub mod permission_service;
pub mod refresh;
pub mod register;
pub mod token_codec;
pub mod token_service;
pub mod user_validator;

// Re-exports
pub use audit::{AuditJob, AuditQueue, AuditWorker};
pub use config::{AuthConfig, ConfigError};
pub use login::{AuthOutput, LoginInput, LoginUseCase};
pub use logout::LogoutUseCase;
pub use menu_service::{MenuService, filter_by_permissions};
pub use orchestrator::AuthOrchestrator;
pub use permission_service::PermissionService;
pub use refresh::{RefreshInput, RefreshUseCase};
pub use register::{RegisterInput, RegisterUseCase};
pub use token_codec::{TokenClaims, TokenCodec, TokenError};
pub use token_service::{AuthenticatedToken, RevokeAllOutcome, TokenService, extract_bearer};
pub use user_validator::UserValidator;

//! Entities

pub mod menu;
pub mod token_pair;
pub mod user;
pub mod user_session;
pub mod user_token;

pub use menu::Menu;
pub use token_pair::TokenPair;
pub use user::User;
pub use user_session::UserSession;
pub use user_token::UserToken;

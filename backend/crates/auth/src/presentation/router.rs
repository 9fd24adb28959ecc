//! Auth Router

use axum::{Router, middleware::from_fn_with_state, routing::post};
use std::sync::Arc;

use crate::application::AuthOrchestrator;
use crate::domain::repository::AuthStore;
use crate::presentation::handlers::{self, AuthAppState};
use crate::presentation::middleware::{require_access_token, require_refresh_token};

/// Create the Auth router for any store implementation
pub fn auth_router<S: AuthStore>(engine: Arc<AuthOrchestrator<S>>) -> Router {
    let state = AuthAppState { engine };

    let public = Router::new()
        .route("/register", post(handlers::register::<S>))
        .route("/login", post(handlers::login::<S>));

    let refresh = Router::new()
        .route("/refresh", post(handlers::refresh::<S>))
        .route_layer(from_fn_with_state(state.clone(), require_refresh_token::<S>));

    let protected = Router::new()
        .route("/logout", post(handlers::logout::<S>))
        .route("/logout-all", post(handlers::logout_all::<S>))
        .route_layer(from_fn_with_state(state.clone(), require_access_token::<S>));

    public.merge(refresh).merge(protected).with_state(state)
}

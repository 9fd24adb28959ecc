//! Auth Middleware
//!
//! Bearer validation for protected routes and permission checks on top of
//! it. A validated token is stored in the request extensions as
//! [`AuthenticatedToken`].

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

use crate::application::{AuthOrchestrator, AuthenticatedToken};
use crate::domain::repository::AuthStore;
use crate::error::{AuthError, AuthResult};
use crate::presentation::handlers::AuthAppState;

/// Owned copy of the Authorization header; empty when absent
fn bearer_header(req: &Request) -> String {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

/// Require a valid access token
pub async fn require_access_token<S: AuthStore>(
    State(state): State<AuthAppState<S>>,
    mut req: Request,
    next: Next,
) -> AuthResult<Response> {
    let header = bearer_header(&req);
    let authenticated = state.engine.authenticate(&header).await?;
    req.extensions_mut().insert(authenticated);
    Ok(next.run(req).await)
}

/// Require a valid refresh token on a live session
pub async fn require_refresh_token<S: AuthStore>(
    State(state): State<AuthAppState<S>>,
    mut req: Request,
    next: Next,
) -> AuthResult<Response> {
    let header = bearer_header(&req);
    let authenticated = state.engine.authenticate_refresh(&header).await?;
    req.extensions_mut().insert(authenticated);
    Ok(next.run(req).await)
}

/// State for [`require_permission`]: the engine and the slug to demand
pub struct PermissionGuard<S: AuthStore> {
    engine: Arc<AuthOrchestrator<S>>,
    permission: &'static str,
}

impl<S: AuthStore> PermissionGuard<S> {
    pub fn new(engine: Arc<AuthOrchestrator<S>>, permission: &'static str) -> Self {
        Self { engine, permission }
    }
}

impl<S: AuthStore> Clone for PermissionGuard<S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            permission: self.permission,
        }
    }
}

/// Require the authenticated user to hold a permission. Must run after
/// [`require_access_token`].
///
/// ```ignore
/// router.route_layer(axum::middleware::from_fn_with_state(
///     PermissionGuard::new(engine.clone(), "order.view"),
///     require_permission::<PgAuthRepository>,
/// ))
/// ```
pub async fn require_permission<S: AuthStore>(
    State(guard): State<PermissionGuard<S>>,
    req: Request,
    next: Next,
) -> AuthResult<Response> {
    let user_id = req
        .extensions()
        .get::<AuthenticatedToken>()
        .map(|a| a.claims.sub)
        .ok_or(AuthError::unauthorized("request not authenticated"))?;

    if !guard.engine.has_permission(user_id, guard.permission).await? {
        return Err(AuthError::PermissionDenied {
            permission: guard.permission.to_string(),
        });
    }

    Ok(next.run(req).await)
}

//! HTTP Handlers

use axum::Json;
use axum::extract::{ConnectInfo, Extension, FromRequestParts, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::IntoResponse;
use platform::device::{DeviceContext, extract_client_ip, extract_device_context};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::application::{
    AuthOrchestrator, AuthenticatedToken, LoginInput, RefreshInput, RegisterInput,
};
use crate::domain::repository::AuthStore;
use crate::error::AuthResult;
use crate::presentation::dto::{
    AuthResponse, LoginRequest, LogoutAllResponse, RegisterRequest, RegisterResponse,
    UserResponse,
};

/// Shared state for auth handlers
pub struct AuthAppState<S: AuthStore> {
    pub engine: Arc<AuthOrchestrator<S>>,
}

// derive would require `S: Clone`
impl<S: AuthStore> Clone for AuthAppState<S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}

/// Device context of the caller, from headers and the peer address
pub struct RequestDevice(pub DeviceContext);

impl<St: Send + Sync> FromRequestParts<St> for RequestDevice {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        let direct_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip());
        let client_ip = extract_client_ip(&parts.headers, direct_ip);
        Ok(Self(extract_device_context(&parts.headers, client_ip)))
    }
}

// ============================================================================
// Register
// ============================================================================

/// POST /register
pub async fn register<S: AuthStore>(
    State(state): State<AuthAppState<S>>,
    Json(req): Json<RegisterRequest>,
) -> AuthResult<impl IntoResponse> {
    let input = RegisterInput {
        name: req.name,
        email: req.email,
        password: req.password,
    };

    let user = state.engine.register(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: UserResponse::from(&user),
        }),
    ))
}

// ============================================================================
// Login
// ============================================================================

/// POST /login
pub async fn login<S: AuthStore>(
    State(state): State<AuthAppState<S>>,
    RequestDevice(device): RequestDevice,
    Json(req): Json<LoginRequest>,
) -> AuthResult<Json<AuthResponse>> {
    let input = LoginInput {
        email: req.email,
        password: req.password,
        device,
    };

    let output = state.engine.login(input).await?;
    Ok(Json(output.into()))
}

// ============================================================================
// Refresh
// ============================================================================

/// POST /refresh (refresh token bearer)
pub async fn refresh<S: AuthStore>(
    State(state): State<AuthAppState<S>>,
    Extension(refresh): Extension<AuthenticatedToken>,
    RequestDevice(device): RequestDevice,
) -> AuthResult<Json<AuthResponse>> {
    let output = state
        .engine
        .refresh_token(RefreshInput { refresh, device })
        .await?;
    Ok(Json(output.into()))
}

// ============================================================================
// Logout
// ============================================================================

/// POST /logout (access token bearer)
pub async fn logout<S: AuthStore>(
    State(state): State<AuthAppState<S>>,
    Extension(access): Extension<AuthenticatedToken>,
) -> AuthResult<StatusCode> {
    state
        .engine
        .logout(&access.token_hash, access.claims.sub, access.claims.sid)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /logout-all (access token bearer)
pub async fn logout_all<S: AuthStore>(
    State(state): State<AuthAppState<S>>,
    Extension(access): Extension<AuthenticatedToken>,
) -> AuthResult<Json<LogoutAllResponse>> {
    let outcome = state.engine.logout_all(access.claims.sub).await?;
    Ok(Json(outcome.into()))
}

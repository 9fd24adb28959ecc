//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

use anyhow::Context;
use auth::infra::cache::redis::RedisCache;
use auth::{AuditWorker, AuthConfig, AuthOrchestrator, CacheStore, PgAuthRepository, auth_router};
use axum::{
    Router, http,
    http::{Method, header},
};
use base64::Engine;
use base64::engine::general_purpose;
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,auth=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database connection
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set in environment")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    // Startup cleanup: remove expired tokens and sessions
    // Errors here should not prevent server startup
    let store = Arc::new(PgAuthRepository::new(pool.clone()));
    match store.cleanup_expired().await {
        Ok(deleted) => {
            tracing::info!(rows_deleted = deleted, "Auth cleanup completed");
        }
        Err(e) => {
            tracing::warn!(error = %e, "Auth cleanup failed, continuing anyway");
        }
    }

    // Auth configuration
    let auth_config = load_auth_config()?;
    auth_config.validate()?;
    tracing::info!(config = ?auth_config, "Auth configuration loaded");

    // Cache (optional)
    let cache = match env::var("REDIS_URL") {
        Ok(url) if !url.trim().is_empty() => {
            let redis = RedisCache::connect(&url)
                .await
                .context("failed to connect to Redis")?;
            tracing::info!("Connected to Redis");
            Some(Arc::new(CacheStore::Redis(redis)))
        }
        _ => {
            tracing::warn!("REDIS_URL not set, running without cache or blacklist");
            None
        }
    };

    // Audit worker
    let (audit, audit_worker) = AuditWorker::spawn(store.clone(), auth_config.audit_queue_capacity);

    let engine = Arc::new(AuthOrchestrator::new(
        store,
        cache,
        Arc::new(auth_config),
        audit,
    ));

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:40922,http://127.0.0.1:40922".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([Method::POST, Method::OPTIONS]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::HeaderName::from_static(platform::device::DEVICE_ID_HEADER),
            header::HeaderName::from_static(platform::device::DEVICE_NAME_HEADER),
        ]))
        .allow_credentials(true);

    // Build router
    let app = Router::new()
        .nest("/api/auth", auth_router(engine))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], 31113));
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    let processed = audit_worker.shutdown().await;
    tracing::info!(audit_jobs = processed, "Server stopped");

    Ok(())
}

/// Token secrets come from the environment (base64). Debug builds fall back
/// to random secrets when none are set.
fn load_auth_config() -> anyhow::Result<AuthConfig> {
    let mut config = match (env::var("AUTH_ACCESS_SECRET"), env::var("AUTH_REFRESH_SECRET")) {
        (Ok(access), Ok(refresh)) => AuthConfig {
            access_secret: decode_secret("AUTH_ACCESS_SECRET", &access)?,
            refresh_secret: decode_secret("AUTH_REFRESH_SECRET", &refresh)?,
            ..AuthConfig::default()
        },
        _ if cfg!(debug_assertions) => {
            tracing::warn!("Token secrets not set, using random development secrets");
            AuthConfig::development()
        }
        _ => anyhow::bail!("AUTH_ACCESS_SECRET and AUTH_REFRESH_SECRET must be set in production"),
    };

    if let Ok(issuer) = env::var("AUTH_ISSUER") {
        config.issuer = issuer;
    }
    if let Some(ttl) = env_secs("AUTH_ACCESS_TTL_SECS")? {
        config.access_token_ttl = ttl;
    }
    if let Some(ttl) = env_secs("AUTH_REFRESH_TTL_SECS")? {
        config.refresh_token_ttl = ttl;
    }
    if let Some(ttl) = env_secs("AUTH_LOCK_DURATION_SECS")? {
        config.lock_duration = ttl;
    }
    if let Ok(max) = env::var("AUTH_MAX_FAILED_LOGINS") {
        config.max_failed_logins = max
            .parse()
            .context("AUTH_MAX_FAILED_LOGINS must be an integer")?;
    }
    if let Ok(capacity) = env::var("AUTH_AUDIT_QUEUE_CAPACITY") {
        config.audit_queue_capacity = capacity
            .parse()
            .context("AUTH_AUDIT_QUEUE_CAPACITY must be an integer")?;
    }
    if let Ok(pepper) = env::var("AUTH_PASSWORD_PEPPER") {
        config.password_pepper = Some(pepper.into_bytes());
    }

    Ok(config)
}

fn decode_secret(name: &str, value: &str) -> anyhow::Result<Vec<u8>> {
    general_purpose::STANDARD
        .decode(value.trim())
        .with_context(|| format!("{name} must be valid base64"))
}

fn env_secs(name: &str) -> anyhow::Result<Option<Duration>> {
    match env::var(name) {
        Ok(raw) => {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{name} must be a number of seconds"))?;
            Ok(Some(Duration::from_secs(secs)))
        }
        Err(_) => Ok(None),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

//! Gatekeep server — session authority and edge validation gateway.
//!
//! Main entry point that wires the crates together and starts the server.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

use gatekeep_core::config::AppConfig;
use gatekeep_core::config::session::SessionBackend;
use gatekeep_core::error::AppError;

use gatekeep_auth::credential::CredentialVerifier;
use gatekeep_auth::identity::{IdentityRecord, MemoryIdentityProvider};
use gatekeep_auth::session::{
    MemorySessionStore, PgSessionStore, SessionAuthority, SessionStore, SessionSweeper,
};
use gatekeep_auth::token::TokenCodec;

use gatekeep_gateway::{GatewayState, build_router};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Load configuration from file and environment.
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("GATEKEEP_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function.
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Gatekeep v{}", env!("CARGO_PKG_VERSION"));

    // ── Session store backend ────────────────────────────────────
    let store: Arc<dyn SessionStore> = match config.session.backend {
        SessionBackend::Memory => {
            tracing::info!("Using in-memory session store");
            Arc::new(MemorySessionStore::new(config.session.sweep_batch_size))
        }
        SessionBackend::Postgres => {
            tracing::info!("Using PostgreSQL session store");
            Arc::new(PgSessionStore::connect(&config.database).await?)
        }
    };

    // ── Authority, codec, credential stack ───────────────────────
    let codec = Arc::new(TokenCodec::new(&config.token));
    let authority = Arc::new(SessionAuthority::new(
        Arc::clone(&codec),
        Arc::clone(&store),
        config.session.clone(),
        config.token.clone(),
    ));
    let verifier = Arc::new(CredentialVerifier::new(&config.credential)?);

    let identities = Arc::new(MemoryIdentityProvider::new());
    if let Some(bootstrap) = &config.bootstrap {
        let digest = verifier.hash(&bootstrap.password)?;
        identities
            .register(IdentityRecord {
                user_id: Uuid::new_v4(),
                username: bootstrap.username.clone(),
                role_name: bootstrap.role.clone(),
                permissions: bootstrap.permissions.clone(),
                password_digest: digest,
            })
            .await;
        tracing::info!(username = %bootstrap.username, "Bootstrap identity registered");
    }

    // ── Background sweeper ───────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper_handle =
        SessionSweeper::new(Arc::clone(&authority), &config.session).spawn(shutdown_rx);

    // ── HTTP server ──────────────────────────────────────────────
    let state = GatewayState::new(authority, verifier, identities);
    let router = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!(addr = %addr, "Gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // ── Shutdown ─────────────────────────────────────────────────
    tracing::info!("Shutting down, stopping sweeper");
    let _ = shutdown_tx.send(true);
    let _ = sweeper_handle.await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Resolves when the process receives Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl-C handler: {e}");
    }
}

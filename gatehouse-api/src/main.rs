//! Gatehouse API Server Entry Point
//!
//! Bootstraps configuration, seeds the built-in policy catalog, assembles
//! the gateway, and starts the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use gatehouse_api::{create_api_router, init_tracing, ApiConfig, ApiError, ApiResult, AppState};
use gatehouse_core::GatewayConfig;
use gatehouse_gateway::{ConnectorRegistry, Gateway};
use gatehouse_limiter::RateLimiter;
use gatehouse_policy::{EffectivePolicyResolver, OverrideEngine, PolicyService};
use gatehouse_storage::MemoryStorage;

/// Interval between passive sweeps of expired overrides.
const OVERRIDE_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(300);

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing();

    let config = GatewayConfig::from_env();
    tracing::info!(
        deployment_mode = %config.deployment_mode,
        license = %config.license,
        fail_open = config.fail_open,
        "Starting Gatehouse"
    );

    // The SQL storage collaborator implements the same `Storage` trait
    // behind DATABASE_URL; this binary runs the in-memory implementation.
    if config.database_url.is_some() {
        tracing::warn!(
            "DATABASE_URL is set but this build links the in-memory storage backend; \
             policies and audit records will not survive a restart"
        );
    }
    let storage = Arc::new(MemoryStorage::new());

    let policies = Arc::new(PolicyService::new(storage.clone(), config.license));
    let seeded = policies.seed_builtin().await.map_err(ApiError::from)?;
    tracing::info!(seeded, "System policy catalog ready");

    let overrides = Arc::new(OverrideEngine::new(storage.clone(), config.license));
    let resolver = Arc::new(EffectivePolicyResolver::new(storage.clone()));
    let limiter = Arc::new(RateLimiter::from_config(&config).await);
    let connectors = Arc::new(ConnectorRegistry::new());

    let gateway = Arc::new(Gateway::new(
        config,
        storage.clone(),
        limiter.clone(),
        connectors,
    ));

    // Passive expiry sweep; failures are logged and never fatal.
    let sweeper = overrides.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(OVERRIDE_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = sweeper.cleanup_expired().await {
                tracing::warn!(error = %e, "Expired-override sweep failed");
            }
        }
    });

    let state = AppState {
        gateway,
        policies,
        overrides,
        resolver,
        storage,
        limiter,
        start_time: std::time::Instant::now(),
    };
    let api_config = ApiConfig::from_env();
    let app: Router = create_api_router(state, &api_config);

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting Gatehouse API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("GATEHOUSE_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("GATEHOUSE_API_PORT").ok())
        .unwrap_or_else(|| "8080".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::bad_request(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::bad_request(format!("Invalid bind address {}: {}", addr, e)))
}

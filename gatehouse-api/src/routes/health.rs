//! Health route.
//!
//! `GET /health` reports liveness, uptime, and backend reachability: the
//! storage contract and the rate limiter's backing store are both probed.
//! A cache outage degrades the service (pre-checks keep flowing on the
//! fail-open path); a storage outage makes it unhealthy. No authentication
//! required.

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router,
};
use gatehouse_limiter::RateLimiter;
use gatehouse_storage::Storage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub details: HealthDetails,
}

/// Overall or per-component health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Per-backend detail attached to the health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthDetails {
    pub storage: ComponentHealth,
    pub cache: ComponentHealth,
    pub version: String,
    pub uptime_secs: u64,
}

/// Reachability of one backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentHealth {
    fn healthy(latency_ms: u64) -> Self {
        Self {
            status: HealthStatus::Healthy,
            latency_ms: Some(latency_ms),
            error: None,
        }
    }

    fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            error: Some(error.into()),
        }
    }
}

// ============================================================================
// HANDLER
// ============================================================================

/// GET /health - Liveness, uptime, and backend reachability.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is up (possibly degraded)", body = HealthResponse),
        (status = 503, description = "Storage is unreachable", body = HealthResponse),
    )
))]
pub async fn health(
    State(storage): State<Arc<dyn Storage>>,
    State(limiter): State<Arc<RateLimiter>>,
    State(start_time): State<Instant>,
) -> impl IntoResponse {
    let storage_health = check_storage(storage.as_ref()).await;
    let cache_health = check_cache(&limiter).await;

    // Storage down means nothing can be decided or recorded; a cache outage
    // only degrades (the limiter falls back / fails open).
    let overall = if storage_health.status != HealthStatus::Healthy {
        HealthStatus::Unhealthy
    } else if cache_health.status != HealthStatus::Healthy {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    };

    let status_code = if overall == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    let response = HealthResponse {
        status: overall,
        details: HealthDetails {
            storage: storage_health,
            cache: cache_health,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: start_time.elapsed().as_secs(),
        },
    };

    (status_code, Json(response))
}

async fn check_storage(storage: &dyn Storage) -> ComponentHealth {
    let start = Instant::now();
    match storage.ping().await {
        Ok(()) => ComponentHealth::healthy(start.elapsed().as_millis() as u64),
        Err(e) => ComponentHealth::unhealthy(format!("Storage check failed: {}", e)),
    }
}

async fn check_cache(limiter: &RateLimiter) -> ComponentHealth {
    let start = Instant::now();
    match limiter.ping().await {
        Ok(()) => ComponentHealth::healthy(start.elapsed().as_millis() as u64),
        Err(e) => ComponentHealth::unhealthy(format!("Cache check failed: {}", e)),
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the health router (no auth required).
pub fn create_router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

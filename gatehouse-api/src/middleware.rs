//! Axum middleware and extractors for tenant context and transport limits.
//!
//! Tenant identity arrives in headers (`X-Tenant-ID`, `X-Organization-ID`,
//! `X-User-ID`); the `TenantContext` extractor rejects requests without a
//! tenant. The transport rate limiter guards the admin surface per tenant
//! (or per caller IP when no tenant header is present); the per-customer
//! sliding-window limiter in the pre-check path is a separate concern.

use crate::config::ApiConfig;
use crate::error::ApiError;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use governor::{clock::DefaultClock, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Tenant header name.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Organization header name.
pub const ORGANIZATION_HEADER: &str = "x-organization-id";

/// User header name.
pub const USER_HEADER: &str = "x-user-id";

// ============================================================================
// TENANT CONTEXT EXTRACTOR
// ============================================================================

/// Tenant identity for an admin request.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: String,
    pub organization_id: Option<String>,
    pub user_id: String,
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tenant_id = header_string(&parts.headers, TENANT_HEADER)
            .ok_or_else(|| ApiError::unauthorized("X-Tenant-ID header is required"))?;
        let organization_id = header_string(&parts.headers, ORGANIZATION_HEADER);
        let user_id =
            header_string(&parts.headers, USER_HEADER).unwrap_or_else(|| "anonymous".to_string());

        Ok(TenantContext {
            tenant_id,
            organization_id,
            user_id,
        })
    }
}

// ============================================================================
// TRANSPORT RATE LIMITING
// ============================================================================

/// Type alias for the rate limiter we use.
type DirectRateLimiter =
    RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, DefaultClock>;

/// Key for transport rate limiting.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum RateLimitKey {
    /// Request without tenant context - keyed by caller address
    Caller(String),
    /// Tenant-scoped request - keyed by tenant id
    Tenant(String),
}

/// State for the transport rate-limit middleware.
#[derive(Clone)]
pub struct RateLimitState {
    config: Arc<ApiConfig>,
    /// Per-key limiters - DashMap for lock-free concurrent access
    limiters: Arc<DashMap<RateLimitKey, Arc<DirectRateLimiter>>>,
}

impl RateLimitState {
    /// Create new rate limit state from API configuration.
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config: Arc::new(config),
            limiters: Arc::new(DashMap::new()),
        }
    }

    /// Get or create a limiter for the given key.
    fn get_or_create_limiter(&self, key: &RateLimitKey) -> Arc<DirectRateLimiter> {
        let limiter = self.limiters.entry(key.clone()).or_insert_with(|| {
            let requests_per_minute = match key {
                RateLimitKey::Caller(_) => self.config.rate_limit_unauthenticated,
                RateLimitKey::Tenant(_) => self.config.rate_limit_authenticated,
            };
            let quota =
                Quota::per_minute(NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN))
                    .allow_burst(
                        NonZeroU32::new(self.config.rate_limit_burst).unwrap_or(NonZeroU32::MIN),
                    );
            Arc::new(RateLimiter::direct(quota))
        });
        limiter.clone()
    }
}

/// Derive the rate-limit key from request headers.
fn rate_limit_key(headers: &HeaderMap) -> RateLimitKey {
    if let Some(tenant) = header_string(headers, TENANT_HEADER) {
        return RateLimitKey::Tenant(tenant);
    }
    let caller = header_string(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
        .or_else(|| header_string(headers, "x-real-ip"))
        .unwrap_or_else(|| "unknown".to_string());
    RateLimitKey::Caller(caller)
}

/// Transport rate-limiting middleware.
///
/// When limited, returns 429 with a Retry-After header; admitted responses
/// carry an informational `x-ratelimit-limit` header.
pub async fn transport_rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.config.rate_limit_enabled {
        return Ok(next.run(request).await);
    }

    let key = rate_limit_key(request.headers());
    let limiter = state.get_or_create_limiter(&key);

    match limiter.check() {
        Ok(_) => {
            let limit = match &key {
                RateLimitKey::Caller(_) => state.config.rate_limit_unauthenticated,
                RateLimitKey::Tenant(_) => state.config.rate_limit_authenticated,
            };
            let mut response = next.run(request).await;
            if let Ok(value) = HeaderValue::from_str(&limit.to_string()) {
                response.headers_mut().insert("x-ratelimit-limit", value);
            }
            Ok(response)
        }
        Err(not_until) => {
            let retry_after = not_until
                .wait_time_from(governor::clock::Clock::now(&DefaultClock::default()))
                .as_secs()
                .max(1);
            Err(ApiError::rate_limited(retry_after))
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

//! Gatehouse Limiter - Distributed Sliding-Window Rate Limiting
//!
//! Per-customer request limiting with precise sliding semantics over a
//! shared cache, pipelined atomic updates, automatic key expiry, and
//! fail-open degradation to a process-local fallback.

mod local;
mod redis_store;
mod store;

pub use local::LocalWindow;
pub use redis_store::RedisWindowStore;
pub use store::WindowStore;

use chrono::{DateTime, TimeZone, Utc};
use gatehouse_core::{CacheError, GatewayConfig, GatewayError, GatewayResult, Timestamp};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Key prefix in the shared cache.
const KEY_PREFIX: &str = "ratelimit:";

/// Deadline for the initial cache connection.
const CONNECT_DEADLINE: Duration = Duration::from_secs(5);

// ============================================================================
// RESULT TYPES
// ============================================================================

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    /// Request admitted; `current` is the post-prune, pre-append count.
    Allowed { current: i64 },
    /// Request denied. The event was still appended (a leaky window: the
    /// key keeps paying for over-limit traffic and recovers smoothly).
    Denied {
        current: i64,
        limit: u32,
        retry_after_secs: u64,
    },
}

impl RateDecision {
    /// Whether the request may proceed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// Snapshot of a key's standing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub current_count: i64,
    /// Start of the next wall-clock minute (boundary semantics, not
    /// per-event sliding)
    pub next_reset: Timestamp,
}

/// Windowed statistics for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowStats {
    pub customer_id: String,
    pub count: i64,
    pub window_start: Timestamp,
    pub window_end: Timestamp,
    pub duration: Duration,
}

// ============================================================================
// BACKEND SELECTION
// ============================================================================

enum Backend {
    /// Shared cache reachable; the normal mode.
    Cache(Arc<dyn WindowStore>),
    /// Cache configured but unreachable at startup; checks run on the local
    /// fallback, admin operations error.
    LocalFallback,
    /// No cache configured; a single-process deployment runs entirely on
    /// the local store, admin operations included.
    LocalOnly,
}

// ============================================================================
// RATE LIMITER
// ============================================================================

/// Sliding-window rate limiter. `key` is the customer id; `limit` is
/// permits per window.
///
/// Threshold semantics are lenient: a request is denied when the pre-append
/// count strictly exceeds the limit, so a key admits up to `limit + 1`
/// events in a window.
pub struct RateLimiter {
    backend: Backend,
    local: LocalWindow,
    window: Duration,
    key_ttl: Duration,
    fail_open: bool,
}

impl RateLimiter {
    /// Build from service configuration: connect to the shared cache when
    /// one is configured, fall back to the local store when it is
    /// unreachable.
    pub async fn from_config(config: &GatewayConfig) -> Self {
        let backend = match config.cache_url.as_deref() {
            None => {
                tracing::info!("No shared cache configured; rate limiting is process-local");
                Backend::LocalOnly
            }
            Some(url) => match RedisWindowStore::connect(url, CONNECT_DEADLINE).await {
                Ok(store) => Backend::Cache(Arc::new(store)),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Shared cache unreachable; rate limiting degraded to per-process fallback"
                    );
                    Backend::LocalFallback
                }
            },
        };
        Self {
            backend,
            local: LocalWindow::new(),
            window: config.rate_window,
            key_ttl: config.rate_key_ttl,
            fail_open: config.fail_open,
        }
    }

    /// Build over an explicit store (tests, embedded deployments).
    pub fn with_store(store: Arc<dyn WindowStore>, window: Duration, key_ttl: Duration) -> Self {
        Self {
            backend: Backend::Cache(store),
            local: LocalWindow::new(),
            window,
            key_ttl,
            fail_open: true,
        }
    }

    /// Build a purely process-local limiter.
    pub fn local(window: Duration, key_ttl: Duration) -> Self {
        Self {
            backend: Backend::LocalOnly,
            local: LocalWindow::new(),
            window,
            key_ttl,
            fail_open: true,
        }
    }

    /// Disable fail-open: transient cache errors during `check` deny
    /// instead of admitting.
    pub fn with_fail_closed(mut self) -> Self {
        self.fail_open = false;
        self
    }

    /// Check and record one request for a customer.
    pub async fn check(&self, customer_id: &str, limit: u32) -> GatewayResult<RateDecision> {
        let key = cache_key(customer_id);
        let now = Utc::now().timestamp();
        let member = Uuid::now_v7().to_string();
        let window_secs = self.window.as_secs() as i64;
        let ttl_secs = self.key_ttl.as_secs() as i64;

        let recorded = match &self.backend {
            Backend::Cache(store) => {
                store
                    .record(&key, now, window_secs, &member, ttl_secs)
                    .await
            }
            Backend::LocalFallback | Backend::LocalOnly => {
                self.local
                    .record(&key, now, window_secs, &member, ttl_secs)
                    .await
            }
        };

        let current = match recorded {
            Ok(count) => count,
            Err(e) if self.fail_open => {
                // Availability over strict enforcement.
                tracing::warn!(
                    customer_id,
                    error = %e,
                    "Rate-limit cache error; failing open"
                );
                return Ok(RateDecision::Allowed { current: 0 });
            }
            Err(e) => return Err(GatewayError::Cache(e)),
        };

        if current > limit as i64 {
            let retry_after_secs = seconds_to_next_minute(now);
            Ok(RateDecision::Denied {
                current,
                limit,
                retry_after_secs,
            })
        } else {
            Ok(RateDecision::Allowed { current })
        }
    }

    /// Current count and the next wall-clock minute boundary.
    pub async fn status(&self, customer_id: &str) -> GatewayResult<RateLimitStatus> {
        let now = Utc::now().timestamp();
        let window_secs = self.window.as_secs() as i64;
        let current_count = self
            .admin_store()?
            .count_range(&cache_key(customer_id), now - window_secs, now)
            .await
            .map_err(GatewayError::Cache)?;

        Ok(RateLimitStatus {
            current_count,
            next_reset: minute_boundary_after(now),
        })
    }

    /// Event count over an arbitrary trailing window.
    pub async fn stats(&self, customer_id: &str, duration: Duration) -> GatewayResult<WindowStats> {
        let now = Utc::now().timestamp();
        let from = now - duration.as_secs() as i64;
        let count = self
            .admin_store()?
            .count_range(&cache_key(customer_id), from, now)
            .await
            .map_err(GatewayError::Cache)?;

        Ok(WindowStats {
            customer_id: customer_id.to_string(),
            count,
            window_start: unix_to_timestamp(from),
            window_end: unix_to_timestamp(now),
            duration,
        })
    }

    /// Administrative reset of a key.
    pub async fn flush(&self, customer_id: &str) -> GatewayResult<()> {
        self.admin_store()?
            .remove(&cache_key(customer_id))
            .await
            .map_err(GatewayError::Cache)
    }

    /// Reachability of the limiter's backing store.
    ///
    /// Probes whatever backend `check` runs against. A limiter degraded to
    /// the per-process fallback reports the cache outage here even though
    /// checks keep flowing.
    pub async fn ping(&self) -> Result<(), CacheError> {
        match &self.backend {
            Backend::Cache(store) => store.ping().await,
            Backend::LocalOnly => self.local.ping().await,
            Backend::LocalFallback => Err(CacheError::Unavailable {
                reason: "shared cache is unreachable".to_string(),
            }),
        }
    }

    /// Store used by admin operations. These never fall back: a degraded
    /// limiter reports the cache outage instead of answering from
    /// process-local state.
    fn admin_store(&self) -> GatewayResult<&dyn WindowStore> {
        match &self.backend {
            Backend::Cache(store) => Ok(store.as_ref()),
            Backend::LocalOnly => Ok(&self.local),
            Backend::LocalFallback => Err(GatewayError::Cache(CacheError::Unavailable {
                reason: "shared cache is unreachable".to_string(),
            })),
        }
    }
}

// ============================================================================
// TIME HELPERS
// ============================================================================

fn cache_key(customer_id: &str) -> String {
    format!("{}{}", KEY_PREFIX, customer_id)
}

fn seconds_to_next_minute(now_unix: i64) -> u64 {
    (60 - now_unix.rem_euclid(60)) as u64
}

fn minute_boundary_after(now_unix: i64) -> Timestamp {
    unix_to_timestamp((now_unix / 60 + 1) * 60)
}

fn unix_to_timestamp(unix: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(unix, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

// ============================================================================
// TESTS
// ============================================================================

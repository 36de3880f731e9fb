//! Sliding-window store trait.
//!
//! The shared cache is an ordered-set store: each rate-limit key holds the
//! event timestamps of the last window. Backends must make `record` atomic -
//! prune, count, append, and TTL refresh either all happen or none do.

use async_trait::async_trait;
use gatehouse_core::CacheError;

/// Pluggable backend for sliding-window event sets.
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Reachability probe for readiness endpoints.
    async fn ping(&self) -> Result<(), CacheError>;

    /// Atomically prune events older than the window, count the survivors,
    /// append a new event at `now_unix`, and refresh the key TTL.
    ///
    /// Returns the post-prune, pre-append count; the decision threshold is
    /// applied to that value. The append happens regardless of the eventual
    /// decision - over-limit requests still incur a bookkeeping event.
    async fn record(
        &self,
        key: &str,
        now_unix: i64,
        window_secs: i64,
        member: &str,
        ttl_secs: i64,
    ) -> Result<i64, CacheError>;

    /// Count events with timestamps in `[from_unix, to_unix]`.
    async fn count_range(&self, key: &str, from_unix: i64, to_unix: i64)
        -> Result<i64, CacheError>;

    /// Drop the key entirely.
    async fn remove(&self, key: &str) -> Result<(), CacheError>;
}

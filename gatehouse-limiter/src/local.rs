//! Process-local window store.
//!
//! The degraded fallback when the shared cache is unreachable: the same
//! event-timestamp model, held in a per-process concurrent map. Limits
//! enforced here are per process - a horizontally scaled fleet running on
//! the fallback admits up to `limit` requests per instance, not per fleet.

use crate::store::WindowStore;
use async_trait::async_trait;
use dashmap::DashMap;
use gatehouse_core::CacheError;
use std::collections::VecDeque;
use std::sync::Mutex;

/// In-process sliding-window store keyed by customer.
#[derive(Debug, Default)]
pub struct LocalWindow {
    events: DashMap<String, Mutex<VecDeque<i64>>>,
}

impl LocalWindow {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently tracked.
    pub fn key_count(&self) -> usize {
        self.events.len()
    }
}

#[async_trait]
impl WindowStore for LocalWindow {
    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    async fn record(
        &self,
        key: &str,
        now_unix: i64,
        window_secs: i64,
        _member: &str,
        _ttl_secs: i64,
    ) -> Result<i64, CacheError> {
        let cutoff = now_unix - window_secs;
        let entry = self
            .events
            .entry(key.to_string())
            .or_insert_with(|| Mutex::new(VecDeque::new()));
        let mut events = entry.lock().map_err(|_| CacheError::Command {
            reason: "local window lock poisoned".to_string(),
        })?;

        while matches!(events.front(), Some(&t) if t < cutoff) {
            events.pop_front();
        }
        let count = events.len() as i64;
        events.push_back(now_unix);
        Ok(count)
    }

    async fn count_range(
        &self,
        key: &str,
        from_unix: i64,
        to_unix: i64,
    ) -> Result<i64, CacheError> {
        match self.events.get(key) {
            None => Ok(0),
            Some(entry) => {
                let events = entry.lock().map_err(|_| CacheError::Command {
                    reason: "local window lock poisoned".to_string(),
                })?;
                Ok(events
                    .iter()
                    .filter(|&&t| t >= from_unix && t <= to_unix)
                    .count() as i64)
            }
        }
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.events.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_prunes_and_counts_before_append() {
        let store = LocalWindow::new();
        let base = 1_000_000;

        assert_eq!(store.record("k", base, 60, "m1", 120).await.unwrap(), 0);
        assert_eq!(store.record("k", base + 1, 60, "m2", 120).await.unwrap(), 1);
        assert_eq!(store.record("k", base + 2, 60, "m3", 120).await.unwrap(), 2);

        // 61 seconds later the first two events have aged out; the one at
        // base+2 sits exactly at the window edge and survives.
        assert_eq!(
            store.record("k", base + 62, 60, "m4", 120).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_keys_are_isolated() {
        let store = LocalWindow::new();
        let base = 1_000_000;
        store.record("a", base, 60, "m", 120).await.unwrap();
        store.record("a", base, 60, "m", 120).await.unwrap();
        assert_eq!(store.record("b", base, 60, "m", 120).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_count_range_and_remove() {
        let store = LocalWindow::new();
        let base = 1_000_000;
        for i in 0..5 {
            store.record("k", base + i, 60, "m", 120).await.unwrap();
        }
        assert_eq!(store.count_range("k", base, base + 4).await.unwrap(), 5);
        assert_eq!(store.count_range("k", base + 3, base + 4).await.unwrap(), 2);

        store.remove("k").await.unwrap();
        assert_eq!(store.count_range("k", base, base + 4).await.unwrap(), 0);
        assert_eq!(store.key_count(), 0);
    }
}

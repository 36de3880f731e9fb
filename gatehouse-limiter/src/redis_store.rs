//! Shared-cache window store backed by redis sorted sets.

use crate::store::WindowStore;
use async_trait::async_trait;
use gatehouse_core::CacheError;
use redis::aio::ConnectionManager;
use std::time::Duration;

/// Window store over a shared cache reachable at `cache://host:port[/db]`.
///
/// Each `record` call is one `MULTI`/`EXEC` pipeline, so the prune, count,
/// append, and TTL refresh commit together. Per-key command ordering is the
/// cache's single-threaded key handling; two concurrent records for the same
/// key serialize there, never losing an append.
#[derive(Clone)]
pub struct RedisWindowStore {
    manager: ConnectionManager,
}

impl RedisWindowStore {
    /// Connect to the shared cache, bounded by `deadline`.
    pub async fn connect(url: &str, deadline: Duration) -> Result<Self, CacheError> {
        let redis_url = rewrite_cache_url(url)?;
        let client = redis::Client::open(redis_url.as_str()).map_err(|e| CacheError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let manager = tokio::time::timeout(deadline, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Unavailable {
                reason: format!("connect deadline of {:?} exceeded", deadline),
            })?
            .map_err(|e| CacheError::Unavailable {
                reason: e.to_string(),
            })?;
        Ok(Self { manager })
    }
}

/// Translate `cache://host:port[/db]` into the client's URL scheme.
/// Plain `redis://` URLs pass through for operators who configure them
/// directly.
fn rewrite_cache_url(url: &str) -> Result<String, CacheError> {
    if let Some(rest) = url.strip_prefix("cache://") {
        return Ok(format!("redis://{}", rest));
    }
    if url.starts_with("redis://") || url.starts_with("rediss://") {
        return Ok(url.to_string());
    }
    Err(CacheError::InvalidUrl {
        url: url.to_string(),
        reason: "expected cache://host:port[/db]".to_string(),
    })
}

fn command_error(e: redis::RedisError) -> CacheError {
    if e.is_connection_refusal() || e.is_io_error() || e.is_timeout() {
        CacheError::Unavailable {
            reason: e.to_string(),
        }
    } else {
        CacheError::Command {
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl WindowStore for RedisWindowStore {
    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(())
    }

    async fn record(
        &self,
        key: &str,
        now_unix: i64,
        window_secs: i64,
        member: &str,
        ttl_secs: i64,
    ) -> Result<i64, CacheError> {
        let cutoff = now_unix - window_secs;
        let mut conn = self.manager.clone();

        // Events at exactly the window edge stay; only scores strictly below
        // the cutoff are garbage.
        let (_pruned, count, _added, _ttl_set): (i64, i64, i64, i64) = redis::pipe()
            .atomic()
            .cmd("ZREMRANGEBYSCORE")
            .arg(key)
            .arg("-inf")
            .arg(format!("({}", cutoff))
            .cmd("ZCARD")
            .arg(key)
            .cmd("ZADD")
            .arg(key)
            .arg(now_unix)
            .arg(member)
            .cmd("EXPIRE")
            .arg(key)
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;

        Ok(count)
    }

    async fn count_range(
        &self,
        key: &str,
        from_unix: i64,
        to_unix: i64,
    ) -> Result<i64, CacheError> {
        let mut conn = self.manager.clone();
        redis::cmd("ZCOUNT")
            .arg(key)
            .arg(from_unix)
            .arg(to_unix)
            .query_async(&mut conn)
            .await
            .map_err(command_error)
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let _: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_url_rewrite() {
        assert_eq!(
            rewrite_cache_url("cache://cache-0.internal:6379/2").unwrap(),
            "redis://cache-0.internal:6379/2"
        );
        assert_eq!(
            rewrite_cache_url("redis://localhost:6379").unwrap(),
            "redis://localhost:6379"
        );
        assert!(matches!(
            rewrite_cache_url("memcached://x"),
            Err(CacheError::InvalidUrl { .. })
        ));
    }
}

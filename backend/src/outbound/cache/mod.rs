//! Redis-backed aggregate view cache.
//!
//! Views are stored as `serde_json` blobs under `account:<id>:info` with a
//! per-key expiry (`SET key value EX seconds`). An optional random jitter is
//! added to each expiry so views cached together do not all expire in the
//! same second. Backend failures are returned to the caller; the adapter
//! never pretends a failed read was a miss.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::{self, Pool};
use bb8_redis::redis;
use rand::Rng;
use tracing::debug;

use crate::domain::AggregateView;
use crate::domain::ports::{AggregateCache, AggregateCacheError, AggregateCacheKey};

/// Redis pool configuration.
#[derive(Debug, Clone)]
pub struct CachePoolConfig {
    redis_url: String,
    max_size: u32,
    connection_timeout: Duration,
    ttl_jitter: Duration,
}

impl CachePoolConfig {
    /// Default upper bound on pooled Redis connections.
    pub const DEFAULT_MAX_SIZE: u32 = 16;
    /// Default checkout timeout.
    pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

    /// Configuration for `redis_url` with default limits and no jitter.
    pub fn new(redis_url: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
            max_size: Self::DEFAULT_MAX_SIZE,
            connection_timeout: Self::DEFAULT_CONNECTION_TIMEOUT,
            ttl_jitter: Duration::ZERO,
        }
    }

    /// Set the maximum number of pooled connections.
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the checkout timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the upper bound of the random extra expiry added per `set`.
    pub fn with_ttl_jitter(mut self, jitter: Duration) -> Self {
        self.ttl_jitter = jitter;
        self
    }

    pub fn redis_url(&self) -> &str {
        &self.redis_url
    }
}

fn backend_error(error: impl std::fmt::Display) -> AggregateCacheError {
    AggregateCacheError::backend(error.to_string())
}

/// Whole seconds for `SET … EX`: `ttl` rounded up to at least one second,
/// plus a random jitter in `[0, jitter]` seconds.
fn expiry_seconds(ttl: Duration, jitter: Duration, rng: &mut impl Rng) -> u64 {
    let base = ttl
        .as_secs()
        .saturating_add(u64::from(ttl.subsec_nanos() > 0))
        .max(1);
    let jitter_secs = jitter.as_secs();
    if jitter_secs == 0 {
        return base;
    }
    base.saturating_add(rng.gen_range(0..=jitter_secs))
}

/// [`AggregateCache`] adapter over a `bb8-redis` pool.
#[derive(Clone)]
pub struct RedisAggregateCache {
    pool: Pool<RedisConnectionManager>,
    ttl_jitter: Duration,
}

impl RedisAggregateCache {
    /// Build the pool described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateCacheError::Backend`] when the URL is invalid or
    /// the initial connections cannot be opened.
    pub async fn connect(config: CachePoolConfig) -> Result<Self, AggregateCacheError> {
        let manager =
            RedisConnectionManager::new(config.redis_url.as_str()).map_err(backend_error)?;
        let pool = bb8::Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(backend_error)?;
        Ok(Self {
            pool,
            ttl_jitter: config.ttl_jitter,
        })
    }

    async fn connection(
        &self,
    ) -> Result<bb8::PooledConnection<'_, RedisConnectionManager>, AggregateCacheError> {
        self.pool.get().await.map_err(backend_error)
    }
}

#[async_trait]
impl AggregateCache for RedisAggregateCache {
    async fn get(
        &self,
        key: &AggregateCacheKey,
    ) -> Result<Option<AggregateView>, AggregateCacheError> {
        let mut conn = self.connection().await?;
        let blob: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key.as_str())
            .query_async(&mut *conn)
            .await
            .map_err(backend_error)?;
        let Some(blob) = blob else {
            return Ok(None);
        };
        serde_json::from_slice(&blob)
            .map(Some)
            .map_err(|err| AggregateCacheError::serialization(err.to_string()))
    }

    async fn set(
        &self,
        key: &AggregateCacheKey,
        view: &AggregateView,
        ttl: Duration,
    ) -> Result<(), AggregateCacheError> {
        let blob = serde_json::to_vec(view)
            .map_err(|err| AggregateCacheError::serialization(err.to_string()))?;
        let seconds = expiry_seconds(ttl, self.ttl_jitter, &mut rand::thread_rng());
        let mut conn = self.connection().await?;
        let () = redis::cmd("SET")
            .arg(key.as_str())
            .arg(blob)
            .arg("EX")
            .arg(seconds)
            .query_async(&mut *conn)
            .await
            .map_err(backend_error)?;
        debug!(%key, seconds, "aggregate view cached");
        Ok(())
    }

    async fn delete(&self, key: &AggregateCacheKey) -> Result<(), AggregateCacheError> {
        let mut conn = self.connection().await?;
        let removed: i64 = redis::cmd("DEL")
            .arg(key.as_str())
            .query_async(&mut *conn)
            .await
            .map_err(backend_error)?;
        debug!(%key, removed, "aggregate view invalidated");
        Ok(())
    }
}

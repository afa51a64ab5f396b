//! Port interface for caching aggregate views.
//!
//! The cache is never authoritative: a miss or an evicted entry only forces
//! the view to be recomputed from the ledger store. Backend failures are
//! surfaced to the caller rather than silently bypassed.
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::AggregateView;

use super::{AggregateCacheKey, define_port_error};

define_port_error! {
    /// Errors surfaced by the aggregate cache adapter.
    pub enum AggregateCacheError {
        /// Cache backend is unavailable or timing out.
        Backend { message: String } => "aggregate cache backend failure: {message}",
        /// Serialisation or deserialisation of cached content failed.
        Serialization { message: String } => "aggregate cache serialisation failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AggregateCache: Send + Sync {
    /// Read a cached view; `Ok(None)` signals a miss.
    async fn get(&self, key: &AggregateCacheKey)
    -> Result<Option<AggregateView>, AggregateCacheError>;

    /// Store a view under `key` for at most `ttl`.
    async fn set(
        &self,
        key: &AggregateCacheKey,
        view: &AggregateView,
        ttl: Duration,
    ) -> Result<(), AggregateCacheError>;

    /// Remove the entry under `key`; deleting a missing key succeeds.
    async fn delete(&self, key: &AggregateCacheKey) -> Result<(), AggregateCacheError>;
}

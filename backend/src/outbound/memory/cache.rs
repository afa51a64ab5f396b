//! In-memory aggregate view cache with per-entry expiry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::{Clock, DefaultClock};

use crate::domain::AggregateView;
use crate::domain::ports::{AggregateCache, AggregateCacheError, AggregateCacheKey};

struct Entry {
    view: AggregateView,
    expires_at: DateTime<Utc>,
}

/// [`AggregateCache`] backed by a `HashMap`. Expired entries behave as misses.
pub struct InMemoryAggregateCache {
    entries: Mutex<HashMap<AggregateCacheKey, Entry>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryAggregateCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<AggregateCacheKey, Entry>> {
        self.entries.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Whether an unexpired view is cached under `key`.
    pub fn contains(&self, key: &AggregateCacheKey) -> bool {
        let now = self.clock.utc();
        self.lock()
            .get(key)
            .is_some_and(|entry| entry.expires_at > now)
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryAggregateCache {
    fn default() -> Self {
        Self::new(Arc::new(DefaultClock))
    }
}

#[async_trait]
impl AggregateCache for InMemoryAggregateCache {
    async fn get(
        &self,
        key: &AggregateCacheKey,
    ) -> Result<Option<AggregateView>, AggregateCacheError> {
        let now = self.clock.utc();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.view.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &AggregateCacheKey,
        view: &AggregateView,
        ttl: Duration,
    ) -> Result<(), AggregateCacheError> {
        let ttl = TimeDelta::from_std(ttl)
            .map_err(|err| AggregateCacheError::backend(format!("invalid ttl: {err}")))?;
        let expires_at = self
            .clock
            .utc()
            .checked_add_signed(ttl)
            .ok_or_else(|| AggregateCacheError::backend("ttl overflows the clock range"))?;
        self.lock().insert(
            key.clone(),
            Entry {
                view: view.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &AggregateCacheKey) -> Result<(), AggregateCacheError> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use crate::domain::AccountId;
    use rstest::{fixture, rstest};

    struct MutableClock(Mutex<DateTime<Utc>>);

    impl MutableClock {
        fn advance(&self, delta: TimeDelta) {
            *self.0.lock().expect("clock lock") += delta;
        }
    }

    impl Clock for MutableClock {
        fn local(&self) -> DateTime<Local> {
            self.utc().with_timezone(&Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            *self.0.lock().expect("clock lock")
        }
    }

    #[fixture]
    fn clock() -> Arc<MutableClock> {
        Arc::new(MutableClock(Mutex::new(Utc::now())))
    }

    fn view(coins: i64) -> AggregateView {
        AggregateView {
            coins,
            ..AggregateView::default()
        }
    }

    #[rstest]
    #[tokio::test]
    async fn set_then_get_returns_view(clock: Arc<MutableClock>) {
        let cache = InMemoryAggregateCache::new(clock);
        let key = AggregateCacheKey::for_account(AccountId::new(1));

        cache
            .set(&key, &view(10), Duration::from_secs(30))
            .await
            .expect("set succeeds");

        assert_eq!(cache.get(&key).await.expect("get"), Some(view(10)));
        assert!(cache.contains(&key));
    }

    #[rstest]
    #[tokio::test]
    async fn expired_entries_miss(clock: Arc<MutableClock>) {
        let cache = InMemoryAggregateCache::new(clock.clone());
        let key = AggregateCacheKey::for_account(AccountId::new(2));
        cache
            .set(&key, &view(5), Duration::from_secs(30))
            .await
            .expect("set succeeds");

        clock.advance(TimeDelta::seconds(31));

        assert!(!cache.contains(&key));
        assert_eq!(cache.get(&key).await.expect("get"), None);
        assert!(cache.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn delete_of_missing_key_succeeds(clock: Arc<MutableClock>) {
        let cache = InMemoryAggregateCache::new(clock);
        let key = AggregateCacheKey::for_account(AccountId::new(3));
        cache.delete(&key).await.expect("delete succeeds");
        assert!(!cache.contains(&key));
    }

    #[rstest]
    #[tokio::test]
    async fn ttl_beyond_clock_range_is_rejected(clock: Arc<MutableClock>) {
        let cache = InMemoryAggregateCache::new(clock);
        let key = AggregateCacheKey::for_account(AccountId::new(4));

        let error = cache
            .set(&key, &view(1), Duration::from_secs(9_000_000_000_000))
            .await
            .expect_err("overflowing ttl rejected");

        assert!(matches!(error, AggregateCacheError::Backend { .. }));
        assert!(!cache.contains(&key));
    }
}

//! Ledger orchestration service.
//!
//! Reads are served read-through: the aggregate cache is consulted first and
//! populated from the ledger store on a miss. Writes are write-invalidate:
//! once the store commits a transfer or purchase, the cached views of every
//! affected account are deleted, never updated in place.
//!
//! Between a commit and the matching delete a concurrent reader may still
//! see the old view. If the delete itself fails, the stale view survives at
//! most until its time-to-live expires, and the caller receives
//! [`LedgerError::CommittedWithStaleCache`] even though the money moved.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    AggregateCache, AggregateCacheKey, LedgerOperations, LedgerStore, LedgerStoreError,
};
use crate::domain::{
    AccountId, AggregateView, CoinAmount, ItemName, LedgerError, PurchaseReceipt,
    TransferReceipt, Username,
};

/// Time-to-live applied to cached views when none is configured.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

fn map_store_error(error: LedgerStoreError) -> LedgerError {
    if error.is_domain_outcome() {
        debug!(%error, "ledger request rejected");
    }
    LedgerError::from(error)
}

/// Service implementing [`LedgerOperations`] over a store and a cache.
#[derive(Clone)]
pub struct LedgerService<S, C> {
    store: Arc<S>,
    cache: Arc<C>,
    cache_ttl: Duration,
}

impl<S, C> LedgerService<S, C> {
    /// Create a service from injected store and cache adapters.
    pub fn new(store: Arc<S>, cache: Arc<C>, cache_ttl: Duration) -> Self {
        Self {
            store,
            cache,
            cache_ttl,
        }
    }

    /// Time-to-live applied when caching freshly built views.
    pub const fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }
}

impl<S, C> LedgerService<S, C>
where
    S: LedgerStore,
    C: AggregateCache,
{
    async fn invalidate_after_commit(&self, account: AccountId) -> Result<(), LedgerError> {
        let key = AggregateCacheKey::for_account(account);
        self.cache.delete(&key).await.map_err(|error| {
            warn!(%account, %error, "aggregate view invalidation failed after commit");
            LedgerError::CommittedWithStaleCache {
                account_id: account.get(),
                message: error.to_string(),
            }
        })
    }
}

#[async_trait]
impl<S, C> LedgerOperations for LedgerService<S, C>
where
    S: LedgerStore,
    C: AggregateCache,
{
    async fn aggregate_view(&self, account: AccountId) -> Result<AggregateView, LedgerError> {
        let key = AggregateCacheKey::for_account(account);
        if let Some(view) = self.cache.get(&key).await? {
            debug!(%account, "aggregate view cache hit");
            return Ok(view);
        }

        debug!(%account, "aggregate view cache miss");
        let (holdings, history) = self
            .store
            .aggregate_snapshot(account)
            .await
            .map_err(map_store_error)?;
        let view = AggregateView::compose(holdings, history);
        self.cache.set(&key, &view, self.cache_ttl).await?;
        Ok(view)
    }

    async fn send_coins(
        &self,
        from: AccountId,
        to: &Username,
        amount: CoinAmount,
    ) -> Result<TransferReceipt, LedgerError> {
        let receipt = self
            .store
            .transfer_coins(from, to, amount)
            .await
            .map_err(map_store_error)?;
        info!(
            sender = %receipt.sender,
            recipient = %receipt.recipient,
            amount = %receipt.amount,
            "coins transferred"
        );

        // Attempt both deletes so one failure does not leave the other view stale.
        let sender_invalidated = self.invalidate_after_commit(receipt.sender).await;
        let recipient_invalidated = self.invalidate_after_commit(receipt.recipient).await;
        sender_invalidated.and(recipient_invalidated)?;
        Ok(receipt)
    }

    async fn buy_item(
        &self,
        account: AccountId,
        item: &ItemName,
    ) -> Result<PurchaseReceipt, LedgerError> {
        let receipt = self
            .store
            .purchase_item(account, item)
            .await
            .map_err(map_store_error)?;
        info!(
            account = %receipt.account,
            item = %receipt.item,
            price = receipt.price,
            "item purchased"
        );

        self.invalidate_after_commit(account).await?;
        Ok(receipt)
    }

    async fn resolve_account(&self, username: &Username) -> Result<AccountId, LedgerError> {
        self.store
            .account_id_by_username(username)
            .await
            .map_err(map_store_error)
    }
}

#[cfg(test)]
#[path = "ledger_service_tests.rs"]
mod tests;

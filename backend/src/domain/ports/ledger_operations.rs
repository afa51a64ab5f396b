//! Driving port exposing ledger operations to inbound adapters.
//!
//! Inbound adapters (the operator CLI, or an HTTP layer in a wider
//! deployment) depend on this trait rather than on the concrete service so
//! they can be exercised against test doubles.
use async_trait::async_trait;

use crate::domain::{
    AccountId, AggregateView, CoinAmount, ItemName, LedgerError, PurchaseReceipt,
    TransferReceipt, Username,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerOperations: Send + Sync {
    /// Return the balance, inventory and transfer history of `account`.
    async fn aggregate_view(&self, account: AccountId) -> Result<AggregateView, LedgerError>;

    /// Transfer coins to another account.
    ///
    /// An error with [`LedgerError::committed`] set means the coins moved
    /// even though the call failed.
    async fn send_coins(
        &self,
        from: AccountId,
        to: &Username,
        amount: CoinAmount,
    ) -> Result<TransferReceipt, LedgerError>;

    /// Buy one unit of a catalog item.
    async fn buy_item(
        &self,
        account: AccountId,
        item: &ItemName,
    ) -> Result<PurchaseReceipt, LedgerError>;

    /// Resolve a username to its account identifier.
    async fn resolve_account(&self, username: &Username) -> Result<AccountId, LedgerError>;
}

//! Port for the transactional ledger store.
//!
//! The [`LedgerStore`] trait is the only concurrency boundary of the ledger:
//! every mutation runs in a single store transaction that either commits in
//! full or leaves balances, inventory and transaction records untouched.
//! Adapters must prevent lost updates on the account rows they touch (row
//! locks, or an optimistic version check on stores without locking).

use async_trait::async_trait;

use crate::domain::{
    AccountId, CoinAmount, Holdings, ItemName, PurchaseReceipt, TransactionHistory,
    TransferReceipt, Username,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by ledger store adapters.
    ///
    /// The first five variants are domain outcomes and guarantee that the
    /// store state is unchanged. `Connection` and `Query` are infrastructure
    /// failures; the active transaction has been rolled back.
    pub enum LedgerStoreError {
        /// Balance does not cover the debit.
        InsufficientFunds { balance: i64, required: i64 } =>
            "insufficient funds: balance {balance}, required {required}",
        /// Transfer recipient resolved to the sender.
        IncorrectReceiver => "cannot send coins to the same account",
        /// No account matches the username.
        UserNotFound { username: String } => "user {username} not found",
        /// No catalog item matches the name.
        ItemNotFound { item: String } => "item {item} not found",
        /// The acting account does not exist.
        AccountNotFound { account_id: i64 } => "account {account_id} not found",
        /// Store connection could not be established.
        Connection { message: String } => "ledger store connection failed: {message}",
        /// Query, mutation or commit failed during execution.
        Query { message: String } => "ledger store query failed: {message}",
    }
}

impl LedgerStoreError {
    /// Whether the error is an expected business outcome.
    pub const fn is_domain_outcome(&self) -> bool {
        !matches!(self, Self::Connection { .. } | Self::Query { .. })
    }
}

/// Port for atomic coin movement and the reads behind the aggregate view.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Move `amount` coins from `from` to the account named `to`.
    ///
    /// Resolves the recipient, checks it differs from the sender, checks the
    /// sender's balance, then debits, credits and appends one transaction
    /// record in a single transaction.
    async fn transfer_coins(
        &self,
        from: AccountId,
        to: &Username,
        amount: CoinAmount,
    ) -> Result<TransferReceipt, LedgerStoreError>;

    /// Spend the price of `item` from `account` and add one unit to its
    /// inventory. No transaction record is written.
    async fn purchase_item(
        &self,
        account: AccountId,
        item: &ItemName,
    ) -> Result<PurchaseReceipt, LedgerStoreError>;

    /// Resolve a username to its account identifier.
    async fn account_id_by_username(
        &self,
        username: &Username,
    ) -> Result<AccountId, LedgerStoreError>;

    /// Read the balance together with inventory lines ordered by item name.
    async fn holdings(&self, account: AccountId) -> Result<Holdings, LedgerStoreError>;

    /// Read sent and received transfers, each ordered oldest first.
    async fn transaction_history(
        &self,
        account: AccountId,
    ) -> Result<TransactionHistory, LedgerStoreError>;

    /// Read everything the aggregate view needs.
    ///
    /// The provided implementation issues [`Self::holdings`] and
    /// [`Self::transaction_history`] separately, so a write committing
    /// between them can yield a view mixing two points in time. Adapters
    /// with snapshot isolation should override it with a single snapshot
    /// read.
    async fn aggregate_snapshot(
        &self,
        account: AccountId,
    ) -> Result<(Holdings, TransactionHistory), LedgerStoreError> {
        let holdings = self.holdings(account).await?;
        let history = self.transaction_history(account).await?;
        Ok((holdings, history))
    }
}

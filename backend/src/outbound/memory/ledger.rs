//! In-memory ledger store and account registry.
//!
//! All state sits behind one mutex, so every operation observes and mutates
//! a consistent ledger without further locking. Check order and error
//! variants match the PostgreSQL adapter.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use tracing::warn;

use crate::domain::ports::{
    AccountRepository, AccountRepositoryError, LedgerStore, LedgerStoreError,
};
use crate::domain::{
    Account, AccountId, CoinAmount, CredentialHash, Holdings, InventoryLine, Item, ItemName,
    LedgerValidationError, NewAccount, PurchaseReceipt, ReceivedTransfer, STARTING_BALANCE,
    SentTransfer, TransactionHistory, TransferReceipt, Username,
};

/// Catalog seeded by the initial database migration, as `(name, price)`.
pub const MERCH_CATALOG: [(&str, i64); 10] = [
    ("t-shirt", 80),
    ("cup", 20),
    ("book", 50),
    ("pen", 10),
    ("powerbank", 200),
    ("hoody", 300),
    ("umbrella", 200),
    ("socks", 10),
    ("wallet", 50),
    ("pink-hoody", 500),
];

#[derive(Debug, Clone)]
struct TransferRecord {
    id: i64,
    from: AccountId,
    to: AccountId,
    amount: i64,
    occurred_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct LedgerState {
    accounts: BTreeMap<AccountId, Account>,
    usernames: HashMap<Username, AccountId>,
    items: HashMap<ItemName, Item>,
    inventory: HashMap<AccountId, BTreeMap<ItemName, i64>>,
    transfers: Vec<TransferRecord>,
    next_account_id: i64,
    next_item_id: i64,
    next_transfer_id: i64,
}

impl LedgerState {
    fn username_of(&self, account: AccountId) -> String {
        self.accounts
            .get(&account)
            .map(|acc| acc.username.as_str().to_owned())
            .unwrap_or_default()
    }

    fn holdings(&self, account: AccountId) -> Result<Holdings, LedgerStoreError> {
        let balance = self
            .accounts
            .get(&account)
            .map(|acc| acc.balance)
            .ok_or_else(|| LedgerStoreError::account_not_found(account.get()))?;
        let inventory = self
            .inventory
            .get(&account)
            .into_iter()
            .flatten()
            .map(|(item, quantity)| InventoryLine {
                item: item.as_str().to_owned(),
                quantity: *quantity,
            })
            .collect();
        Ok(Holdings { balance, inventory })
    }

    fn history(&self, account: AccountId) -> Result<TransactionHistory, LedgerStoreError> {
        if !self.accounts.contains_key(&account) {
            return Err(LedgerStoreError::account_not_found(account.get()));
        }
        let mut ordered: Vec<&TransferRecord> = self
            .transfers
            .iter()
            .filter(|record| record.from == account || record.to == account)
            .collect();
        ordered.sort_by_key(|record| (record.occurred_at, record.id));

        let mut history = TransactionHistory::default();
        for record in ordered {
            if record.to == account {
                history.received.push(ReceivedTransfer {
                    from_user: self.username_of(record.from),
                    amount: record.amount,
                });
            }
            if record.from == account {
                history.sent.push(SentTransfer {
                    to_user: self.username_of(record.to),
                    amount: record.amount,
                });
            }
        }
        Ok(history)
    }
}

/// In-memory [`LedgerStore`] and [`AccountRepository`].
///
/// ```
/// use merch_ledger::outbound::memory::InMemoryLedger;
///
/// let ledger = InMemoryLedger::with_merch_catalog();
/// assert_eq!(ledger.total_supply(), 0);
/// ```
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryLedger {
    /// Empty ledger with no accounts and no catalog.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                next_account_id: 1,
                next_item_id: 1,
                next_transfer_id: 1,
                ..LedgerState::default()
            }),
            clock,
        }
    }

    /// Ledger using the system clock and the standard merch catalog.
    pub fn with_merch_catalog() -> Self {
        let ledger = Self::new(Arc::new(DefaultClock));
        for (name, price) in MERCH_CATALOG {
            if let Err(error) = ItemName::new(name).and_then(|item| ledger.add_item(item, price)) {
                warn!(%error, item = name, "skipping invalid catalog entry");
            }
        }
        ledger
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Add or reprice a catalog item.
    ///
    /// # Errors
    ///
    /// Rejects non-positive prices, matching the `items.price > 0` check of
    /// the database schema.
    pub fn add_item(&self, name: ItemName, price: i64) -> Result<Item, LedgerValidationError> {
        if price <= 0 {
            return Err(LedgerValidationError::NonPositiveAmount { amount: price });
        }
        let mut state = self.lock();
        let id = match state.items.get(&name) {
            Some(existing) => existing.id,
            None => {
                let id = state.next_item_id;
                state.next_item_id += 1;
                id
            }
        };
        let item = Item {
            id,
            name: name.clone(),
            price,
        };
        state.items.insert(name, item.clone());
        Ok(item)
    }

    /// Current balance of `account`, if it exists.
    pub fn balance_of(&self, account: AccountId) -> Option<i64> {
        self.lock().accounts.get(&account).map(|acc| acc.balance)
    }

    /// Units of `item` owned by `account`; zero when none.
    pub fn quantity_of(&self, account: AccountId, item: &ItemName) -> i64 {
        self.lock()
            .inventory
            .get(&account)
            .and_then(|lines| lines.get(item))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of all account balances.
    pub fn total_supply(&self) -> i64 {
        self.lock().accounts.values().map(|acc| acc.balance).sum()
    }

    /// Number of recorded transfers.
    pub fn transfer_count(&self) -> usize {
        self.lock().transfers.len()
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::with_merch_catalog()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn transfer_coins(
        &self,
        from: AccountId,
        to: &Username,
        amount: CoinAmount,
    ) -> Result<TransferReceipt, LedgerStoreError> {
        let occurred_at = self.clock.utc();
        let mut state = self.lock();

        let recipient = *state
            .usernames
            .get(to)
            .ok_or_else(|| LedgerStoreError::user_not_found(to.as_str()))?;
        if recipient == from {
            return Err(LedgerStoreError::incorrect_receiver());
        }
        let balance = state
            .accounts
            .get(&from)
            .map(|acc| acc.balance)
            .ok_or_else(|| LedgerStoreError::account_not_found(from.get()))?;
        if balance < amount.get() {
            return Err(LedgerStoreError::insufficient_funds(balance, amount.get()));
        }

        if let Some(sender) = state.accounts.get_mut(&from) {
            sender.balance -= amount.get();
        }
        if let Some(receiver) = state.accounts.get_mut(&recipient) {
            receiver.balance += amount.get();
        }
        let id = state.next_transfer_id;
        state.next_transfer_id += 1;
        state.transfers.push(TransferRecord {
            id,
            from,
            to: recipient,
            amount: amount.get(),
            occurred_at,
        });

        Ok(TransferReceipt {
            sender: from,
            recipient,
            amount,
        })
    }

    async fn purchase_item(
        &self,
        account: AccountId,
        item: &ItemName,
    ) -> Result<PurchaseReceipt, LedgerStoreError> {
        let mut state = self.lock();

        let price = state
            .items
            .get(item)
            .map(|entry| entry.price)
            .ok_or_else(|| LedgerStoreError::item_not_found(item.as_str()))?;
        let buyer = state
            .accounts
            .get_mut(&account)
            .ok_or_else(|| LedgerStoreError::account_not_found(account.get()))?;
        if buyer.balance < price {
            return Err(LedgerStoreError::insufficient_funds(buyer.balance, price));
        }
        buyer.balance -= price;

        let quantity = state
            .inventory
            .entry(account)
            .or_default()
            .entry(item.clone())
            .or_insert(0);
        *quantity += 1;

        Ok(PurchaseReceipt {
            account,
            item: item.clone(),
            price,
            quantity: *quantity,
        })
    }

    async fn account_id_by_username(
        &self,
        username: &Username,
    ) -> Result<AccountId, LedgerStoreError> {
        self.lock()
            .usernames
            .get(username)
            .copied()
            .ok_or_else(|| LedgerStoreError::user_not_found(username.as_str()))
    }

    async fn holdings(&self, account: AccountId) -> Result<Holdings, LedgerStoreError> {
        self.lock().holdings(account)
    }

    async fn transaction_history(
        &self,
        account: AccountId,
    ) -> Result<TransactionHistory, LedgerStoreError> {
        self.lock().history(account)
    }

    async fn aggregate_snapshot(
        &self,
        account: AccountId,
    ) -> Result<(Holdings, TransactionHistory), LedgerStoreError> {
        let state = self.lock();
        Ok((state.holdings(account)?, state.history(account)?))
    }
}

#[async_trait]
impl AccountRepository for InMemoryLedger {
    async fn create(&self, account: &NewAccount) -> Result<Account, AccountRepositoryError> {
        let created_at = self.clock.utc();
        let mut state = self.lock();
        if state.usernames.contains_key(&account.username) {
            return Err(AccountRepositoryError::duplicate_username(
                account.username.as_str(),
            ));
        }

        let id = AccountId::new(state.next_account_id);
        state.next_account_id += 1;
        let created = Account {
            id,
            username: account.username.clone(),
            credential_hash: CredentialHash::new(account.credential_hash.as_str()),
            balance: STARTING_BALANCE,
            created_at,
        };
        state.usernames.insert(account.username.clone(), id);
        state.accounts.insert(id, created.clone());
        Ok(created)
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<Account>, AccountRepositoryError> {
        let state = self.lock();
        Ok(state
            .usernames
            .get(username)
            .and_then(|id| state.accounts.get(id))
            .cloned())
    }
}

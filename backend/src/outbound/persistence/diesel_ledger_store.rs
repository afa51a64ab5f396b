//! PostgreSQL-backed `LedgerStore` implementation using Diesel.
//!
//! Mutations run in one `READ COMMITTED` transaction each and take
//! `SELECT … FOR UPDATE` locks on every account row they modify, always in
//! ascending id order so opposite-direction transfers cannot deadlock.
//! Aggregate reads run in a `REPEATABLE READ, READ ONLY` transaction so the
//! balance, inventory and history come from a single snapshot.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{LedgerStore, LedgerStoreError};
use crate::domain::{
    AccountId, CoinAmount, Holdings, InventoryLine, ItemName, PurchaseReceipt, ReceivedTransfer,
    SentTransfer, TransactionHistory, TransferReceipt, Username,
};

use super::diesel_helpers::{is_connection_loss, log_diesel_error, run_in_transaction};
use super::models::{ItemRow, NewInventoryEntryRow, NewTransactionRow};
use super::pool::{DbPool, PoolError};
use super::schema::{accounts, inventory_entries, items, transactions};

/// Diesel-backed implementation of the [`LedgerStore`] port.
#[derive(Clone)]
pub struct DieselLedgerStore {
    pool: DbPool,
}

impl DieselLedgerStore {
    /// Create a store over the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Failure inside a store transaction: either a domain rejection decided by
/// the body, or a database error.
enum StoreFailure {
    Rejected(LedgerStoreError),
    Database(diesel::result::Error),
}

impl From<diesel::result::Error> for StoreFailure {
    fn from(error: diesel::result::Error) -> Self {
        Self::Database(error)
    }
}

impl From<LedgerStoreError> for StoreFailure {
    fn from(error: LedgerStoreError) -> Self {
        Self::Rejected(error)
    }
}

impl StoreFailure {
    fn into_port_error(self, operation: &str) -> LedgerStoreError {
        match self {
            Self::Rejected(error) => error,
            Self::Database(error) => map_diesel_error(error, operation),
        }
    }
}

fn map_pool_error(error: PoolError) -> LedgerStoreError {
    LedgerStoreError::connection(error.message())
}

fn map_diesel_error(error: diesel::result::Error, operation: &str) -> LedgerStoreError {
    log_diesel_error(&error, operation);
    if is_connection_loss(&error) {
        LedgerStoreError::connection("database connection error")
    } else {
        LedgerStoreError::query(format!("{operation}: {error}"))
    }
}

/// Lock an account row and return its balance.
async fn lock_balance(
    conn: &mut AsyncPgConnection,
    account: AccountId,
) -> QueryResult<Option<i64>> {
    accounts::table
        .find(account.get())
        .select(accounts::balance)
        .for_update()
        .get_result(conn)
        .await
        .optional()
}

async fn resolve_username(
    conn: &mut AsyncPgConnection,
    username: &Username,
) -> QueryResult<Option<AccountId>> {
    let id: Option<i64> = accounts::table
        .filter(accounts::username.eq(username.as_str()))
        .select(accounts::id)
        .first(conn)
        .await
        .optional()?;
    Ok(id.map(AccountId::new))
}

async fn transfer_in_transaction(
    conn: &mut AsyncPgConnection,
    from: AccountId,
    to: &Username,
    amount: CoinAmount,
) -> Result<TransferReceipt, StoreFailure> {
    let recipient = resolve_username(conn, to)
        .await?
        .ok_or_else(|| LedgerStoreError::user_not_found(to.as_str()))?;
    if recipient == from {
        return Err(LedgerStoreError::incorrect_receiver().into());
    }

    let (first, second) = if from < recipient {
        (from, recipient)
    } else {
        (recipient, from)
    };
    let first_balance = lock_balance(conn, first).await?;
    let second_balance = lock_balance(conn, second).await?;
    let (sender_balance, recipient_balance) = if first == from {
        (first_balance, second_balance)
    } else {
        (second_balance, first_balance)
    };

    let balance =
        sender_balance.ok_or_else(|| LedgerStoreError::account_not_found(from.get()))?;
    if recipient_balance.is_none() {
        return Err(LedgerStoreError::user_not_found(to.as_str()).into());
    }
    if balance < amount.get() {
        return Err(LedgerStoreError::insufficient_funds(balance, amount.get()).into());
    }

    diesel::update(accounts::table.find(from.get()))
        .set(accounts::balance.eq(accounts::balance - amount.get()))
        .execute(conn)
        .await?;
    diesel::update(accounts::table.find(recipient.get()))
        .set(accounts::balance.eq(accounts::balance + amount.get()))
        .execute(conn)
        .await?;
    diesel::insert_into(transactions::table)
        .values(&NewTransactionRow {
            from_id: from.get(),
            to_id: recipient.get(),
            amount: amount.get(),
        })
        .execute(conn)
        .await?;

    Ok(TransferReceipt {
        sender: from,
        recipient,
        amount,
    })
}

async fn purchase_in_transaction(
    conn: &mut AsyncPgConnection,
    account: AccountId,
    item: &ItemName,
) -> Result<PurchaseReceipt, StoreFailure> {
    let item_row: ItemRow = items::table
        .filter(items::name.eq(item.as_str()))
        .select(ItemRow::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| LedgerStoreError::item_not_found(item.as_str()))?;

    let balance = lock_balance(conn, account)
        .await?
        .ok_or_else(|| LedgerStoreError::account_not_found(account.get()))?;
    if balance < item_row.price {
        return Err(LedgerStoreError::insufficient_funds(balance, item_row.price).into());
    }

    diesel::update(accounts::table.find(account.get()))
        .set(accounts::balance.eq(accounts::balance - item_row.price))
        .execute(conn)
        .await?;
    let quantity: i64 = diesel::insert_into(inventory_entries::table)
        .values(&NewInventoryEntryRow {
            account_id: account.get(),
            item_id: item_row.id,
            quantity: 1,
        })
        .on_conflict((inventory_entries::account_id, inventory_entries::item_id))
        .do_update()
        .set(inventory_entries::quantity.eq(inventory_entries::quantity + 1))
        .returning(inventory_entries::quantity)
        .get_result(conn)
        .await?;

    Ok(PurchaseReceipt {
        account,
        item: item.clone(),
        price: item_row.price,
        quantity,
    })
}

async fn load_holdings(
    conn: &mut AsyncPgConnection,
    account: AccountId,
) -> Result<Holdings, StoreFailure> {
    let balance: i64 = accounts::table
        .find(account.get())
        .select(accounts::balance)
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| LedgerStoreError::account_not_found(account.get()))?;

    let lines: Vec<(String, i64)> = inventory_entries::table
        .inner_join(items::table)
        .filter(inventory_entries::account_id.eq(account.get()))
        .order_by(items::name)
        .select((items::name, inventory_entries::quantity))
        .load(conn)
        .await?;

    Ok(Holdings {
        balance,
        inventory: lines
            .into_iter()
            .map(|(item, quantity)| InventoryLine { item, quantity })
            .collect(),
    })
}

async fn load_history(
    conn: &mut AsyncPgConnection,
    account: AccountId,
) -> Result<TransactionHistory, StoreFailure> {
    let received: Vec<(String, i64)> = transactions::table
        .inner_join(accounts::table.on(accounts::id.eq(transactions::from_id)))
        .filter(transactions::to_id.eq(account.get()))
        .order_by((transactions::occurred_at, transactions::id))
        .select((accounts::username, transactions::amount))
        .load(conn)
        .await?;
    let sent: Vec<(String, i64)> = transactions::table
        .inner_join(accounts::table.on(accounts::id.eq(transactions::to_id)))
        .filter(transactions::from_id.eq(account.get()))
        .order_by((transactions::occurred_at, transactions::id))
        .select((accounts::username, transactions::amount))
        .load(conn)
        .await?;

    Ok(TransactionHistory {
        received: received
            .into_iter()
            .map(|(from_user, amount)| ReceivedTransfer { from_user, amount })
            .collect(),
        sent: sent
            .into_iter()
            .map(|(to_user, amount)| SentTransfer { to_user, amount })
            .collect(),
    })
}

#[async_trait]
impl LedgerStore for DieselLedgerStore {
    async fn transfer_coins(
        &self,
        from: AccountId,
        to: &Username,
        amount: CoinAmount,
    ) -> Result<TransferReceipt, LedgerStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let receipt = run_in_transaction(&mut conn, |conn| {
            transfer_in_transaction(conn, from, to, amount).scope_boxed()
        })
        .await
        .map_err(|failure| failure.into_port_error("transfer coins"))?;
        debug!(%from, recipient = %receipt.recipient, %amount, "transfer committed");
        Ok(receipt)
    }

    async fn purchase_item(
        &self,
        account: AccountId,
        item: &ItemName,
    ) -> Result<PurchaseReceipt, LedgerStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let receipt = run_in_transaction(&mut conn, |conn| {
            purchase_in_transaction(conn, account, item).scope_boxed()
        })
        .await
        .map_err(|failure| failure.into_port_error("purchase item"))?;
        debug!(%account, %item, quantity = receipt.quantity, "purchase committed");
        Ok(receipt)
    }

    async fn account_id_by_username(
        &self,
        username: &Username,
    ) -> Result<AccountId, LedgerStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        resolve_username(&mut conn, username)
            .await
            .map_err(|error| map_diesel_error(error, "resolve username"))?
            .ok_or_else(|| LedgerStoreError::user_not_found(username.as_str()))
    }

    async fn holdings(&self, account: AccountId) -> Result<Holdings, LedgerStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        load_holdings(&mut conn, account)
            .await
            .map_err(|failure| failure.into_port_error("load holdings"))
    }

    async fn transaction_history(
        &self,
        account: AccountId,
    ) -> Result<TransactionHistory, LedgerStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        load_history(&mut conn, account)
            .await
            .map_err(|failure| failure.into_port_error("load transaction history"))
    }

    async fn aggregate_snapshot(
        &self,
        account: AccountId,
    ) -> Result<(Holdings, TransactionHistory), LedgerStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.build_transaction()
            .repeatable_read()
            .read_only()
            .run(|conn| {
                async move {
                    let holdings = load_holdings(conn, account).await?;
                    let history = load_history(conn, account).await?;
                    Ok((holdings, history))
                }
                .scope_boxed()
            })
            .await
            .map_err(|failure: StoreFailure| failure.into_port_error("load aggregate snapshot"))
    }
}

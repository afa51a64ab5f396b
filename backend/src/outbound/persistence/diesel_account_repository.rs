//! PostgreSQL-backed `AccountRepository` implementation using Diesel.
//!
//! New accounts receive the starting balance from the `accounts.balance`
//! column default, so the adapter never writes a balance itself.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::warn;

use crate::domain::ports::{AccountRepository, AccountRepositoryError};
use crate::domain::{Account, AccountId, CredentialHash, NewAccount, Username};

use super::diesel_helpers::{is_connection_loss, is_unique_violation, log_diesel_error};
use super::models::{AccountRow, NewAccountRow};
use super::pool::{DbPool, PoolError};
use super::schema::accounts;

/// Diesel-backed implementation of the [`AccountRepository`] port.
#[derive(Clone)]
pub struct DieselAccountRepository {
    pool: DbPool,
}

impl DieselAccountRepository {
    /// Create a repository over the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> AccountRepositoryError {
    AccountRepositoryError::connection(error.message())
}

fn map_diesel_error(error: diesel::result::Error, operation: &str) -> AccountRepositoryError {
    log_diesel_error(&error, operation);
    if is_connection_loss(&error) {
        AccountRepositoryError::connection("database connection error")
    } else {
        AccountRepositoryError::query(format!("{operation}: {error}"))
    }
}

fn row_to_account(row: AccountRow) -> Result<Account, AccountRepositoryError> {
    let username = Username::new(row.username).map_err(|err| {
        warn!(account_id = row.id, error = %err, "stored username failed validation");
        AccountRepositoryError::query(format!("invalid stored username: {err}"))
    })?;
    Ok(Account {
        id: AccountId::new(row.id),
        username,
        credential_hash: CredentialHash::new(row.credential_hash),
        balance: row.balance,
        created_at: row.created_at,
    })
}

#[async_trait]
impl AccountRepository for DieselAccountRepository {
    async fn create(&self, account: &NewAccount) -> Result<Account, AccountRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: AccountRow = diesel::insert_into(accounts::table)
            .values(&NewAccountRow {
                username: account.username.as_str(),
                credential_hash: account.credential_hash.as_str(),
            })
            .returning(AccountRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|error| {
                if is_unique_violation(&error) {
                    AccountRepositoryError::duplicate_username(account.username.as_str())
                } else {
                    map_diesel_error(error, "create account")
                }
            })?;

        row_to_account(row)
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<Account>, AccountRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<AccountRow> = accounts::table
            .filter(accounts::username.eq(username.as_str()))
            .select(AccountRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|error| map_diesel_error(error, "find account by username"))?;

        row.map(row_to_account).transpose()
    }
}

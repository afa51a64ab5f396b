//! Port abstraction for account registration and lookup.
//!
//! Registration is driven by the authentication collaborator, which hashes
//! credentials before they reach this port. New accounts start with
//! [`STARTING_BALANCE`](crate::domain::STARTING_BALANCE) coins.
use async_trait::async_trait;

use crate::domain::{Account, NewAccount, Username};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by account repository adapters.
    pub enum AccountRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "account repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "account repository query failed: {message}",
        /// Another account already owns the username.
        DuplicateUsername { username: String } => "username {username} is already taken",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Register a new account with the starting balance.
    async fn create(&self, account: &NewAccount) -> Result<Account, AccountRepositoryError>;

    /// Fetch an account by username.
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<Account>, AccountRepositoryError>;
}

//! Domain-level ledger errors.
//!
//! These errors are transport agnostic. Inbound adapters map them to HTTP
//! statuses, CLI exit codes, or any other protocol-specific envelope through
//! [`LedgerError::code`].
//!
//! Errors fall into three classes:
//! - **domain outcomes** (`InsufficientFunds`, `IncorrectReceiver`,
//!   `UserNotFound`, `ItemNotFound`, `AccountNotFound`) leave ledger state
//!   untouched and are expected business results;
//! - **infrastructure failures** (`StoreUnavailable`, `Store`, `Cache`) are
//!   opaque to callers and also leave ledger state untouched;
//! - **post-commit failures** (`CommittedWithStaleCache`) mean the mutation
//!   committed but a cached view could not be invalidated. Callers must not
//!   resubmit these requests.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ports::{AggregateCacheError, LedgerStoreError};

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request cannot be honoured in the current ledger state.
    InvalidRequest,
    /// A referenced account or item does not exist.
    NotFound,
    /// An unexpected error occurred inside the ledger or its collaborators.
    InternalError,
}

impl ErrorCode {
    /// Whether the failure should be reported as the caller's fault.
    pub const fn is_client_error(self) -> bool {
        matches!(self, Self::InvalidRequest | Self::NotFound)
    }
}

/// Errors returned by the ledger service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Sender or buyer balance does not cover the requested amount.
    #[error("insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: i64, required: i64 },
    /// Transfer recipient is the sender.
    #[error("cannot send coins to yourself")]
    IncorrectReceiver,
    /// No account matches the given username.
    #[error("user {username} not found")]
    UserNotFound { username: String },
    /// No catalog item matches the given name.
    #[error("item {item} not found")]
    ItemNotFound { item: String },
    /// The acting account does not exist.
    #[error("account {account_id} not found")]
    AccountNotFound { account_id: i64 },
    /// The ledger store could not be reached.
    #[error("ledger store unavailable: {message}")]
    StoreUnavailable { message: String },
    /// The ledger store failed while executing a query.
    #[error("ledger store failure: {message}")]
    Store { message: String },
    /// The aggregate cache failed before any mutation took place.
    #[error("aggregate cache failure: {message}")]
    Cache { message: String },
    /// The mutation committed but a cached view could not be invalidated.
    ///
    /// The affected view may stay stale until its time-to-live expires.
    #[error("mutation committed but cached view for account {account_id} is stale: {message}")]
    CommittedWithStaleCache { account_id: i64, message: String },
}

impl LedgerError {
    /// Stable code used by inbound adapters to pick a status.
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InsufficientFunds { .. } | Self::IncorrectReceiver => ErrorCode::InvalidRequest,
            Self::UserNotFound { .. } | Self::ItemNotFound { .. } | Self::AccountNotFound { .. } => {
                ErrorCode::NotFound
            }
            Self::StoreUnavailable { .. }
            | Self::Store { .. }
            | Self::Cache { .. }
            | Self::CommittedWithStaleCache { .. } => ErrorCode::InternalError,
        }
    }

    /// Whether the error is an expected business outcome rather than a fault.
    pub const fn is_domain_outcome(&self) -> bool {
        self.code().is_client_error()
    }

    /// Whether the ledger mutation committed despite the error.
    ///
    /// Only post-commit cache invalidation failures return `true`; every
    /// other error guarantees that no balance, inventory or transaction row
    /// changed.
    pub const fn committed(&self) -> bool {
        matches!(self, Self::CommittedWithStaleCache { .. })
    }
}

impl From<LedgerStoreError> for LedgerError {
    fn from(error: LedgerStoreError) -> Self {
        match error {
            LedgerStoreError::InsufficientFunds { balance, required } => {
                Self::InsufficientFunds { balance, required }
            }
            LedgerStoreError::IncorrectReceiver => Self::IncorrectReceiver,
            LedgerStoreError::UserNotFound { username } => Self::UserNotFound { username },
            LedgerStoreError::ItemNotFound { item } => Self::ItemNotFound { item },
            LedgerStoreError::AccountNotFound { account_id } => Self::AccountNotFound { account_id },
            LedgerStoreError::Connection { message } => Self::StoreUnavailable { message },
            LedgerStoreError::Query { message } => Self::Store { message },
        }
    }
}

impl From<AggregateCacheError> for LedgerError {
    fn from(error: AggregateCacheError) -> Self {
        Self::Cache {
            message: error.to_string(),
        }
    }
}

//! Ledger domain: value types, aggregate views, errors, ports and the
//! orchestrating service.
//!
//! Purpose: keep money movement rules and the cache invalidation protocol
//! independent of Diesel, Redis and any transport. Adapters live in
//! [`crate::outbound`] and plug in through [`ports`].
//!
//! Public surface:
//! - value types from `account` (`AccountId`, `Username`, `CoinAmount`, …);
//! - `AggregateView` and its parts from `aggregate`;
//! - `LedgerError` and `ErrorCode` from `error`;
//! - `LedgerService`, the read-through, write-invalidate orchestrator.

pub mod account;
pub mod aggregate;
pub mod error;
pub mod ledger_service;
pub mod ports;

pub use self::account::{
    Account, AccountId, CoinAmount, CredentialHash, Item, ItemName, LedgerValidationError,
    NAME_MAX, NewAccount, PurchaseReceipt, STARTING_BALANCE, TransferReceipt, Username,
};
pub use self::aggregate::{
    AggregateView, Holdings, InventoryLine, ReceivedTransfer, SentTransfer, TransactionHistory,
};
pub use self::error::{ErrorCode, LedgerError};
pub use self::ledger_service::{DEFAULT_CACHE_TTL, LedgerService};

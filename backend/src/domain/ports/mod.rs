//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Ports describe how the ledger expects to interact with driven adapters
//! (the relational store, the aggregate cache, the account registry) and how
//! inbound adapters drive it. Each driven port exposes strongly typed errors
//! so adapters map their failures into predictable variants.

mod macros;
pub(crate) use macros::define_port_error;

mod account_repository;
mod aggregate_cache;
mod cache_key;
mod ledger_operations;
mod ledger_store;

#[cfg(test)]
pub use account_repository::MockAccountRepository;
pub use account_repository::{AccountRepository, AccountRepositoryError};
#[cfg(test)]
pub use aggregate_cache::MockAggregateCache;
pub use aggregate_cache::{AggregateCache, AggregateCacheError};
pub use cache_key::{AggregateCacheKey, AggregateCacheKeyValidationError};
pub use ledger_operations::LedgerOperations;
#[cfg(test)]
pub use ledger_operations::MockLedgerOperations;
#[cfg(test)]
pub use ledger_store::MockLedgerStore;
pub use ledger_store::{LedgerStore, LedgerStoreError};

//! In-process adapters for the ledger ports.
//!
//! Used by tests and local tooling that must not depend on PostgreSQL or
//! Redis. Behaviour matches the networked adapters, including error variants
//! and the order in which checks run.

mod cache;
mod ledger;

pub use cache::InMemoryAggregateCache;
pub use ledger::{InMemoryLedger, MERCH_CATALOG};

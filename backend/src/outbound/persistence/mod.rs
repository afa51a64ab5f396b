//! PostgreSQL persistence adapters using Diesel.
//!
//! Concrete implementations of the ledger store and account registry ports,
//! backed by `diesel-async` with `bb8` connection pooling.
//!
//! - Adapters only translate between Diesel rows and domain types; the
//!   ledger rules they enforce (locking order, balance checks) live in the
//!   transaction bodies of [`DieselLedgerStore`].
//! - Row structs (`models.rs`) and table definitions (`schema.rs`) stay
//!   private to this module.
//! - Every database error is mapped to the port's error type.
//!
//! ```no_run
//! # async fn connect() -> Result<(), Box<dyn std::error::Error>> {
//! use merch_ledger::outbound::persistence::{DbPool, DieselLedgerStore, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/merch")).await?;
//! let store = DieselLedgerStore::new(pool);
//! # let _ = store;
//! # Ok(())
//! # }
//! ```

mod diesel_account_repository;
pub(crate) mod diesel_helpers;
mod diesel_ledger_store;
mod models;
mod pool;
mod schema;

pub use diesel_account_repository::DieselAccountRepository;
pub use diesel_ledger_store::DieselLedgerStore;
pub use pool::{DbPool, PoolConfig, PoolError};

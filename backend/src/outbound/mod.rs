//! Outbound adapters implementing the ledger's driven ports.
//!
//! - **persistence**: PostgreSQL ledger store and account registry (Diesel)
//! - **cache**: Redis aggregate view cache (`bb8-redis`)
//! - **memory**: in-process versions of both for tests and tooling
//!
//! Adapters translate between domain types and infrastructure
//! representations; the ledger rules they must uphold are stated on the port
//! traits.

pub mod cache;
pub mod memory;
pub mod persistence;

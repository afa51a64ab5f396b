//! Coin ledger, purchase engine and cached aggregate views for the internal
//! merch store.
//!
//! - [`domain`]: value types, errors, ports and the [`domain::LedgerService`]
//! - [`outbound`]: PostgreSQL, Redis and in-memory adapters
//! - [`config`]: OrthoConfig-backed runtime settings

use diesel_migrations::{EmbeddedMigrations, embed_migrations};

pub mod config;
pub mod domain;
pub mod outbound;

/// Schema migrations from `migrations/`, embedded at build time.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

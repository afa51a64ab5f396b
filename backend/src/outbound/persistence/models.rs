//! Internal Diesel row structs for ledger queries.
//!
//! These types never leave the persistence layer; adapters convert them into
//! domain types before returning.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::schema::{accounts, inventory_entries, items, transactions};

/// Row struct for reading from the accounts table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AccountRow {
    pub id: i64,
    pub username: String,
    pub credential_hash: String,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for registering accounts.
///
/// `balance` and `created_at` come from column defaults.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = accounts)]
pub(crate) struct NewAccountRow<'a> {
    pub username: &'a str,
    pub credential_hash: &'a str,
}

/// Row struct for reading catalog items.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ItemRow {
    pub id: i64,
    pub name: String,
    pub price: i64,
}

/// Insertable struct for the first unit of an item in an inventory.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = inventory_entries)]
pub(crate) struct NewInventoryEntryRow {
    pub account_id: i64,
    pub item_id: i64,
    pub quantity: i64,
}

/// Insertable struct for transfer records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = transactions)]
pub(crate) struct NewTransactionRow {
    pub from_id: i64,
    pub to_id: i64,
    pub amount: i64,
}

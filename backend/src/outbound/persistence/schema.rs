//! Diesel table definitions for the ledger schema.
//!
//! These definitions must match `migrations/` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Registered accounts and their coin balances.
    accounts (id) {
        id -> Int8,
        /// Unique login name (max 64 characters).
        username -> Varchar,
        /// Hash owned by the authentication collaborator.
        credential_hash -> Text,
        /// Current balance; `CHECK (balance >= 0)`.
        balance -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Merch catalog. Seeded by the initial migration.
    items (id) {
        id -> Int8,
        name -> Varchar,
        /// Price in coins; `CHECK (price > 0)`.
        price -> Int8,
    }
}

diesel::table! {
    /// Items owned per account.
    ///
    /// Composite primary key `(account_id, item_id)`; purchases upsert on it.
    inventory_entries (account_id, item_id) {
        account_id -> Int8,
        item_id -> Int8,
        /// Units owned; `CHECK (quantity >= 1)`.
        quantity -> Int8,
    }
}

diesel::table! {
    /// Append-only coin transfer records.
    transactions (id) {
        id -> Int8,
        /// Sender account.
        from_id -> Int8,
        /// Recipient account; `CHECK (from_id <> to_id)`.
        to_id -> Int8,
        /// Coins moved; `CHECK (amount > 0)`.
        amount -> Int8,
        occurred_at -> Timestamptz,
    }
}

diesel::joinable!(inventory_entries -> accounts (account_id));
diesel::joinable!(inventory_entries -> items (item_id));

diesel::allow_tables_to_appear_in_same_query!(accounts, items, inventory_entries, transactions);

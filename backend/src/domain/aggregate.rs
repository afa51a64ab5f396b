//! Aggregate view served to readers: balance, inventory and coin history.
//!
//! The view is a derived projection. It is never authoritative and can always
//! be rebuilt from the ledger store, which is why the cache may drop it at
//! any time.
//!
//! ## Ordering
//! - Inventory lines are ordered by item name.
//! - `received` and `sent` transfers are ordered chronologically, oldest
//!   first, with the record identifier breaking timestamp ties.

use serde::{Deserialize, Serialize};

/// Quantity of one catalog item owned by an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLine {
    /// Item name.
    #[serde(rename = "type")]
    pub item: String,
    /// Number of units owned; at least one.
    pub quantity: i64,
}

/// Transfer credited to the viewing account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedTransfer {
    /// Username of the sender.
    pub from_user: String,
    /// Coins received.
    pub amount: i64,
}

/// Transfer debited from the viewing account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentTransfer {
    /// Username of the recipient.
    pub to_user: String,
    /// Coins sent.
    pub amount: i64,
}

/// Both directions of an account's transfer history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHistory {
    /// Transfers where the account is the recipient.
    pub received: Vec<ReceivedTransfer>,
    /// Transfers where the account is the sender.
    pub sent: Vec<SentTransfer>,
}

/// Balance and inventory read in one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Holdings {
    /// Current balance.
    pub balance: i64,
    /// Owned items ordered by name.
    pub inventory: Vec<InventoryLine>,
}

/// Cacheable per-account projection.
///
/// # Examples
/// ```
/// use merch_ledger::domain::{AggregateView, Holdings, TransactionHistory};
///
/// let view = AggregateView::compose(
///     Holdings { balance: 700, inventory: Vec::new() },
///     TransactionHistory::default(),
/// );
/// assert_eq!(view.coins, 700);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateView {
    /// Current balance.
    pub coins: i64,
    /// Owned items ordered by name.
    pub inventory: Vec<InventoryLine>,
    /// Transfers in both directions.
    pub coin_history: TransactionHistory,
}

impl AggregateView {
    /// Combine the two store reads into a view.
    pub fn compose(holdings: Holdings, coin_history: TransactionHistory) -> Self {
        let Holdings { balance, inventory } = holdings;
        Self {
            coins: balance,
            inventory,
            coin_history,
        }
    }
}

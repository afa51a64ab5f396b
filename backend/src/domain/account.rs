//! Account identity and coin value types.
//!
//! These newtypes keep invalid ledger input out of the store: usernames and
//! item names are validated once at the edge, and transfer amounts cannot be
//! constructed unless they are strictly positive.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Balance granted to every account at registration.
pub const STARTING_BALANCE: i64 = 1000;

/// Maximum length accepted for usernames and catalog item names.
pub const NAME_MAX: usize = 64;

/// Validation errors raised by the ledger value types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerValidationError {
    /// Name is empty after trimming whitespace.
    #[error("{field} must not be empty")]
    EmptyName { field: &'static str },
    /// Name carries leading or trailing whitespace.
    #[error("{field} must not contain surrounding whitespace")]
    PaddedName { field: &'static str },
    /// Name exceeds [`NAME_MAX`] characters.
    #[error("{field} must be at most {max} characters")]
    NameTooLong { field: &'static str, max: usize },
    /// Coin amounts must be strictly positive.
    #[error("coin amount must be positive, got {amount}")]
    NonPositiveAmount { amount: i64 },
}

fn validate_name(field: &'static str, raw: &str) -> Result<(), LedgerValidationError> {
    if raw.trim().is_empty() {
        return Err(LedgerValidationError::EmptyName { field });
    }
    if raw.trim() != raw {
        return Err(LedgerValidationError::PaddedName { field });
    }
    if raw.chars().count() > NAME_MAX {
        return Err(LedgerValidationError::NameTooLong {
            field,
            max: NAME_MAX,
        });
    }
    Ok(())
}

/// Stable account identifier assigned by the ledger store.
///
/// Identifiers are totally ordered; the store locks account rows in
/// ascending identifier order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(i64);

impl AccountId {
    /// Wrap a raw identifier.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Access the raw identifier.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for AccountId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Unique login name of an account.
///
/// # Examples
/// ```
/// use merch_ledger::domain::Username;
///
/// let name = Username::new("alice").expect("valid username");
/// assert_eq!(name.as_str(), "alice");
/// assert!(Username::new(" alice").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Validate and construct a username.
    pub fn new(value: impl Into<String>) -> Result<Self, LedgerValidationError> {
        let raw = value.into();
        validate_name("username", &raw)?;
        Ok(Self(raw))
    }

    /// Borrow the username as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl TryFrom<String> for Username {
    type Error = LedgerValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Name of a catalog item, e.g. `"cup"` or `"pink-hoody"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemName(String);

impl ItemName {
    /// Validate and construct an item name.
    pub fn new(value: impl Into<String>) -> Result<Self, LedgerValidationError> {
        let raw = value.into();
        validate_name("item name", &raw)?;
        Ok(Self(raw))
    }

    /// Borrow the item name as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ItemName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for ItemName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<ItemName> for String {
    fn from(value: ItemName) -> Self {
        value.0
    }
}

impl TryFrom<String> for ItemName {
    type Error = LedgerValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Strictly positive number of coins moved by a transfer.
///
/// # Examples
/// ```
/// use merch_ledger::domain::CoinAmount;
///
/// assert_eq!(CoinAmount::new(300).map(CoinAmount::get), Ok(300));
/// assert!(CoinAmount::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct CoinAmount(i64);

impl CoinAmount {
    /// Validate and construct an amount.
    pub const fn new(amount: i64) -> Result<Self, LedgerValidationError> {
        if amount <= 0 {
            return Err(LedgerValidationError::NonPositiveAmount { amount });
        }
        Ok(Self(amount))
    }

    /// Access the raw number of coins.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for CoinAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<CoinAmount> for i64 {
    fn from(value: CoinAmount) -> Self {
        value.0
    }
}

impl TryFrom<i64> for CoinAmount {
    type Error = LedgerValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Opaque credential hash produced by the authentication collaborator.
///
/// The ledger stores it verbatim and never inspects it.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialHash(String);

impl CredentialHash {
    /// Wrap an already-computed hash.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the stored hash.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for CredentialHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialHash(..)")
    }
}

/// Registered ledger account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Store-assigned identifier.
    pub id: AccountId,
    /// Unique login name.
    pub username: Username,
    /// Hash owned by the authentication collaborator.
    pub credential_hash: CredentialHash,
    /// Current coin balance; never negative.
    pub balance: i64,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}

/// Registration request for a new account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    /// Desired unique login name.
    pub username: Username,
    /// Hash produced by the authentication collaborator.
    pub credential_hash: CredentialHash,
}

/// Catalog entry available for purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Store-assigned identifier.
    pub id: i64,
    /// Unique item name.
    pub name: ItemName,
    /// Price in coins; always positive.
    pub price: i64,
}

/// Outcome of a committed coin transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    /// Account debited by the transfer.
    pub sender: AccountId,
    /// Account credited by the transfer, resolved inside the transaction.
    pub recipient: AccountId,
    /// Coins moved.
    pub amount: CoinAmount,
}

/// Outcome of a committed purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseReceipt {
    /// Buyer.
    pub account: AccountId,
    /// Purchased item.
    pub item: ItemName,
    /// Coins deducted from the buyer.
    pub price: i64,
    /// Inventory quantity of the item after the purchase.
    pub quantity: i64,
}

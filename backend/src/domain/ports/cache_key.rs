//! Cache key type shared by aggregate cache adapters.
use std::fmt;

use thiserror::Error;

use crate::domain::AccountId;

/// Cache key under which an account's aggregate view is stored.
///
/// Keys produced by [`AggregateCacheKey::for_account`] follow the fixed
/// `account:<id>:info` layout, so every writer derives the same key for the
/// same account.
///
/// # Examples
/// ```
/// use merch_ledger::domain::AccountId;
/// use merch_ledger::domain::ports::AggregateCacheKey;
///
/// let key = AggregateCacheKey::for_account(AccountId::new(42));
/// assert_eq!(key.as_str(), "account:42:info");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregateCacheKey(String);

impl AggregateCacheKey {
    /// Derive the key holding the aggregate view of `account`.
    pub fn for_account(account: AccountId) -> Self {
        Self(format!("account:{account}:info"))
    }

    /// Construct a key after validating that it is non-empty and trimmed.
    pub fn new(value: impl Into<String>) -> Result<Self, AggregateCacheKeyValidationError> {
        let raw = value.into();
        if raw.trim().is_empty() {
            return Err(AggregateCacheKeyValidationError::Empty);
        }
        if raw.trim() != raw {
            return Err(AggregateCacheKeyValidationError::ContainsWhitespace);
        }
        Ok(Self(raw))
    }

    /// Borrow the underlying key as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for AggregateCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for AggregateCacheKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Validation errors returned when constructing [`AggregateCacheKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateCacheKeyValidationError {
    /// Key is empty after trimming whitespace.
    #[error("aggregate cache key must not be empty")]
    Empty,
    /// Key contains leading or trailing whitespace.
    #[error("aggregate cache key must not contain surrounding whitespace")]
    ContainsWhitespace,
}

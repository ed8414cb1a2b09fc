//! Typed identifiers and the decimal identifier generator.
//!
//! Accounts, cards and ledger entries are keyed by random fixed-width decimal
//! strings. Wrapping them prevents passing a `CardId` where an `AccountId` is
//! expected.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Digits in an account identifier.
pub const ACCOUNT_ID_DIGITS: usize = 16;
/// Digits in a card identifier.
pub const CARD_ID_DIGITS: usize = 16;
/// Digits in a ledger entry identifier.
pub const ENTRY_ID_DIGITS: usize = 13;
/// Digits in a card verification code.
pub const CARD_CVC_DIGITS: usize = 3;

/// Maximum length of an owner (national) identifier.
pub const OWNER_ID_MAX_LEN: usize = 10;

/// Errors raised when parsing an identifier from untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// Wrong number of digits.
    #[error("expected {expected} digits, got {actual}")]
    WrongLength {
        /// Required width.
        expected: usize,
        /// Width of the rejected value.
        actual: usize,
    },

    /// Contains something other than ASCII digits, or starts with zero.
    #[error("identifier must be decimal digits without a leading zero")]
    NotDecimal,

    /// Owner identifier is empty, too long, or not alphanumeric.
    #[error("invalid owner identifier")]
    InvalidOwner,

    /// Numeric identifier could not be parsed.
    #[error("invalid numeric identifier: {0}")]
    NotNumeric(String),
}

/// Returns an `n`-digit decimal string drawn uniformly at random.
///
/// The first digit is in `1..=9` and every other digit in `0..=9`, so the value
/// never carries a leading zero. `n == 0` yields an empty string.
///
/// Values can collide; callers persisting one as a primary key must retry on a
/// uniqueness violation.
#[must_use]
pub fn new_identifier(n: usize) -> String {
    let mut rng = rand::rng();
    let mut out = String::with_capacity(n);
    for position in 0..n {
        let digit: u8 = if position == 0 {
            rng.random_range(1..=9)
        } else {
            rng.random_range(0..=9)
        };
        out.push(char::from(b'0' + digit));
    }
    out
}

/// Checks that `value` is exactly `digits` decimal digits with no leading zero.
///
/// # Errors
///
/// Returns `IdError` describing the first violated rule.
pub fn check_decimal_identifier(value: &str, digits: usize) -> Result<(), IdError> {
    if value.len() != digits {
        return Err(IdError::WrongLength {
            expected: digits,
            actual: value.len(),
        });
    }
    if !value.bytes().all(|b| b.is_ascii_digit()) || value.starts_with('0') {
        return Err(IdError::NotDecimal);
    }
    Ok(())
}

/// Macro to generate fixed-width decimal identifier wrappers.
macro_rules! decimal_id {
    ($name:ident, $digits:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Number of digits in this identifier.
            pub const DIGITS: usize = $digits;

            /// Draws a fresh random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(new_identifier(Self::DIGITS))
            }

            /// Wraps a value read back from storage without re-validating it.
            #[must_use]
            pub fn from_stored(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                check_decimal_identifier(s, Self::DIGITS)?;
                Ok(Self(s.to_string()))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

/// Macro to generate integer-keyed reference data identifiers.
macro_rules! numeric_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i32);

        impl $name {
            /// Returns the inner value.
            #[must_use]
            pub const fn into_inner(self) -> i32 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<i32>()
                    .map(Self)
                    .map_err(|_| IdError::NotNumeric(s.to_string()))
            }
        }
    };
}

decimal_id!(AccountId, ACCOUNT_ID_DIGITS, "Identifier of a bank account.");
decimal_id!(CardId, CARD_ID_DIGITS, "Identifier of a card tied to an account.");
decimal_id!(EntryId, ENTRY_ID_DIGITS, "Identifier of an immutable ledger entry.");

numeric_id!(BankId, "Identifier of a bank.");
numeric_id!(ServiceId, "Identifier of a payable service.");

/// National identifier of the person owning an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Validates and wraps an owner identifier.
    ///
    /// # Errors
    ///
    /// Returns `IdError::InvalidOwner` unless the value is 1 to 10 ASCII
    /// alphanumeric characters.
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        if value.is_empty()
            || value.len() > OWNER_ID_MAX_LEN
            || !value.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return Err(IdError::InvalidOwner);
        }
        Ok(Self(value))
    }

    /// Wraps a value read back from storage without re-validating it.
    #[must_use]
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for OwnerId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

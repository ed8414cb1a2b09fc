//! Credentials.
//!
//! This module provides:
//! - Password and PIN hashing with Argon2id
//! - The special-PIN gate run before every money-moving request
//! - User role definitions

mod password;
mod pin;

pub use password::{PasswordError, hash_password, verify_password};
pub use pin::verify_special_pin;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Role of a registered user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Bank staff.
    Admin,
    /// Account holder.
    #[default]
    User,
}

impl UserRole {
    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!(UserRole::default(), UserRole::User);
        assert_eq!(UserRole::User.to_string(), "user");
        assert!("root".parse::<UserRole>().is_err());
    }
}

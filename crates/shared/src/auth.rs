//! Session token claims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::OwnerId;

/// JWT claims carried by a bearer session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (owner identifier).
    pub sub: String,
    /// Unique token id, so two sessions issued in the same second differ.
    pub jti: Uuid,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for an owner.
    #[must_use]
    pub fn new(owner_id: &OwnerId, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: owner_id.as_str().to_string(),
            jti: Uuid::new_v4(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the owner identifier from claims.
    #[must_use]
    pub fn owner_id(&self) -> OwnerId {
        OwnerId::from_stored(self.sub.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_claims_new_sets_fields() {
        let owner = OwnerId::new("V1234567").unwrap();
        let now = Utc::now();
        let claims = Claims::new(&owner, now, now + Duration::minutes(15));

        assert_eq!(claims.sub, "V1234567");
        assert_eq!(claims.owner_id(), owner);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_claims_have_distinct_token_ids() {
        let owner = OwnerId::new("V1234567").unwrap();
        let now = Utc::now();
        let a = Claims::new(&owner, now, now);
        let b = Claims::new(&owner, now, now);
        assert_ne!(a.jti, b.jti);
    }
}

//! Bounded retry for inserts keyed by a randomly drawn identifier.

use std::future::Future;

use tracing::debug;

use super::error::LedgerError;
use super::store::StoreError;

/// Default number of identifiers drawn before giving up.
pub const DEFAULT_IDENTIFIER_ATTEMPTS: u32 = 5;

/// How many fresh identifiers to try on primary key collisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentifierPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
}

impl Default for IdentifierPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_IDENTIFIER_ATTEMPTS,
        }
    }
}

impl IdentifierPolicy {
    /// Creates a policy with at least one attempt.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Runs `insert` on `value`, calling `regenerate` and retrying whenever
    /// the store reports the identifier as taken.
    ///
    /// Returns the value as finally stored.
    ///
    /// # Errors
    ///
    /// `LedgerError::IdentifierExhausted` when every attempt collided; any
    /// other store error is converted and returned immediately.
    pub async fn insert_with_fresh_id<T, I, Fut>(
        &self,
        kind: &'static str,
        mut value: T,
        regenerate: fn(&mut T),
        mut insert: I,
    ) -> Result<T, LedgerError>
    where
        T: Clone,
        I: FnMut(T) -> Fut,
        Fut: Future<Output = Result<(), StoreError>>,
    {
        for attempt in 1..=self.max_attempts {
            match insert(value.clone()).await {
                Ok(()) => return Ok(value),
                Err(StoreError::DuplicateId(key)) => {
                    debug!(kind, attempt, %key, "identifier collision, drawing a new one");
                    regenerate(&mut value);
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(LedgerError::IdentifierExhausted {
            kind,
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Clone)]
    struct Row(u32);

    fn bump(row: &mut Row) {
        row.0 += 1;
    }

    #[tokio::test]
    async fn test_retries_until_free_identifier() {
        let policy = IdentifierPolicy::new(5);
        let stored = policy
            .insert_with_fresh_id("row", Row(0), bump, |row| async move {
                if row.0 < 2 {
                    Err(StoreError::DuplicateId(row.0.to_string()))
                } else {
                    Ok(())
                }
            })
            .await
            .unwrap();

        assert_eq!(stored.0, 2);
    }

    #[tokio::test]
    async fn test_exhausts_after_bound() {
        let calls = AtomicU32::new(0);
        let policy = IdentifierPolicy::new(3);
        let result = policy
            .insert_with_fresh_id("row", Row(0), bump, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(StoreError::DuplicateId("taken".into())) }
            })
            .await;

        assert!(matches!(
            result,
            Err(LedgerError::IdentifierExhausted { kind: "row", attempts: 3 })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result = IdentifierPolicy::default()
            .insert_with_fresh_id("row", Row(0), bump, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(StoreError::Backend("down".into())) }
            })
            .await;

        assert!(matches!(result, Err(LedgerError::PersistenceFailure(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_policy_has_at_least_one_attempt() {
        assert_eq!(IdentifierPolicy::new(0).max_attempts, 1);
    }
}

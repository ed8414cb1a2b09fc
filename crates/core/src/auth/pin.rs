//! Special-PIN gate for money-moving requests.

use crate::ledger::LedgerError;

use super::password::verify_password;

/// Checks the special PIN supplied with a transfer against the stored hash.
///
/// Runs before the transfer engine; when it fails the engine is never called.
/// The supplied value is compared exactly as sent, whitespace included.
///
/// # Errors
///
/// - `LedgerError::InvalidRequest` if no PIN was supplied
/// - `LedgerError::Unauthorized` if the account has no PIN or it does not match
/// - `LedgerError::Internal` if the stored hash is unreadable
pub fn verify_special_pin(
    stored_hash: Option<&str>,
    supplied: Option<&str>,
) -> Result<(), LedgerError> {
    let supplied = supplied
        .filter(|pin| !pin.is_empty())
        .ok_or_else(|| LedgerError::InvalidRequest("special PIN is required".to_string()))?;

    let Some(stored_hash) = stored_hash else {
        return Err(LedgerError::Unauthorized(
            "no special PIN has been set for this account".to_string(),
        ));
    };

    match verify_password(supplied, stored_hash) {
        Ok(true) => Ok(()),
        Ok(false) => Err(LedgerError::Unauthorized(
            "special PIN is incorrect".to_string(),
        )),
        Err(e) => Err(LedgerError::Internal(e.to_string())),
    }
}

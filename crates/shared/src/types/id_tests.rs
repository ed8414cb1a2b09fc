use super::*;
use proptest::prelude::*;
use rstest::rstest;
use std::str::FromStr;

#[rstest]
#[case(1)]
#[case(3)]
#[case(13)]
#[case(16)]
fn test_new_identifier_width(#[case] n: usize) {
    let id = new_identifier(n);
    assert_eq!(id.len(), n);
    assert!(check_decimal_identifier(&id, n).is_ok());
}

#[test]
fn test_new_identifier_zero_width() {
    assert!(new_identifier(0).is_empty());
}

#[test]
fn test_generated_ids_have_declared_width() {
    assert_eq!(AccountId::generate().as_str().len(), 16);
    assert_eq!(CardId::generate().as_str().len(), 16);
    assert_eq!(EntryId::generate().as_str().len(), 13);
}

#[test]
fn test_account_id_from_str() {
    let id = AccountId::from_str("1234567890123456").unwrap();
    assert_eq!(id.to_string(), "1234567890123456");
}

#[rstest]
#[case("123")]
#[case("0234567890123456")]
#[case("12345678901234a6")]
#[case("")]
fn test_account_id_from_str_rejects(#[case] raw: &str) {
    assert!(AccountId::from_str(raw).is_err());
}

#[test]
fn test_wrong_length_error_reports_widths() {
    let err = EntryId::from_str("12").unwrap_err();
    assert_eq!(
        err,
        IdError::WrongLength {
            expected: 13,
            actual: 2
        }
    );
}

#[test]
fn test_numeric_ids() {
    assert_eq!(BankId::from_str(" 7 ").unwrap(), BankId(7));
    assert_eq!(ServiceId::from_str("12").unwrap().into_inner(), 12);
    assert!(BankId::from_str("seven").is_err());
}

#[test]
fn test_owner_id_validation() {
    assert!(OwnerId::new("V12345678").is_ok());
    assert!(OwnerId::new("").is_err());
    assert!(OwnerId::new("12345678901").is_err());
    assert!(OwnerId::new("12 34").is_err());
}

#[test]
fn test_ids_serialize_transparently() {
    let id = AccountId::from_stored("1111222233334444");
    assert_eq!(
        serde_json::to_string(&id).unwrap(),
        "\"1111222233334444\""
    );
}

proptest! {
    #[test]
    fn prop_identifier_never_has_leading_zero(n in 1usize..32) {
        let id = new_identifier(n);
        prop_assert_eq!(id.len(), n);
        prop_assert!(!id.starts_with('0'));
        prop_assert!(id.bytes().all(|b| b.is_ascii_digit()));
    }
}

//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod bank;
pub mod beneficiary;
pub mod ledger;
pub mod session;
pub mod user;

pub use bank::BankRepository;
pub use beneficiary::{BeneficiaryError, BeneficiaryRepository};
pub use ledger::SeaOrmLedgerStore;
pub use session::SessionRepository;
pub use user::{NewUser, RegistrationError, UserRepository};

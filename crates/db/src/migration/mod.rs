//! Database migrations.
//!
//! Migrations are managed using sea-orm-migration.

pub use sea_orm_migration::prelude::*;

mod m20260301_000001_initial;
mod m20260301_000002_sessions;
mod m20260301_000003_reference_data;
mod m20260301_000004_beneficiaries;

/// Migrator for running database migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_initial::Migration),
            Box::new(m20260301_000002_sessions::Migration),
            Box::new(m20260301_000003_reference_data::Migration),
            Box::new(m20260301_000004_beneficiaries::Migration),
        ]
    }
}

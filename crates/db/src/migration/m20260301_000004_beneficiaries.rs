//! Frequent beneficiaries saved by customers.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(BENEFICIARIES_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TABLE IF EXISTS beneficiaries CASCADE;")
            .await?;
        Ok(())
    }
}

const BENEFICIARIES_SQL: &str = r"
CREATE TABLE beneficiaries (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    owner_id VARCHAR(10) NOT NULL REFERENCES users(owner_id) ON DELETE CASCADE,
    alias VARCHAR(60) NOT NULL,
    account_id VARCHAR(16) NOT NULL REFERENCES accounts(id),
    beneficiary_owner_id VARCHAR(10) NOT NULL REFERENCES users(owner_id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_beneficiaries_owner_account UNIQUE (owner_id, account_id),
    CONSTRAINT chk_alias_not_blank CHECK (length(trim(alias)) > 0)
);

CREATE INDEX idx_beneficiaries_owner ON beneficiaries(owner_id, created_at);
";

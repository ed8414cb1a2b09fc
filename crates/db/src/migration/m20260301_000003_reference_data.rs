//! Seeds banks and payable services.
//!
//! Every service settles into an account held by a system user. System users
//! carry an unusable password hash, so they cannot log in.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(BANKS_SQL).await?;
        db.execute_unprepared(SERVICE_ACCOUNTS_SQL).await?;
        db.execute_unprepared(SERVICES_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            r"
DELETE FROM services WHERE id IN (1, 2, 3, 4);
DELETE FROM accounts WHERE owner_id IN ('SVCWATER', 'SVCPOWER', 'SVCPHONE', 'SVCNET')
    AND NOT EXISTS (
        SELECT 1 FROM ledger_entries e
        WHERE e.beneficiary_account_id = accounts.id OR e.source_account_id = accounts.id
    );
DELETE FROM users WHERE owner_id IN ('SVCWATER', 'SVCPOWER', 'SVCPHONE', 'SVCNET')
    AND NOT EXISTS (SELECT 1 FROM accounts a WHERE a.owner_id = users.owner_id);
",
        )
        .await?;
        Ok(())
    }
}

const BANKS_SQL: &str = r"
INSERT INTO banks (id, name, kind, currency) VALUES
    (1, 'LedgerBank', 'universal', 'USD'),
    (2, 'Northwind Savings', 'savings', 'USD'),
    (3, 'Harbor Cooperative', 'cooperative', 'USD'),
    (4, 'Summit Commercial', 'commercial', 'USD')
ON CONFLICT (id) DO NOTHING;
";

const SERVICE_ACCOUNTS_SQL: &str = r"
INSERT INTO users (owner_id, first_name, last_name, username, email, role, password_hash) VALUES
    ('SVCWATER', 'Water', 'Utility', 'svc-water', 'water@services.ledgerbank.local', 'admin', '!'),
    ('SVCPOWER', 'Power', 'Utility', 'svc-power', 'power@services.ledgerbank.local', 'admin', '!'),
    ('SVCPHONE', 'Mobile', 'Carrier', 'svc-phone', 'phone@services.ledgerbank.local', 'admin', '!'),
    ('SVCNET', 'Internet', 'Provider', 'svc-net', 'net@services.ledgerbank.local', 'admin', '!')
ON CONFLICT (owner_id) DO NOTHING;

INSERT INTO accounts (id, owner_id, bank_id, balance, initial_balance) VALUES
    ('9000000000000001', 'SVCWATER', 1, 0, 0),
    ('9000000000000002', 'SVCPOWER', 1, 0, 0),
    ('9000000000000003', 'SVCPHONE', 1, 0, 0),
    ('9000000000000004', 'SVCNET', 1, 0, 0)
ON CONFLICT (id) DO NOTHING;
";

const SERVICES_SQL: &str = r"
INSERT INTO services (id, description, field_label, minimum_amount, beneficiary_account_id) VALUES
    (1, 'Water supply', 'Contract number', 5.00, '9000000000000001'),
    (2, 'Electricity', 'Meter number', 10.00, '9000000000000002'),
    (3, 'Mobile phone top-up', 'Phone number', 1.00, '9000000000000003'),
    (4, 'Home internet', 'Customer code', 15.00, '9000000000000004')
ON CONFLICT (id) DO NOTHING;
";

//! Initial database migration.
//!
//! Creates the reference tables, users, accounts, cards and the append-only
//! ledger, together with the trigger that keeps ledger entries immutable.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: REFERENCE DATA
        // ============================================================
        db.execute_unprepared(BANKS_SQL).await?;

        // ============================================================
        // PART 2: CUSTOMERS & ACCOUNTS
        // ============================================================
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(CARDS_SQL).await?;
        db.execute_unprepared(SERVICES_SQL).await?;

        // ============================================================
        // PART 3: LEDGER
        // ============================================================
        db.execute_unprepared(LEDGER_ENTRIES_SQL).await?;
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const BANKS_SQL: &str = r"
CREATE TABLE banks (
    id INTEGER PRIMARY KEY,
    name VARCHAR(100) NOT NULL,
    kind VARCHAR(50) NOT NULL,
    currency CHAR(3) NOT NULL
);
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    owner_id VARCHAR(10) PRIMARY KEY,
    first_name VARCHAR(100) NOT NULL,
    last_name VARCHAR(100) NOT NULL,
    username VARCHAR(50) NOT NULL,
    email VARCHAR(255) NOT NULL,
    phone VARCHAR(30) NOT NULL DEFAULT '',
    address TEXT NOT NULL DEFAULT '',
    role VARCHAR(10) NOT NULL DEFAULT 'user',
    password_hash TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_users_username UNIQUE (username),
    CONSTRAINT uq_users_email UNIQUE (email),
    CONSTRAINT chk_owner_id_format CHECK (owner_id ~ '^[A-Za-z0-9]{1,10}$'),
    CONSTRAINT chk_role CHECK (role IN ('admin', 'user'))
);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id CHAR(16) PRIMARY KEY,
    owner_id VARCHAR(10) NOT NULL REFERENCES users(owner_id),
    bank_id INTEGER NOT NULL REFERENCES banks(id),
    balance NUMERIC(19, 4) NOT NULL,
    initial_balance NUMERIC(19, 4) NOT NULL,
    special_pin_hash TEXT,
    version BIGINT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_accounts_owner UNIQUE (owner_id),
    CONSTRAINT chk_account_id_format CHECK (id ~ '^[1-9][0-9]{15}$'),
    CONSTRAINT chk_balance_non_negative CHECK (balance >= 0),
    CONSTRAINT chk_initial_balance_non_negative CHECK (initial_balance >= 0)
);

CREATE INDEX idx_accounts_bank ON accounts(bank_id);
";

const CARDS_SQL: &str = r"
CREATE TABLE cards (
    id CHAR(16) PRIMARY KEY,
    account_id CHAR(16) NOT NULL REFERENCES accounts(id),
    card_type VARCHAR(10) NOT NULL,
    balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    cvc CHAR(3) NOT NULL,
    expires_at TIMESTAMPTZ NOT NULL,
    issued_at TIMESTAMPTZ NOT NULL,
    version BIGINT NOT NULL DEFAULT 0,
    CONSTRAINT chk_card_id_format CHECK (id ~ '^[1-9][0-9]{15}$'),
    CONSTRAINT chk_card_type CHECK (card_type IN ('credit', 'debit')),
    CONSTRAINT chk_card_balance_non_negative CHECK (balance >= 0),
    CONSTRAINT chk_card_expiry CHECK (expires_at > issued_at)
);

CREATE INDEX idx_cards_account ON cards(account_id, issued_at);
";

const SERVICES_SQL: &str = r"
CREATE TABLE services (
    id INTEGER PRIMARY KEY,
    description VARCHAR(255) NOT NULL,
    field_label VARCHAR(100) NOT NULL,
    minimum_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    beneficiary_account_id CHAR(16) NOT NULL REFERENCES accounts(id),
    CONSTRAINT chk_minimum_non_negative CHECK (minimum_amount >= 0)
);
";

const LEDGER_ENTRIES_SQL: &str = r"
CREATE TABLE ledger_entries (
    id CHAR(13) PRIMARY KEY,
    source_account_id CHAR(16) NOT NULL REFERENCES accounts(id),
    beneficiary_account_id CHAR(16) REFERENCES accounts(id),
    card_id CHAR(16) REFERENCES cards(id),
    amount NUMERIC(19, 4) NOT NULL,
    kind VARCHAR(20) NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    recorded_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT chk_entry_id_format CHECK (id ~ '^[1-9][0-9]{12}$'),
    CONSTRAINT chk_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_entry_kind CHECK (kind IN ('transfer', 'payment', 'transfer-tdc'))
);

-- Movements and statements read by account on either side, ordered by time
CREATE INDEX idx_entries_source ON ledger_entries(source_account_id, recorded_at, id);
CREATE INDEX idx_entries_beneficiary ON ledger_entries(beneficiary_account_id, recorded_at, id)
    WHERE beneficiary_account_id IS NOT NULL;
CREATE INDEX idx_entries_card ON ledger_entries(card_id, recorded_at, id)
    WHERE card_id IS NOT NULL;
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_ledger_entry_change
-- Committed entries are history; corrections are new entries.
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_ledger_entry_change()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'ledger entry % is immutable', OLD.id
        USING ERRCODE = 'restrict_violation';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_ledger_entries_immutable
BEFORE UPDATE OR DELETE ON ledger_entries
FOR EACH ROW
EXECUTE FUNCTION prevent_ledger_entry_change();
";

const DROP_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_ledger_entries_immutable ON ledger_entries;
DROP FUNCTION IF EXISTS prevent_ledger_entry_change();
DROP TABLE IF EXISTS ledger_entries CASCADE;
DROP TABLE IF EXISTS services CASCADE;
DROP TABLE IF EXISTS cards CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
DROP TABLE IF EXISTS users CASCADE;
DROP TABLE IF EXISTS banks CASCADE;
";

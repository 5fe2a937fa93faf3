//! Schema for the PostgreSQL store

use sqlx::PgPool;

pub const CREATE_ACCOUNTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS accounts_tb (
    account_id   UUID PRIMARY KEY,
    user_id      UUID NOT NULL,
    currency     VARCHAR(8) NOT NULL,
    status       SMALLINT NOT NULL DEFAULT 1,
    balance      BIGINT NOT NULL DEFAULT 0,
    created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

pub const CREATE_TRANSACTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS transactions_tb (
    transaction_id   UUID PRIMARY KEY,
    user_id          UUID NOT NULL,
    account_id       UUID NOT NULL,
    amount           BIGINT NOT NULL,
    currency         VARCHAR(8) NOT NULL,
    reference_id     UUID NOT NULL UNIQUE,
    status           SMALLINT NOT NULL,
    transaction_type SMALLINT NOT NULL,
    metadata         JSONB NOT NULL,
    created_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at       TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

pub const CREATE_TRANSACTIONS_ACCOUNT_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions_tb (account_id)
"#;

pub const CREATE_BALANCE_OPS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS balance_ops_tb (
    reference_id UUID NOT NULL,
    direction    SMALLINT NOT NULL,
    account_id   UUID NOT NULL,
    amount       BIGINT NOT NULL,
    created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (reference_id, direction)
)
"#;

/// Create all tables; safe to run repeatedly
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Initializing transfer schema...");

    for ddl in [
        CREATE_ACCOUNTS_TABLE,
        CREATE_TRANSACTIONS_TABLE,
        CREATE_TRANSACTIONS_ACCOUNT_INDEX,
        CREATE_BALANCE_OPS_TABLE,
    ] {
        sqlx::query(ddl).execute(pool).await?;
    }

    tracing::info!("Transfer schema ready");
    Ok(())
}

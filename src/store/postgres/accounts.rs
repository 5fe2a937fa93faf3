//! Account service backed by `accounts_tb`

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::account::{Account, AccountService, AccountStatus, BalanceDirection, BalanceUpdate};
use crate::core_types::{AccountId, ReferenceId};
use crate::service_error::ServiceError;

pub struct PgAccountService {
    pool: PgPool,
}

impl PgAccountService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert an account row (fixtures, provisioning)
    pub async fn create(&self, account: &Account) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO accounts_tb (account_id, user_id, currency, status, balance)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(account.id)
        .bind(account.user_id)
        .bind(&account.currency)
        .bind(account.status.id())
        .bind(account.balance)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_account(row: &PgRow) -> Result<Account, ServiceError> {
        Ok(Account {
            id: row.try_get("account_id")?,
            user_id: row.try_get("user_id")?,
            currency: row.try_get("currency")?,
            status: AccountStatus::from(row.try_get::<i16, _>("status")?),
            balance: row.try_get("balance")?,
        })
    }
}

#[async_trait]
impl AccountService for PgAccountService {
    async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>, ServiceError> {
        let row = sqlx::query(
            r#"
            SELECT account_id, user_id, currency, status, balance
            FROM accounts_tb
            WHERE account_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    async fn update_balance(&self, update: BalanceUpdate) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;

        // Idempotency key first: a replay inserts nothing and changes nothing
        let recorded = sqlx::query(
            r#"
            INSERT INTO balance_ops_tb (reference_id, direction, account_id, amount)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (reference_id, direction) DO NOTHING
            "#,
        )
        .bind(update.reference_id)
        .bind(update.direction.id())
        .bind(update.account_id)
        .bind(update.amount)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if recorded == 0 {
            tx.rollback().await?;
            debug!(
                reference_id = %update.reference_id,
                direction = %update.direction,
                "Balance update already applied"
            );
            return Ok(());
        }

        let changed = match update.direction {
            BalanceDirection::Increase => {
                sqlx::query(
                    r#"
                    UPDATE accounts_tb
                    SET balance = balance + $1, updated_at = NOW()
                    WHERE account_id = $2
                    "#,
                )
                .bind(update.amount)
                .bind(update.account_id)
                .execute(&mut *tx)
                .await?
            }
            // Never drive a row negative, whatever the validator saw
            BalanceDirection::Decrease => {
                sqlx::query(
                    r#"
                    UPDATE accounts_tb
                    SET balance = balance - $1, updated_at = NOW()
                    WHERE account_id = $2 AND balance >= $1
                    "#,
                )
                .bind(update.amount)
                .bind(update.account_id)
                .execute(&mut *tx)
                .await?
            }
        }
        .rows_affected();

        if changed == 0 {
            tx.rollback().await?;
            return Err(ServiceError::Rejected(format!(
                "{} of {} on account {} not applied (missing account or insufficient funds)",
                update.direction, update.amount, update.account_id
            )));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn is_applied(
        &self,
        reference_id: ReferenceId,
        direction: BalanceDirection,
    ) -> Result<bool, ServiceError> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM balance_ops_tb
                WHERE reference_id = $1 AND direction = $2
            ) AS applied
            "#,
        )
        .bind(reference_id)
        .bind(direction.id())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("applied")?)
    }
}

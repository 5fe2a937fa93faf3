//! PostgreSQL store
//!
//! Tables:
//! - `accounts_tb`: one row per account, balance mutated in place
//! - `transactions_tb`: ledger entries, unique on `reference_id`
//! - `balance_ops_tb`: applied balance mutations, primary key
//!   `(reference_id, direction)`; written in the same SQL transaction as the
//!   balance change it guards

pub mod accounts;
pub mod ledger;
pub mod schema;

pub use accounts::PgAccountService;
pub use ledger::PgLedger;

use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::service_error::ServiceError;

/// Pool sizing for the transfer stores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout_ms: 3_000,
        }
    }
}

/// Shared pool behind [`PgAccountService`] and [`PgLedger`]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str, config: &PoolConfig) -> Result<Self, ServiceError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_millis(config.acquire_timeout_ms))
            .connect(database_url)
            .await?;

        info!(
            max_connections = config.max_connections,
            "Transfer store pool established"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create missing tables, then verify the ledger tables answer
    pub async fn prepare(&self) -> Result<(), ServiceError> {
        schema::init_schema(&self.pool).await?;
        sqlx::query("SELECT COUNT(*) FROM balance_ops_tb")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}

//! Ledger Transfer - ops entry point
//!
//! Loads `config/<env>.yaml`, initializes logging and, when `postgres_url`
//! is configured, connects and prepares the transfer store.
//!
//! ```text
//! ledger_transfer [--env dev]
//! ```

use anyhow::Context;
use tracing::{info, warn};

use ledger_transfer::config::AppConfig;
use ledger_transfer::logging::init_logging;
use ledger_transfer::store::postgres::Database;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let config = AppConfig::load(&env)?;
    let _guard = init_logging(&config);

    info!(
        env = %env,
        max_attempts = config.transfer.retry.max_attempts,
        "Starting ledger_transfer"
    );

    let Some(url) = config.postgres_url.as_deref() else {
        warn!("postgres_url not configured, nothing to initialize");
        return Ok(());
    };

    let db = Database::connect(url, &config.postgres_pool)
        .await
        .context("Failed to connect to PostgreSQL")?;
    db.prepare().await.context("Failed to prepare transfer store")?;

    info!("Database ready");
    Ok(())
}

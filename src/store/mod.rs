//! Storage adapters for the account and ledger contracts
//!
//! - [`memory`]: process-local maps, one mutex per map
//! - [`postgres`]: sqlx/PostgreSQL

pub mod memory;
pub mod postgres;

pub use memory::{MemoryAccounts, MemoryLedger};
pub use postgres::{PgAccountService, PgLedger};

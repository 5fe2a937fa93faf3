//! Ledger Transfer - Ledgered Funds-Transfer Core
//!
//! Moves funds between two accounts as an ordered set of idempotent,
//! individually retryable steps, recording every leg as a ledger entry.
//!
//! # Modules
//!
//! - [`core_types`] - ID and amount aliases
//! - [`account`] - Account model and the [`AccountService`] contract
//! - [`ledger`] - Ledger entries and the find-or-create / status contracts
//! - [`transfer`] - Validator, materializer, balance updater, finalizer, runner
//! - [`store`] - In-memory and PostgreSQL implementations of the contracts
//! - [`clock`] - Injectable time source
//! - [`config`] / [`logging`] - YAML config and tracing setup

// Core types - must be first!
pub mod core_types;

pub mod account;
pub mod clock;
pub mod ledger;
pub mod service_error;
pub mod store;
pub mod transfer;

pub mod config;
pub mod logging;

// Convenient re-exports at crate root
pub use account::{Account, AccountService, AccountStatus, BalanceDirection, BalanceUpdate};
pub use clock::{SystemClock, TimeProvider};
pub use core_types::{AccountId, Amount, ReferenceId, TransactionId, UserId};
pub use ledger::{
    Transaction, TransactionFinderOrCreator, TransactionService, TransactionStatus,
    TransactionType,
};
pub use service_error::ServiceError;
pub use transfer::{
    CancelSignal, RetryPolicy, TransactionOperations, TransferError, TransferParams,
    TransferResult, TransferRunner,
};

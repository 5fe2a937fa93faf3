//! Ledgered Funds Transfer
//!
//! Moves an amount (plus optional fee) from a source account to a destination
//! account and records every leg as a ledger entry.
//!
//! # Stages
//!
//! ```text
//! VALIDATING → MATERIALIZING → BALANCING → FINALIZING → DONE
//!      ↓             ↓              ↓            ↓
//!                         FAILED
//! ```
//!
//! Each stage is a separately re-invocable step owned by
//! [`TransactionOperations`]; [`TransferRunner`] retries a step with the same
//! input while its error is retryable.
//!
//! # Safety Invariants
//!
//! 1. **No money before entries**: balances move only after all PENDING entries exist
//! 2. **Idempotency**: entries are find-or-create by reference ID, balance legs
//!    are keyed by (reference ID, direction)
//! 3. **No compensation**: a failure after BALANCING surfaces as
//!    `PartialCompletion`, never as a rollback

pub mod balance;
pub mod cancel;
pub mod error;
pub mod finalizer;
pub mod materializer;
pub mod operations;
pub mod result;
pub mod runner;
pub mod state;
pub mod types;
pub mod validator;


pub use cancel::CancelSignal;
pub use error::TransferError;
pub use operations::{PriorEntries, TransactionOperations};
pub use runner::{RetryPolicy, TransferRunner};
pub use state::{StageTracker, TransferStage};
pub use types::{
    FinalizedTransactions, PendingTransactions, TransferParams, TransferResult, ValidAccounts,
};

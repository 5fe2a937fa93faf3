//! Core types used throughout the crate
//!
//! Identity aliases shared by the account, ledger and transfer modules.

use uuid::Uuid;

/// Account ID - identity of a balance-holding account.
pub type AccountId = Uuid;

/// User ID - owner of accounts and ledger entries.
pub type UserId = Uuid;

/// Transaction ID - storage identity of a ledger entry.
pub type TransactionId = Uuid;

/// Reference ID - caller-assigned idempotency key of one ledger entry.
///
/// # Constraints:
/// - **Unique**: exactly one ledger entry exists per reference ID
/// - **Stable across retries**: re-executing a step with the same
///   reference ID never creates a second entry or a second balance effect
pub type ReferenceId = Uuid;

/// Money amount in minor units (cents, satoshis, ...)
pub type Amount = i64;

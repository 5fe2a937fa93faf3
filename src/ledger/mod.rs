//! Ledger entries
//!
//! A transfer writes up to three double-entry records (outbound, inbound,
//! fee). Entries are created PENDING, finalized to SUCCESS and never deleted.

pub mod models;
pub mod service;

pub use models::{
    EntryMetadata, OperationType, Transaction, TransactionDraft, TransactionStatus,
    TransactionType, TransferNote,
};
pub use service::{TransactionFinderOrCreator, TransactionService};

//! Transfer Core Types

use crate::account::Account;
use crate::core_types::{AccountId, Amount, ReferenceId};
use crate::ledger::{Transaction, TransferNote};

/// Transfer input, immutable for the lifetime of a transfer
///
/// The three reference IDs are chosen by the caller and must be distinct;
/// re-running a transfer with the same IDs never moves money twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferParams {
    pub amount: Amount,
    pub fee_amount: Option<Amount>,
    pub note: Option<TransferNote>,
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub source_reference_id: ReferenceId,
    pub destination_reference_id: ReferenceId,
    pub fee_reference_id: ReferenceId,
}

impl TransferParams {
    /// Create params without fee or note
    pub fn new(
        source_account_id: AccountId,
        destination_account_id: AccountId,
        amount: Amount,
        source_reference_id: ReferenceId,
        destination_reference_id: ReferenceId,
        fee_reference_id: ReferenceId,
    ) -> Self {
        Self {
            amount,
            fee_amount: None,
            note: None,
            source_account_id,
            destination_account_id,
            source_reference_id,
            destination_reference_id,
            fee_reference_id,
        }
    }

    pub fn with_fee(mut self, fee_amount: Amount) -> Self {
        self.fee_amount = Some(fee_amount);
        self
    }

    pub fn with_note(mut self, note: TransferNote) -> Self {
        self.note = Some(note);
        self
    }

    /// Total debited from the source: amount + fee (fee defaults to 0)
    #[inline]
    pub fn total_debit(&self) -> Option<Amount> {
        self.amount.checked_add(self.fee_amount.unwrap_or(0))
    }
}

/// Both accounts, loaded and checked by the validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidAccounts {
    pub source: Account,
    pub destination: Account,
}

/// PENDING entries produced by the materializer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransactions {
    pub outbound: Transaction,
    pub inbound: Transaction,
    pub fee: Option<Transaction>,
}

/// SUCCESS entries produced by the finalizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedTransactions {
    pub outbound: Transaction,
    pub inbound: Transaction,
    pub fee: Option<Transaction>,
}

/// Transfer output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    pub source_reference_id: ReferenceId,
    pub destination_reference_id: ReferenceId,
    pub fee_reference_id: ReferenceId,
    pub source_transaction: Transaction,
    pub destination_transaction: Transaction,
    pub fee_transaction: Option<Transaction>,
}

//! Transaction Materializer
//!
//! Produces the PENDING ledger entries of a transfer via find-or-create keyed
//! on reference ID. Re-running after a crash returns the entries created by
//! the earlier attempt instead of duplicating them.
//!
//! Failures are wrapped as non-retryable: a rejected draft is an input
//! problem that a retry cannot fix.

use tracing::debug;

use super::cancel::CancelSignal;
use super::error::TransferError;
use super::state::TransferStage;
use super::types::{PendingTransactions, TransferParams, ValidAccounts};
use crate::account::Account;
use crate::clock::TimeProvider;
use crate::ledger::{
    EntryMetadata, OperationType, Transaction, TransactionDraft, TransactionFinderOrCreator,
    TransactionType,
};

const STAGE: TransferStage = TransferStage::Materializing;

/// Draft for the source-side entry
pub fn outbound_draft(
    params: &TransferParams,
    source: &Account,
    clock: &dyn TimeProvider,
) -> TransactionDraft {
    TransactionDraft {
        user_id: source.user_id,
        account_id: source.id,
        amount: params.amount,
        currency: source.currency.clone(),
        reference_id: params.source_reference_id,
        transaction_type: TransactionType::Outbound,
        metadata: EntryMetadata {
            version: EntryMetadata::VERSION,
            operation_type: OperationType::Transfer,
            linked_transaction_id: params.source_reference_id,
            linked_account_id: source.id,
            source_account_id: None,
            destination_account_id: Some(params.destination_account_id),
            timestamp: clock.now(),
            note: params.note.clone(),
        },
    }
}

/// Draft for the destination-side entry
pub fn inbound_draft(
    params: &TransferParams,
    destination: &Account,
    clock: &dyn TimeProvider,
) -> TransactionDraft {
    TransactionDraft {
        user_id: destination.user_id,
        account_id: destination.id,
        amount: params.amount,
        currency: destination.currency.clone(),
        reference_id: params.destination_reference_id,
        transaction_type: TransactionType::Inbound,
        metadata: EntryMetadata {
            version: EntryMetadata::VERSION,
            operation_type: OperationType::Transfer,
            linked_transaction_id: params.destination_reference_id,
            linked_account_id: destination.id,
            source_account_id: Some(params.source_account_id),
            destination_account_id: Some(params.destination_account_id),
            timestamp: clock.now(),
            note: params.note.clone(),
        },
    }
}

/// Draft for the fee entry, `None` when no fee is charged
pub fn fee_draft(
    params: &TransferParams,
    source: &Account,
    clock: &dyn TimeProvider,
) -> Option<TransactionDraft> {
    let fee = params.fee_amount?;
    Some(TransactionDraft {
        user_id: source.user_id,
        account_id: source.id,
        amount: fee,
        currency: source.currency.clone(),
        reference_id: params.fee_reference_id,
        transaction_type: TransactionType::OutgoingFee,
        metadata: EntryMetadata {
            version: EntryMetadata::VERSION,
            operation_type: OperationType::FeeTransfer,
            linked_transaction_id: params.fee_reference_id,
            linked_account_id: params.source_account_id,
            source_account_id: None,
            destination_account_id: None,
            timestamp: clock.now(),
            note: params.note.clone(),
        },
    })
}

/// Find-or-create every entry of the transfer
///
/// Order: outbound, fee, inbound. The calls touch disjoint reference IDs so
/// the order carries no correctness weight.
pub async fn materialize(
    ledger: &dyn TransactionFinderOrCreator,
    clock: &dyn TimeProvider,
    params: &TransferParams,
    accounts: &ValidAccounts,
    cancel: &CancelSignal,
) -> Result<PendingTransactions, TransferError> {
    cancel.check(STAGE)?;
    let outbound = find_or_create(ledger, outbound_draft(params, &accounts.source, clock)).await?;

    let fee = match fee_draft(params, &accounts.source, clock) {
        Some(draft) => {
            cancel.check(STAGE)?;
            Some(find_or_create(ledger, draft).await?)
        }
        None => None,
    };

    cancel.check(STAGE)?;
    let inbound =
        find_or_create(ledger, inbound_draft(params, &accounts.destination, clock)).await?;

    Ok(PendingTransactions {
        outbound,
        inbound,
        fee,
    })
}

async fn find_or_create(
    ledger: &dyn TransactionFinderOrCreator,
    draft: TransactionDraft,
) -> Result<Transaction, TransferError> {
    let reference_id = draft.reference_id;
    let kind = draft.transaction_type;

    let tx = ledger
        .find_or_create(draft)
        .await
        .map_err(|e| TransferError::persistence_fatal(STAGE, e))?;

    debug!(
        reference_id = %reference_id,
        transaction_id = %tx.id,
        kind = %kind,
        status = %tx.status,
        "Ledger entry materialized"
    );
    Ok(tx)
}

//! Transaction Finalizer
//!
//! Flips outbound, inbound and fee entries (in that order) to SUCCESS.
//! Balances have already moved when this runs, so every failure is a
//! `PartialCompletion`. The update is a status assignment, so re-running
//! the step is safe.

use tracing::{debug, error};

use super::cancel::CancelSignal;
use super::error::TransferError;
use super::state::TransferStage;
use super::types::{FinalizedTransactions, PendingTransactions};
use crate::core_types::ReferenceId;
use crate::ledger::{Transaction, TransactionService, TransactionStatus};

const STAGE: TransferStage = TransferStage::Finalizing;

pub async fn finalize(
    ledger: &dyn TransactionService,
    pending: &PendingTransactions,
    cancel: &CancelSignal,
) -> Result<FinalizedTransactions, TransferError> {
    let mut done: Vec<ReferenceId> = Vec::with_capacity(3);

    let outbound = mark_success(ledger, &pending.outbound, &mut done, cancel).await?;
    let inbound = mark_success(ledger, &pending.inbound, &mut done, cancel).await?;
    let fee = match &pending.fee {
        Some(tx) => Some(mark_success(ledger, tx, &mut done, cancel).await?),
        None => None,
    };

    Ok(FinalizedTransactions {
        outbound,
        inbound,
        fee,
    })
}

async fn mark_success(
    ledger: &dyn TransactionService,
    tx: &Transaction,
    done: &mut Vec<ReferenceId>,
    cancel: &CancelSignal,
) -> Result<Transaction, TransferError> {
    if let Err(e) = cancel.check_applied(STAGE, done.as_slice()) {
        error!(
            reference_id = %tx.reference_id,
            finalized = done.len(),
            "Cancelled during finalization after balances moved"
        );
        return Err(e);
    }

    if tx.is_success() {
        done.push(tx.reference_id);
        return Ok(tx.clone());
    }

    match ledger.update_status(tx.id, TransactionStatus::Success).await {
        Ok(updated) => {
            debug!(reference_id = %tx.reference_id, transaction_id = %tx.id, "Ledger entry finalized");
            done.push(tx.reference_id);
            Ok(updated)
        }
        Err(e) => {
            error!(
                reference_id = %tx.reference_id,
                transaction_id = %tx.id,
                finalized = done.len(),
                error = %e,
                "Finalization failed after balances moved"
            );
            Err(TransferError::partial(STAGE, done.clone(), e))
        }
    }
}

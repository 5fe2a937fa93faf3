//! Balance Updater
//!
//! Debits the source (amount, then fee) and credits the destination, in that
//! order. Each leg is a single-row mutation keyed by the reference ID of the
//! ledger entry it belongs to, so re-running this step after a crash or a
//! transient error skips the legs that already landed.
//!
//! No cross-account atomicity: a failure after the first leg surfaces as
//! `PartialCompletion` naming the legs already applied. Reversing them is
//! left to external compensation.

use tracing::{debug, error};

use super::cancel::CancelSignal;
use super::error::TransferError;
use super::state::TransferStage;
use super::types::{TransferParams, ValidAccounts};
use crate::account::{AccountService, BalanceDirection, BalanceUpdate};
use crate::core_types::{Amount, ReferenceId};

const STAGE: TransferStage = TransferStage::Balancing;

/// Source debits as (reference ID, amount): the amount, then a non-zero fee
pub fn source_debits(params: &TransferParams) -> Vec<(ReferenceId, Amount)> {
    let mut debits = vec![(params.source_reference_id, params.amount)];
    if let Some(fee) = params.fee_amount
        && fee > 0
    {
        debits.push((params.fee_reference_id, fee));
    }
    debits
}

/// Ordered balance legs of a transfer
///
/// Source DECREASE amount, source DECREASE fee (if any, non-zero),
/// destination INCREASE amount.
pub fn plan_legs(params: &TransferParams, accounts: &ValidAccounts) -> Vec<BalanceUpdate> {
    let mut legs: Vec<BalanceUpdate> = source_debits(params)
        .into_iter()
        .map(|(reference_id, amount)| BalanceUpdate {
            account_id: accounts.source.id,
            amount,
            direction: BalanceDirection::Decrease,
            reference_id,
        })
        .collect();

    legs.push(BalanceUpdate {
        account_id: accounts.destination.id,
        amount: params.amount,
        direction: BalanceDirection::Increase,
        reference_id: params.destination_reference_id,
    });

    legs
}

/// Apply every leg in order, stopping at the first failure
pub async fn apply_balances(
    accounts: &dyn AccountService,
    params: &TransferParams,
    valid: &ValidAccounts,
    cancel: &CancelSignal,
) -> Result<(), TransferError> {
    let mut applied: Vec<ReferenceId> = Vec::with_capacity(3);

    for leg in plan_legs(params, valid) {
        if let Err(e) = cancel.check_applied(STAGE, &applied) {
            if !applied.is_empty() {
                error!(
                    source_ref = %params.source_reference_id,
                    applied = applied.len(),
                    "Cancelled after balance legs were applied"
                );
            }
            return Err(e);
        }

        if let Err(e) = accounts.update_balance(leg).await {
            if applied.is_empty() {
                return Err(TransferError::persistence(STAGE, e));
            }
            error!(
                source_ref = %params.source_reference_id,
                failed_ref = %leg.reference_id,
                account_id = %leg.account_id,
                direction = %leg.direction,
                amount = leg.amount,
                applied = applied.len(),
                error = %e,
                "Balance leg failed after earlier legs were applied"
            );
            return Err(TransferError::partial(STAGE, applied, e));
        }

        debug!(
            reference_id = %leg.reference_id,
            account_id = %leg.account_id,
            direction = %leg.direction,
            amount = leg.amount,
            "Balance leg applied"
        );
        applied.push(leg.reference_id);
    }

    Ok(())
}

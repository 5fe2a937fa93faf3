//! Transaction Operations
//!
//! Owns the collaborator handles and exposes each transfer step as an
//! individually re-invocable operation, plus [`TransactionOperations::transfer`]
//! which runs them once, in order, as a single unit of work.

use std::sync::Arc;
use tracing::{info, warn};

use super::balance;
use super::cancel::CancelSignal;
use super::error::TransferError;
use super::finalizer;
use super::materializer;
use super::result;
use super::state::{StageTracker, TransferStage};
use super::types::{
    FinalizedTransactions, PendingTransactions, TransferParams, TransferResult, ValidAccounts,
};
use super::validator;
use crate::account::AccountService;
use crate::clock::TimeProvider;
use crate::core_types::{AccountId, Amount, ReferenceId};
use crate::ledger::{Transaction, TransactionFinderOrCreator, TransactionService, TransactionType};

/// Entries already stored under a transfer's reference IDs
#[derive(Debug, Clone, Default)]
pub struct PriorEntries {
    pub outbound: Option<Transaction>,
    pub inbound: Option<Transaction>,
    pub fee: Option<Transaction>,
}

impl PriorEntries {
    /// An earlier attempt got past validation
    pub fn is_started(&self) -> bool {
        self.outbound.is_some() || self.inbound.is_some() || self.fee.is_some()
    }

    /// Stored entries must describe the same transfer as `params`
    ///
    /// Reusing reference IDs for a different amount, account or fee is a
    /// caller error, never a replay.
    pub fn check_matches(&self, params: &TransferParams) -> Result<(), TransferError> {
        let expected: [(Option<&Transaction>, TransactionType, AccountId, Amount); 3] = [
            (
                self.outbound.as_ref(),
                TransactionType::Outbound,
                params.source_account_id,
                params.amount,
            ),
            (
                self.inbound.as_ref(),
                TransactionType::Inbound,
                params.destination_account_id,
                params.amount,
            ),
            (
                self.fee.as_ref(),
                TransactionType::OutgoingFee,
                params.source_account_id,
                params.fee_amount.unwrap_or(0),
            ),
        ];

        for (entry, kind, account_id, amount) in expected {
            if let Some(tx) = entry
                && (tx.transaction_type != kind || tx.account_id != account_id || tx.amount != amount)
            {
                return Err(TransferError::InvalidParams(format!(
                    "reference ID {} already used by a different transfer ({} of {} on {})",
                    tx.reference_id, tx.transaction_type, tx.amount, tx.account_id
                )));
            }
        }

        match (params.fee_amount, &self.fee) {
            (None, Some(tx)) => {
                return Err(TransferError::InvalidParams(format!(
                    "fee reference ID {} already used by a transfer with fee {}",
                    tx.reference_id, tx.amount
                )));
            }
            // Fee is materialized before inbound
            (Some(_), None) if self.inbound.is_some() => {
                return Err(TransferError::InvalidParams(format!(
                    "reference IDs of {} belong to a transfer without fee",
                    params.source_reference_id
                )));
            }
            _ => {}
        }

        Ok(())
    }

    /// Every entry the transfer needs exists in SUCCESS
    pub fn completed(&self, params: &TransferParams) -> Option<FinalizedTransactions> {
        let outbound = self.outbound.as_ref().filter(|t| t.is_success())?;
        let inbound = self.inbound.as_ref().filter(|t| t.is_success())?;
        let fee = match params.fee_amount {
            Some(_) => Some(self.fee.as_ref().filter(|t| t.is_success())?.clone()),
            None => None,
        };
        Some(FinalizedTransactions {
            outbound: outbound.clone(),
            inbound: inbound.clone(),
            fee,
        })
    }
}

pub struct TransactionOperations {
    accounts: Arc<dyn AccountService>,
    finder: Arc<dyn TransactionFinderOrCreator>,
    transactions: Arc<dyn TransactionService>,
    clock: Arc<dyn TimeProvider>,
}

impl TransactionOperations {
    pub fn new(
        accounts: Arc<dyn AccountService>,
        finder: Arc<dyn TransactionFinderOrCreator>,
        transactions: Arc<dyn TransactionService>,
        clock: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            accounts,
            finder,
            transactions,
            clock,
        }
    }

    /// Run a transfer end to end, once
    ///
    /// Returns the stored result without moving money if the reference IDs
    /// belong to a transfer that already reached DONE.
    pub async fn transfer(
        &self,
        params: &TransferParams,
        cancel: &CancelSignal,
    ) -> Result<TransferResult, TransferError> {
        let mut tracker = StageTracker::new(params.source_reference_id);

        let outcome = self.run_steps(params, cancel, &mut tracker).await;
        if let Err(e) = &outcome {
            let at = tracker.fail();
            warn!(
                source_ref = %params.source_reference_id,
                stage = %at,
                code = e.code(),
                retryable = e.is_retryable(),
                error = %e,
                "Transfer failed"
            );
        }
        outcome
    }

    async fn run_steps(
        &self,
        params: &TransferParams,
        cancel: &CancelSignal,
        tracker: &mut StageTracker,
    ) -> Result<TransferResult, TransferError> {
        validator::check_params(params)?;

        let prior = self.lookup_prior(params).await?;
        if let Some(finalized) = prior.completed(params) {
            info!(source_ref = %params.source_reference_id, "Transfer already completed, returning stored result");
            return Ok(self.create_transfer_result(params, finalized));
        }

        let valid = self
            .validate_accounts(params, prior.is_started(), cancel)
            .await?;
        tracker.advance();

        let pending = self.create_pending_transactions(params, &valid, cancel).await?;
        tracker.advance();

        self.update_account_balances(params, &valid, cancel).await?;
        tracker.advance();

        let finalized = self.finalize_transactions(&pending, cancel).await?;
        tracker.advance();

        let result = self.create_transfer_result(params, finalized);
        info!(
            source_ref = %params.source_reference_id,
            source = %params.source_account_id,
            destination = %params.destination_account_id,
            amount = params.amount,
            fee = params.fee_amount.unwrap_or(0),
            "Transfer completed"
        );
        Ok(result)
    }

    /// Load whatever entries already exist for the transfer's reference IDs
    ///
    /// Fails with `InvalidParams` if they belong to a different transfer.
    pub async fn lookup_prior(&self, params: &TransferParams) -> Result<PriorEntries, TransferError> {
        // Without a fee the fee reference may alias another leg's
        let fee_ref_distinct = params.fee_reference_id != params.source_reference_id
            && params.fee_reference_id != params.destination_reference_id;
        let fee = if params.fee_amount.is_some() || fee_ref_distinct {
            self.find(params.fee_reference_id).await?
        } else {
            None
        };
        let prior = PriorEntries {
            outbound: self.find(params.source_reference_id).await?,
            inbound: self.find(params.destination_reference_id).await?,
            fee,
        };
        prior.check_matches(params)?;
        Ok(prior)
    }

    async fn find(&self, reference_id: ReferenceId) -> Result<Option<Transaction>, TransferError> {
        self.transactions
            .find_by_reference_id(reference_id)
            .await
            .map_err(|e| TransferError::persistence(TransferStage::Validating, e))
    }

    /// Step 1: account validation
    ///
    /// When `resuming`, an earlier attempt may have debited the source, so
    /// the balance only has to cover the debits not applied yet.
    pub async fn validate_accounts(
        &self,
        params: &TransferParams,
        resuming: bool,
        cancel: &CancelSignal,
    ) -> Result<ValidAccounts, TransferError> {
        if resuming {
            validator::validate_for_resume(self.accounts.as_ref(), params, cancel).await
        } else {
            validator::validate(self.accounts.as_ref(), params, cancel).await
        }
    }

    /// Step 2: PENDING entries via find-or-create
    pub async fn create_pending_transactions(
        &self,
        params: &TransferParams,
        valid: &ValidAccounts,
        cancel: &CancelSignal,
    ) -> Result<PendingTransactions, TransferError> {
        materializer::materialize(
            self.finder.as_ref(),
            self.clock.as_ref(),
            params,
            valid,
            cancel,
        )
        .await
    }

    /// Step 3: debit source, credit destination
    pub async fn update_account_balances(
        &self,
        params: &TransferParams,
        valid: &ValidAccounts,
        cancel: &CancelSignal,
    ) -> Result<(), TransferError> {
        balance::apply_balances(self.accounts.as_ref(), params, valid, cancel).await
    }

    /// Step 4: PENDING -> SUCCESS
    pub async fn finalize_transactions(
        &self,
        pending: &PendingTransactions,
        cancel: &CancelSignal,
    ) -> Result<FinalizedTransactions, TransferError> {
        finalizer::finalize(self.transactions.as_ref(), pending, cancel).await
    }

    /// Step 5: result assembly
    pub fn create_transfer_result(
        &self,
        params: &TransferParams,
        finalized: FinalizedTransactions,
    ) -> TransferResult {
        result::assemble(params, finalized)
    }
}

//! Step Runner
//!
//! In-process stand-in for the durable execution engine: drives the steps in
//! order and re-invokes a failed step with identical input while its error is
//! retryable. Steps never loop internally; all retrying happens here.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::cancel::CancelSignal;
use super::error::TransferError;
use super::operations::TransactionOperations;
use super::state::{StageTracker, TransferStage};
use super::types::{TransferParams, TransferResult};

/// Retry-with-backoff policy for transient step failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts per step, including the first
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 100,
            max_backoff_ms: 5_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, where `attempt` starts at 1
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(32) as i32;
        let ms = self.initial_backoff_ms as f64 * self.backoff_multiplier.max(1.0).powi(exp);
        Duration::from_millis(ms.min(self.max_backoff_ms as f64) as u64)
    }
}

pub struct TransferRunner {
    ops: Arc<TransactionOperations>,
    policy: RetryPolicy,
}

impl TransferRunner {
    pub fn new(ops: Arc<TransactionOperations>, policy: RetryPolicy) -> Self {
        Self { ops, policy }
    }

    pub fn with_defaults(ops: Arc<TransactionOperations>) -> Self {
        Self::new(ops, RetryPolicy::default())
    }

    /// Drive a transfer to DONE, retrying each step per policy
    pub async fn run(
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
                error = %e,
                "Transfer abandoned"
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
        let ops = &self.ops;

        super::validator::check_params(params)?;

        let prior = self
            .attempt(TransferStage::Validating, cancel, || ops.lookup_prior(params))
            .await?;
        if let Some(finalized) = prior.completed(params) {
            info!(source_ref = %params.source_reference_id, "Transfer already completed");
            return Ok(ops.create_transfer_result(params, finalized));
        }

        let resuming = prior.is_started();
        let valid = self
            .attempt(TransferStage::Validating, cancel, || {
                ops.validate_accounts(params, resuming, cancel)
            })
            .await?;
        tracker.advance();

        let pending = self
            .attempt(TransferStage::Materializing, cancel, || {
                ops.create_pending_transactions(params, &valid, cancel)
            })
            .await?;
        tracker.advance();

        self.attempt(TransferStage::Balancing, cancel, || {
            ops.update_account_balances(params, &valid, cancel)
        })
        .await?;
        tracker.advance();

        let finalized = self
            .attempt(TransferStage::Finalizing, cancel, || {
                ops.finalize_transactions(&pending, cancel)
            })
            .await?;
        tracker.advance();

        Ok(ops.create_transfer_result(params, finalized))
    }

    /// Invoke one step until it succeeds, fails permanently or attempts run out
    async fn attempt<T, F, Fut>(
        &self,
        stage: TransferStage,
        cancel: &CancelSignal,
        mut step: F,
    ) -> Result<T, TransferError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransferError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match step().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        stage = %stage,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Step failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    cancel.check_applied(stage, e.applied())?;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

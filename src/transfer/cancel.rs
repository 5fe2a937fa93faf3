//! Cancellation signal
//!
//! Set by the enclosing execution context; steps poll it before every
//! external call and stop without further mutation once it is set.

use std::sync::atomic::{AtomicBool, Ordering};

use super::error::TransferError;
use super::state::TransferStage;
use crate::core_types::ReferenceId;

#[derive(Debug, Default)]
pub struct CancelSignal {
    cancelled: AtomicBool,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
        }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` if cancellation was requested
    #[inline]
    pub fn check(&self, stage: TransferStage) -> Result<(), TransferError> {
        self.check_applied(stage, &[])
    }

    /// Like [`check`](Self::check), recording what the step already made durable
    pub fn check_applied(
        &self,
        stage: TransferStage,
        applied: &[ReferenceId],
    ) -> Result<(), TransferError> {
        if self.is_cancelled() {
            return Err(TransferError::Cancelled {
                stage,
                applied: applied.to_vec(),
            });
        }
        Ok(())
    }
}

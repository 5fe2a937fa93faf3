//! Transfer Error Types
//!
//! Every error carries the retry classification the orchestrating engine
//! needs: [`TransferError::is_retryable`].

use thiserror::Error;

use super::state::TransferStage;
use crate::account::AccountStatus;
use crate::core_types::{AccountId, Amount, ReferenceId};
use crate::service_error::ServiceError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    // === Input Errors ===
    #[error("Invalid transfer parameters: {0}")]
    InvalidParams(String),

    // === Account Errors ===
    #[error("Account not found: {account_id}")]
    AccountNotFound { account_id: AccountId },

    #[error("Account is not active: {account_id} (status {status})")]
    InactiveAccount {
        account_id: AccountId,
        status: AccountStatus,
    },

    #[error("Currency mismatch: source {source_currency}, destination {destination_currency}")]
    CurrencyMismatch {
        source_currency: String,
        destination_currency: String,
    },

    #[error(
        "Insufficient balance: account {account_id}, required {required}, available {available}"
    )]
    InsufficientBalance {
        account_id: AccountId,
        required: Amount,
        available: Amount,
    },

    // === System Errors ===
    #[error("Persistence failure during {stage}: {source}")]
    PersistenceFailure {
        stage: TransferStage,
        retryable: bool,
        source: ServiceError,
    },

    #[error(
        "Partial completion during {stage} ({n} ledger leg(s) already applied): {source}",
        n = .applied.len()
    )]
    PartialCompletion {
        stage: TransferStage,
        /// Reference IDs whose effect is already durable
        applied: Vec<ReferenceId>,
        retryable: bool,
        source: ServiceError,
    },

    #[error(
        "Transfer cancelled during {stage} ({n} ledger leg(s) already applied)",
        n = .applied.len()
    )]
    Cancelled {
        stage: TransferStage,
        /// Non-empty when cancellation interrupted a step midway
        applied: Vec<ReferenceId>,
    },
}

impl TransferError {
    /// Persistence failure classified by its cause
    pub fn persistence(stage: TransferStage, source: ServiceError) -> Self {
        TransferError::PersistenceFailure {
            stage,
            retryable: source.is_transient(),
            source,
        }
    }

    /// Persistence failure that must not be retried regardless of cause
    pub fn persistence_fatal(stage: TransferStage, source: ServiceError) -> Self {
        TransferError::PersistenceFailure {
            stage,
            retryable: false,
            source,
        }
    }

    /// Cross-step gap; retryable only when the cause is transient
    pub fn partial(stage: TransferStage, applied: Vec<ReferenceId>, source: ServiceError) -> Self {
        TransferError::PartialCompletion {
            stage,
            applied,
            retryable: source.is_transient(),
            source,
        }
    }

    /// Reference IDs whose effect was durable when the error was raised
    pub fn applied(&self) -> &[ReferenceId] {
        match self {
            TransferError::PartialCompletion { applied, .. }
            | TransferError::Cancelled { applied, .. } => applied,
            _ => &[],
        }
    }

    /// Two-valued retry signal for the orchestrating engine
    pub fn is_retryable(&self) -> bool {
        match self {
            TransferError::PersistenceFailure { retryable, .. }
            | TransferError::PartialCompletion { retryable, .. } => *retryable,
            _ => false,
        }
    }

    /// Domain rule violations (input or account state), never worth retrying
    pub fn is_business_rule(&self) -> bool {
        matches!(
            self,
            TransferError::InvalidParams(_)
                | TransferError::AccountNotFound { .. }
                | TransferError::InactiveAccount { .. }
                | TransferError::CurrencyMismatch { .. }
                | TransferError::InsufficientBalance { .. }
        )
    }

    /// Stage the error was raised in, when known
    pub fn stage(&self) -> TransferStage {
        match self {
            TransferError::PersistenceFailure { stage, .. }
            | TransferError::PartialCompletion { stage, .. }
            | TransferError::Cancelled { stage, .. } => *stage,
            _ => TransferStage::Validating,
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::InvalidParams(_) => "INVALID_PARAMS",
            TransferError::AccountNotFound { .. } => "ACCOUNT_NOT_FOUND",
            TransferError::InactiveAccount { .. } => "INACTIVE_ACCOUNT",
            TransferError::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            TransferError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            TransferError::PersistenceFailure { .. } => "PERSISTENCE_FAILURE",
            TransferError::PartialCompletion { .. } => "PARTIAL_COMPLETION",
            TransferError::Cancelled { .. } => "CANCELLED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            TransferError::InvalidParams("x".into()).code(),
            "INVALID_PARAMS"
        );
        assert_eq!(
            TransferError::AccountNotFound {
                account_id: Uuid::nil()
            }
            .code(),
            "ACCOUNT_NOT_FOUND"
        );
        assert_eq!(
            TransferError::Cancelled {
                stage: TransferStage::Balancing,
                applied: vec![],
            }
            .code(),
            "CANCELLED"
        );
    }

    #[test]
    fn test_domain_errors_never_retry() {
        let errors = [
            TransferError::InvalidParams("x".into()),
            TransferError::AccountNotFound {
                account_id: Uuid::nil(),
            },
            TransferError::InactiveAccount {
                account_id: Uuid::nil(),
                status: AccountStatus::Frozen,
            },
            TransferError::InsufficientBalance {
                account_id: Uuid::nil(),
                required: 310,
                available: 100,
            },
        ];
        for e in errors {
            assert!(!e.is_retryable(), "{e} must not be retryable");
            assert!(e.is_business_rule());
        }
    }

    #[test]
    fn test_persistence_classification() {
        let transient = TransferError::persistence(
            TransferStage::Finalizing,
            ServiceError::Unavailable("timeout".into()),
        );
        assert!(transient.is_retryable());
        assert!(!transient.is_business_rule());

        let rejected = TransferError::persistence(
            TransferStage::Finalizing,
            ServiceError::Rejected("constraint".into()),
        );
        assert!(!rejected.is_retryable());

        let fatal = TransferError::persistence_fatal(
            TransferStage::Materializing,
            ServiceError::Unavailable("timeout".into()),
        );
        assert!(!fatal.is_retryable());
        assert_eq!(fatal.stage(), TransferStage::Materializing);
    }

    #[test]
    fn test_cancelled_is_distinct() {
        let e = TransferError::Cancelled {
            stage: TransferStage::Finalizing,
            applied: vec![],
        };
        assert!(!e.is_retryable());
        assert!(!e.is_business_rule());
        assert_eq!(e.stage(), TransferStage::Finalizing);
        assert!(e.applied().is_empty());

        let midway = TransferError::Cancelled {
            stage: TransferStage::Balancing,
            applied: vec![Uuid::nil()],
        };
        assert_eq!(midway.applied(), &[Uuid::nil()]);
        assert!(midway.to_string().contains("1 ledger leg(s) already applied"));
    }

    #[test]
    fn test_display() {
        let e = TransferError::InsufficientBalance {
            account_id: Uuid::nil(),
            required: 310,
            available: 100,
        };
        assert_eq!(
            e.to_string(),
            "Insufficient balance: account 00000000-0000-0000-0000-000000000000, required 310, available 100"
        );

        let e = TransferError::partial(
            TransferStage::Balancing,
            vec![Uuid::nil()],
            ServiceError::Unavailable("down".into()),
        );
        assert_eq!(
            e.to_string(),
            "Partial completion during BALANCING (1 ledger leg(s) already applied): Service unavailable: down"
        );
        assert!(e.is_retryable());
    }
}

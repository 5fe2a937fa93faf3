//! Account Validator
//!
//! Read-only. Loads both accounts and checks existence, status, currency and
//! the source balance against `amount + fee`, or against the debits still
//! outstanding when resuming.
//!
//! The balance check reads a snapshot; concurrent transfers draining the same
//! source can both pass it. Storage-level guards (see the postgres store)
//! are the last line of defence.

use tracing::debug;

use super::balance;
use super::cancel::CancelSignal;
use super::error::TransferError;
use super::state::TransferStage;
use super::types::{TransferParams, ValidAccounts};
use crate::account::{Account, AccountService, BalanceDirection};
use crate::core_types::{AccountId, Amount};

const STAGE: TransferStage = TransferStage::Validating;

/// Input checks that need no lookups
pub fn check_params(params: &TransferParams) -> Result<(), TransferError> {
    if params.amount <= 0 {
        return Err(TransferError::InvalidParams(format!(
            "amount must be greater than zero, got {}",
            params.amount
        )));
    }

    if let Some(fee) = params.fee_amount
        && fee < 0
    {
        return Err(TransferError::InvalidParams(format!(
            "fee must not be negative, got {fee}"
        )));
    }

    if params.total_debit().is_none() {
        return Err(TransferError::InvalidParams(
            "amount + fee overflows".to_string(),
        ));
    }

    if params.source_account_id == params.destination_account_id {
        return Err(TransferError::InvalidParams(
            "source and destination account cannot be the same".to_string(),
        ));
    }

    if params.source_reference_id == params.destination_reference_id {
        return Err(TransferError::InvalidParams(
            "source and destination reference IDs must differ".to_string(),
        ));
    }

    if params.fee_amount.is_some()
        && (params.fee_reference_id == params.source_reference_id
            || params.fee_reference_id == params.destination_reference_id)
    {
        return Err(TransferError::InvalidParams(
            "fee reference ID must differ from source and destination reference IDs".to_string(),
        ));
    }

    Ok(())
}

/// Validate both accounts for a transfer
///
/// Order: params, source (exists, active), destination (exists, active),
/// currency, balance. An inactive account is reported before any shortfall.
pub async fn validate(
    accounts: &dyn AccountService,
    params: &TransferParams,
    cancel: &CancelSignal,
) -> Result<ValidAccounts, TransferError> {
    check_params(params)?;
    // check_params guarantees no overflow
    let required = params.total_debit().unwrap_or(Amount::MAX);
    validate_inner(accounts, params, cancel, required).await
}

/// Same as [`validate`], but the balance only has to cover the source
/// debits that have not landed yet
///
/// Used when an earlier attempt already materialized entries: some debits
/// may be applied, and the balance legs are keyed so they cannot land twice.
pub async fn validate_for_resume(
    accounts: &dyn AccountService,
    params: &TransferParams,
    cancel: &CancelSignal,
) -> Result<ValidAccounts, TransferError> {
    check_params(params)?;

    let mut outstanding: Amount = 0;
    for (reference_id, amount) in balance::source_debits(params) {
        cancel.check(STAGE)?;
        let applied = accounts
            .is_applied(reference_id, BalanceDirection::Decrease)
            .await
            .map_err(|e| TransferError::persistence(STAGE, e))?;
        if !applied {
            outstanding += amount;
        }
    }

    validate_inner(accounts, params, cancel, outstanding).await
}

async fn validate_inner(
    accounts: &dyn AccountService,
    params: &TransferParams,
    cancel: &CancelSignal,
    required: Amount,
) -> Result<ValidAccounts, TransferError> {
    cancel.check(STAGE)?;
    let source = load_active(accounts, params.source_account_id).await?;

    cancel.check(STAGE)?;
    let destination = load_active(accounts, params.destination_account_id).await?;

    if source.currency != destination.currency {
        return Err(TransferError::CurrencyMismatch {
            source_currency: source.currency,
            destination_currency: destination.currency,
        });
    }

    if required > source.balance {
        return Err(TransferError::InsufficientBalance {
            account_id: source.id,
            required,
            available: source.balance,
        });
    }

    debug!(
        source = %source.id,
        destination = %destination.id,
        required = required,
        available = source.balance,
        "Accounts validated"
    );

    Ok(ValidAccounts {
        source,
        destination,
    })
}

async fn load_active(
    accounts: &dyn AccountService,
    account_id: AccountId,
) -> Result<Account, TransferError> {
    let account = accounts
        .get_by_id(account_id)
        .await
        .map_err(|e| TransferError::persistence(STAGE, e))?
        .ok_or(TransferError::AccountNotFound { account_id })?;

    if !account.is_active() {
        return Err(TransferError::InactiveAccount {
            account_id,
            status: account.status,
        });
    }

    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountStatus, BalanceUpdate};
    use crate::service_error::ServiceError;
    use crate::store::memory::MemoryAccounts;
    use uuid::Uuid;

    fn params(source: AccountId, destination: AccountId, amount: i64) -> TransferParams {
        TransferParams::new(
            source,
            destination,
            amount,
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
        )
    }

    fn setup(source_balance: i64) -> (MemoryAccounts, AccountId, AccountId) {
        let accounts = MemoryAccounts::new();
        let source = Uuid::new_v4();
        let destination = Uuid::new_v4();
        accounts.insert(Account::new(source, Uuid::new_v4(), "USD", source_balance));
        accounts.insert(Account::new(destination, Uuid::new_v4(), "USD", 0));
        (accounts, source, destination)
    }

    #[test]
    fn test_check_params() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert!(check_params(&params(a, b, 100)).is_ok());
        assert!(matches!(
            check_params(&params(a, b, 0)),
            Err(TransferError::InvalidParams(_))
        ));
        assert!(matches!(
            check_params(&params(a, a, 100)),
            Err(TransferError::InvalidParams(_))
        ));
        assert!(matches!(
            check_params(&params(a, b, 100).with_fee(-1)),
            Err(TransferError::InvalidParams(_))
        ));
        assert!(matches!(
            check_params(&params(a, b, i64::MAX).with_fee(1)),
            Err(TransferError::InvalidParams(_))
        ));

        let mut same_refs = params(a, b, 100);
        same_refs.destination_reference_id = same_refs.source_reference_id;
        assert!(check_params(&same_refs).is_err());

        // Fee reference only matters when a fee is charged
        let mut fee_ref = params(a, b, 100);
        fee_ref.fee_reference_id = fee_ref.source_reference_id;
        assert!(check_params(&fee_ref).is_ok());
        assert!(check_params(&fee_ref.with_fee(5)).is_err());
    }

    #[tokio::test]
    async fn test_validate_success() {
        let (accounts, source, destination) = setup(1000);
        let valid = validate(&accounts, &params(source, destination, 300).with_fee(10), &CancelSignal::new())
            .await
            .unwrap();
        assert_eq!(valid.source.id, source);
        assert_eq!(valid.destination.id, destination);
    }

    #[tokio::test]
    async fn test_validate_exact_balance_passes() {
        let (accounts, source, destination) = setup(310);
        let p = params(source, destination, 300).with_fee(10);
        assert!(validate(&accounts, &p, &CancelSignal::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_not_found() {
        let (accounts, source, _) = setup(1000);
        let missing = Uuid::new_v4();
        let err = validate(&accounts, &params(source, missing, 300), &CancelSignal::new())
            .await
            .unwrap_err();
        assert_eq!(err, TransferError::AccountNotFound { account_id: missing });
    }

    #[tokio::test]
    async fn test_inactive_destination_wins_over_shortfall() {
        let (accounts, source, destination) = setup(100);
        accounts.set_status(destination, AccountStatus::Inactive);

        let err = validate(&accounts, &params(source, destination, 300), &CancelSignal::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::InactiveAccount { account_id, .. } if account_id == destination));
    }

    #[tokio::test]
    async fn test_insufficient_balance_includes_fee() {
        let (accounts, source, destination) = setup(305);
        let err = validate(
            &accounts,
            &params(source, destination, 300).with_fee(10),
            &CancelSignal::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(
            err,
            TransferError::InsufficientBalance {
                account_id: source,
                required: 310,
                available: 305,
            }
        );
    }

    #[tokio::test]
    async fn test_resume_only_requires_outstanding_debits() {
        let (accounts, source, destination) = setup(310);
        let p = params(source, destination, 300).with_fee(10);
        accounts
            .update_balance(BalanceUpdate {
                account_id: source,
                amount: 300,
                direction: BalanceDirection::Decrease,
                reference_id: p.source_reference_id,
            })
            .await
            .unwrap();

        // Balance 10: the full check fails, only the fee is still owed
        assert!(validate(&accounts, &p, &CancelSignal::new()).await.is_err());
        assert!(validate_for_resume(&accounts, &p, &CancelSignal::new()).await.is_ok());

        accounts.set_balance(source, 9);
        let err = validate_for_resume(&accounts, &p, &CancelSignal::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransferError::InsufficientBalance {
                account_id: source,
                required: 10,
                available: 9,
            }
        );

        accounts.set_status(source, AccountStatus::Frozen);
        let err = validate_for_resume(&accounts, &p, &CancelSignal::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INACTIVE_ACCOUNT");
    }

    #[tokio::test]
    async fn test_resume_without_applied_debits_checks_full_amount() {
        let (accounts, source, destination) = setup(100);
        let p = params(source, destination, 300);

        let err = validate_for_resume(&accounts, &p, &CancelSignal::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransferError::InsufficientBalance {
                account_id: source,
                required: 300,
                available: 100,
            }
        );
    }

    #[tokio::test]
    async fn test_currency_mismatch() {
        let (accounts, source, _) = setup(1000);
        let eur = Uuid::new_v4();
        accounts.insert(Account::new(eur, Uuid::new_v4(), "EUR", 0));

        let err = validate(&accounts, &params(source, eur, 300), &CancelSignal::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CURRENCY_MISMATCH");
    }

    #[tokio::test]
    async fn test_lookup_failure_classified_by_cause() {
        let (accounts, source, destination) = setup(1000);
        accounts.fail_next_lookup(ServiceError::Unavailable("db timeout".into()));

        let err = validate(&accounts, &params(source, destination, 300), &CancelSignal::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "PERSISTENCE_FAILURE");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_cancelled_before_lookup() {
        let (accounts, source, destination) = setup(1000);
        let cancel = CancelSignal::new();
        cancel.cancel();

        let err = validate(&accounts, &params(source, destination, 300), &cancel)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransferError::Cancelled {
                stage: TransferStage::Validating,
                applied: vec![],
            }
        );
    }
}

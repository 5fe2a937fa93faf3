//! Account service contract

use async_trait::async_trait;

use super::models::{Account, BalanceDirection, BalanceUpdate};
use crate::core_types::{AccountId, ReferenceId};
use crate::service_error::ServiceError;

/// Account lookup and mutation
///
/// Every method is a single-row operation; no cross-account atomicity is
/// offered or expected.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Load an account, `Ok(None)` if it does not exist
    async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>, ServiceError>;

    /// Apply one balance mutation
    ///
    /// # Idempotency
    /// If `(update.reference_id, update.direction)` was already applied,
    /// return `Ok(())` without touching the balance again.
    async fn update_balance(&self, update: BalanceUpdate) -> Result<(), ServiceError>;

    /// Whether the mutation keyed by `(reference_id, direction)` has landed
    async fn is_applied(
        &self,
        reference_id: ReferenceId,
        direction: BalanceDirection,
    ) -> Result<bool, ServiceError>;
}

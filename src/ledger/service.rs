//! Ledger service contracts

use async_trait::async_trait;

use super::models::{Transaction, TransactionDraft, TransactionStatus};
use crate::core_types::{ReferenceId, TransactionId};
use crate::service_error::ServiceError;

/// Find-or-create keyed on reference ID
#[async_trait]
pub trait TransactionFinderOrCreator: Send + Sync {
    /// Return the entry with `draft.reference_id` if it exists (unchanged),
    /// otherwise create it PENDING from the draft.
    async fn find_or_create(&self, draft: TransactionDraft) -> Result<Transaction, ServiceError>;
}

/// Entry status updates and lookups
#[async_trait]
pub trait TransactionService: Send + Sync {
    /// Assign `status` (an assignment, safe to repeat) and return the updated entry
    async fn update_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<Transaction, ServiceError>;

    async fn find_by_reference_id(
        &self,
        reference_id: ReferenceId,
    ) -> Result<Option<Transaction>, ServiceError>;
}

//! In-memory stores
//!
//! Same contracts as the PostgreSQL store, kept in process memory. Each store
//! serializes its operations behind one mutex, which gives the per-row
//! atomicity the transfer core relies on.
//!
//! Fault injection (`fail_*`) lets drills and tests make the next matching
//! call fail without touching the real state.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

use crate::account::{Account, AccountService, AccountStatus, BalanceDirection, BalanceUpdate};
use crate::clock::{SystemClock, TimeProvider};
use crate::core_types::{AccountId, Amount, ReferenceId, TransactionId};
use crate::ledger::{
    Transaction, TransactionDraft, TransactionFinderOrCreator, TransactionService,
    TransactionStatus,
};
use crate::service_error::ServiceError;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Accounts
// ============================================================================

/// When an injected balance fault fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultTiming {
    /// Fail without applying
    BeforeApply,
    /// Apply, then report failure (outcome unknown to the caller)
    AfterApply,
}

#[derive(Debug, Default)]
struct AccountsState {
    accounts: HashMap<AccountId, Account>,
    applied: HashSet<(ReferenceId, BalanceDirection)>,
}

#[derive(Debug, Default)]
pub struct MemoryAccounts {
    state: Mutex<AccountsState>,
    lookup_faults: Mutex<VecDeque<ServiceError>>,
    update_faults: Mutex<Vec<(BalanceDirection, FaultTiming, ServiceError)>>,
}

impl MemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, account: Account) {
        lock(&self.state).accounts.insert(account.id, account);
    }

    pub fn set_status(&self, id: AccountId, status: AccountStatus) {
        if let Some(account) = lock(&self.state).accounts.get_mut(&id) {
            account.status = status;
        }
    }

    /// Overwrite a balance, bypassing idempotency keys
    pub fn set_balance(&self, id: AccountId, balance: Amount) {
        if let Some(account) = lock(&self.state).accounts.get_mut(&id) {
            account.balance = balance;
        }
    }

    pub fn balance(&self, id: AccountId) -> Option<Amount> {
        lock(&self.state).accounts.get(&id).map(|a| a.balance)
    }

    /// Number of distinct balance mutations applied so far
    pub fn applied_count(&self) -> usize {
        lock(&self.state).applied.len()
    }

    /// Next `get_by_id` fails with `err`
    pub fn fail_next_lookup(&self, err: ServiceError) {
        lock(&self.lookup_faults).push_back(err);
    }

    /// Next `update_balance` in `direction` fails with `err` without applying
    pub fn fail_next_update(&self, direction: BalanceDirection, err: ServiceError) {
        lock(&self.update_faults).push((direction, FaultTiming::BeforeApply, err));
    }

    /// Next `update_balance` in `direction` applies, then reports `err`
    pub fn fail_after_next_update(&self, direction: BalanceDirection, err: ServiceError) {
        lock(&self.update_faults).push((direction, FaultTiming::AfterApply, err));
    }

    fn take_update_fault(&self, direction: BalanceDirection) -> Option<(FaultTiming, ServiceError)> {
        let mut faults = lock(&self.update_faults);
        let pos = faults.iter().position(|(d, _, _)| *d == direction)?;
        let (_, timing, err) = faults.remove(pos);
        Some((timing, err))
    }
}

#[async_trait]
impl AccountService for MemoryAccounts {
    async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>, ServiceError> {
        if let Some(err) = lock(&self.lookup_faults).pop_front() {
            return Err(err);
        }
        Ok(lock(&self.state).accounts.get(&id).cloned())
    }

    async fn update_balance(&self, update: BalanceUpdate) -> Result<(), ServiceError> {
        let after_apply = match self.take_update_fault(update.direction) {
            Some((FaultTiming::BeforeApply, err)) => return Err(err),
            Some((FaultTiming::AfterApply, err)) => Some(err),
            None => None,
        };

        {
            let mut state = lock(&self.state);
            let key = (update.reference_id, update.direction);

            if !state.applied.contains(&key) {
                let account = state
                    .accounts
                    .get_mut(&update.account_id)
                    .ok_or_else(|| ServiceError::NotFound(format!("account {}", update.account_id)))?;

                let next = account
                    .balance
                    .checked_add(update.direction.signed(update.amount))
                    .ok_or_else(|| ServiceError::Rejected("balance overflow".to_string()))?;
                if next < 0 {
                    return Err(ServiceError::Rejected(format!(
                        "insufficient funds on {}: balance {}, debit {}",
                        update.account_id, account.balance, update.amount
                    )));
                }
                account.balance = next;
                state.applied.insert(key);
            } else {
                debug!(reference_id = %update.reference_id, direction = %update.direction, "Balance update already applied");
            }
        }

        match after_apply {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn is_applied(
        &self,
        reference_id: ReferenceId,
        direction: BalanceDirection,
    ) -> Result<bool, ServiceError> {
        Ok(lock(&self.state).applied.contains(&(reference_id, direction)))
    }
}

// ============================================================================
// Ledger
// ============================================================================

#[derive(Debug, Default)]
struct LedgerState {
    by_id: HashMap<TransactionId, Transaction>,
    by_ref: HashMap<ReferenceId, TransactionId>,
}

pub struct MemoryLedger {
    state: Mutex<LedgerState>,
    create_faults: Mutex<VecDeque<ServiceError>>,
    status_faults: Mutex<HashMap<ReferenceId, ServiceError>>,
    clock: Arc<dyn TimeProvider>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            create_faults: Mutex::new(VecDeque::new()),
            status_faults: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.state).by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count_with_status(&self, status: TransactionStatus) -> usize {
        lock(&self.state)
            .by_id
            .values()
            .filter(|t| t.status == status)
            .count()
    }

    pub fn get_by_reference(&self, reference_id: ReferenceId) -> Option<Transaction> {
        let state = lock(&self.state);
        state
            .by_ref
            .get(&reference_id)
            .and_then(|id| state.by_id.get(id))
            .cloned()
    }

    /// Next `find_or_create` fails with `err`
    pub fn fail_next_create(&self, err: ServiceError) {
        lock(&self.create_faults).push_back(err);
    }

    /// Next status update of the entry with `reference_id` fails with `err`
    pub fn fail_status_update(&self, reference_id: ReferenceId, err: ServiceError) {
        lock(&self.status_faults).insert(reference_id, err);
    }
}

#[async_trait]
impl TransactionFinderOrCreator for MemoryLedger {
    async fn find_or_create(&self, draft: TransactionDraft) -> Result<Transaction, ServiceError> {
        if let Some(err) = lock(&self.create_faults).pop_front() {
            return Err(err);
        }

        let mut state = lock(&self.state);
        if let Some(existing) = state
            .by_ref
            .get(&draft.reference_id)
            .and_then(|id| state.by_id.get(id))
        {
            return Ok(existing.clone());
        }

        let tx = Transaction::from_draft(Uuid::new_v4(), draft, self.clock.now());
        state.by_ref.insert(tx.reference_id, tx.id);
        state.by_id.insert(tx.id, tx.clone());
        Ok(tx)
    }
}

#[async_trait]
impl TransactionService for MemoryLedger {
    async fn update_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<Transaction, ServiceError> {
        let mut state = lock(&self.state);
        let tx = state
            .by_id
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("transaction {id}")))?;

        if let Some(err) = lock(&self.status_faults).remove(&tx.reference_id) {
            return Err(err);
        }

        tx.status = status;
        tx.updated_at = self.clock.now();
        Ok(tx.clone())
    }

    async fn find_by_reference_id(
        &self,
        reference_id: ReferenceId,
    ) -> Result<Option<Transaction>, ServiceError> {
        Ok(self.get_by_reference(reference_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{EntryMetadata, OperationType, TransactionType};

    fn draft(reference_id: ReferenceId) -> TransactionDraft {
        let account_id = Uuid::new_v4();
        TransactionDraft {
            user_id: Uuid::new_v4(),
            account_id,
            amount: 50,
            currency: "USD".to_string(),
            reference_id,
            transaction_type: TransactionType::Outbound,
            metadata: EntryMetadata {
                version: EntryMetadata::VERSION,
                operation_type: OperationType::Transfer,
                linked_transaction_id: reference_id,
                linked_account_id: account_id,
                source_account_id: None,
                destination_account_id: None,
                timestamp: SystemClock.now(),
                note: None,
            },
        }
    }

    #[tokio::test]
    async fn test_find_or_create_returns_existing_unchanged() {
        let ledger = MemoryLedger::new();
        let reference_id = Uuid::new_v4();

        let first = ledger.find_or_create(draft(reference_id)).await.unwrap();
        let mut changed = draft(reference_id);
        changed.amount = 999;
        let second = ledger.find_or_create(changed).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second.amount, 50);
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_update_status_unknown_id() {
        let ledger = MemoryLedger::new();
        let err = ledger
            .update_status(Uuid::new_v4(), TransactionStatus::Success)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_update_balance_idempotent_per_key() {
        let accounts = MemoryAccounts::new();
        let id = Uuid::new_v4();
        accounts.insert(Account::new(id, Uuid::new_v4(), "USD", 100));

        let update = BalanceUpdate {
            account_id: id,
            amount: 40,
            direction: BalanceDirection::Decrease,
            reference_id: Uuid::new_v4(),
        };
        assert!(!accounts.is_applied(update.reference_id, update.direction).await.unwrap());
        accounts.update_balance(update).await.unwrap();
        accounts.update_balance(update).await.unwrap();
        assert_eq!(accounts.balance(id), Some(60));
        assert_eq!(accounts.applied_count(), 1);
        assert!(accounts.is_applied(update.reference_id, update.direction).await.unwrap());
        assert!(
            !accounts
                .is_applied(update.reference_id, BalanceDirection::Increase)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_decrease_never_goes_negative() {
        let accounts = MemoryAccounts::new();
        let id = Uuid::new_v4();
        accounts.insert(Account::new(id, Uuid::new_v4(), "USD", 10));

        let err = accounts
            .update_balance(BalanceUpdate {
                account_id: id,
                amount: 11,
                direction: BalanceDirection::Decrease,
                reference_id: Uuid::new_v4(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Rejected(_)));
        assert_eq!(accounts.balance(id), Some(10));
    }

    #[tokio::test]
    async fn test_after_apply_fault_still_applies() {
        let accounts = MemoryAccounts::new();
        let id = Uuid::new_v4();
        accounts.insert(Account::new(id, Uuid::new_v4(), "USD", 0));
        accounts.fail_after_next_update(
            BalanceDirection::Increase,
            ServiceError::Unavailable("ack lost".into()),
        );

        let update = BalanceUpdate {
            account_id: id,
            amount: 25,
            direction: BalanceDirection::Increase,
            reference_id: Uuid::new_v4(),
        };
        assert!(accounts.update_balance(update).await.is_err());
        assert_eq!(accounts.balance(id), Some(25));

        // Replay is acknowledged without applying again
        accounts.update_balance(update).await.unwrap();
        assert_eq!(accounts.balance(id), Some(25));
    }
}

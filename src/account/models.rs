//! Data models for accounts and balance mutations

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core_types::{AccountId, Amount, ReferenceId, UserId};

/// Account status
///
/// Only `Active` accounts may send or receive transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i16)]
pub enum AccountStatus {
    Inactive = 0,
    Active = 1,
    Frozen = 2,
    Closed = 3,
}

impl AccountStatus {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Inactive => "INACTIVE",
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Frozen => "FROZEN",
            AccountStatus::Closed => "CLOSED",
        }
    }
}

impl From<i16> for AccountStatus {
    // Unknown ids never unlock transfers
    fn from(v: i16) -> Self {
        match v {
            1 => AccountStatus::Active,
            2 => AccountStatus::Frozen,
            3 => AccountStatus::Closed,
            _ => AccountStatus::Inactive,
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Balance-holding account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,
    /// ISO-4217 style currency code, e.g. "USD"
    pub currency: String,
    pub status: AccountStatus,
    /// Balance in minor units
    pub balance: Amount,
}

impl Account {
    pub fn new(id: AccountId, user_id: UserId, currency: impl Into<String>, balance: Amount) -> Self {
        Self {
            id,
            user_id,
            currency: currency.into(),
            status: AccountStatus::Active,
            balance,
        }
    }

    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = status;
        self
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

/// Direction of a balance mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i16)]
pub enum BalanceDirection {
    Increase = 1,
    Decrease = 2,
}

impl BalanceDirection {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BalanceDirection::Increase => "INCREASE",
            BalanceDirection::Decrease => "DECREASE",
        }
    }

    /// Signed delta this direction applies for `amount`
    #[inline]
    pub fn signed(&self, amount: Amount) -> Amount {
        match self {
            BalanceDirection::Increase => amount,
            BalanceDirection::Decrease => -amount,
        }
    }
}

impl fmt::Display for BalanceDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One single-row balance mutation
///
/// `reference_id` is the reference ID of the ledger entry this mutation
/// belongs to. Stores apply a given `(reference_id, direction)` at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceUpdate {
    pub account_id: AccountId,
    pub amount: Amount,
    pub direction: BalanceDirection,
    pub reference_id: ReferenceId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_account_status_from_i16() {
        assert_eq!(AccountStatus::from(1), AccountStatus::Active);
        assert_eq!(AccountStatus::from(2), AccountStatus::Frozen);
        assert_eq!(AccountStatus::from(0), AccountStatus::Inactive);
        assert_eq!(AccountStatus::from(42), AccountStatus::Inactive);
    }

    #[test]
    fn test_is_active() {
        let account = Account::new(Uuid::new_v4(), Uuid::new_v4(), "USD", 100);
        assert!(account.is_active());
        assert!(!account.with_status(AccountStatus::Frozen).is_active());
    }

    #[test]
    fn test_signed_delta() {
        assert_eq!(BalanceDirection::Increase.signed(30), 30);
        assert_eq!(BalanceDirection::Decrease.signed(30), -30);
        assert_eq!(BalanceDirection::Decrease.to_string(), "DECREASE");
    }
}

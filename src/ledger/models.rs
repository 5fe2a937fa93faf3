//! Ledger entry data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core_types::{AccountId, Amount, ReferenceId, TransactionId, UserId};

/// Ledger entry status
///
/// `Failed` is only ever set by external compensation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i16)]
pub enum TransactionStatus {
    Pending = 0,
    Success = 1,
    Failed = -1,
}

impl TransactionStatus {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(TransactionStatus::Pending),
            1 => Some(TransactionStatus::Success),
            -1 => Some(TransactionStatus::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Success => "SUCCESS",
            TransactionStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which side of a transfer an entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i16)]
pub enum TransactionType {
    Outbound = 1,
    Inbound = 2,
    OutgoingFee = 3,
}

impl TransactionType {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(TransactionType::Outbound),
            2 => Some(TransactionType::Inbound),
            3 => Some(TransactionType::OutgoingFee),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Outbound => "OUTBOUND",
            TransactionType::Inbound => "INBOUND",
            TransactionType::OutgoingFee => "OUTGOING_FEE",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operation label stored in entry metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    #[serde(rename = "Transfer")]
    Transfer,
    #[serde(rename = "Fee Transfer")]
    FeeTransfer,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Transfer => "Transfer",
            OperationType::FeeTransfer => "Fee Transfer",
        }
    }
}

/// Caller-supplied annotations copied onto every entry of a transfer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferNote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_reference: Option<String>,
}

/// Structured entry metadata
///
/// Fixed record instead of an open map. `version` is bumped whenever a
/// field is added so older rows still deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub version: u16,
    pub operation_type: OperationType,
    pub linked_transaction_id: ReferenceId,
    pub linked_account_id: AccountId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_account_id: Option<AccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_account_id: Option<AccountId>,
    /// Capture time, serialized as ISO-8601
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<TransferNote>,
}

impl EntryMetadata {
    pub const VERSION: u16 = 1;
}

/// Everything needed to create a PENDING entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDraft {
    pub user_id: UserId,
    pub account_id: AccountId,
    pub amount: Amount,
    pub currency: String,
    pub reference_id: ReferenceId,
    pub transaction_type: TransactionType,
    pub metadata: EntryMetadata,
}

/// Persisted ledger entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub account_id: AccountId,
    pub amount: Amount,
    pub currency: String,
    pub reference_id: ReferenceId,
    pub status: TransactionStatus,
    pub transaction_type: TransactionType,
    pub metadata: EntryMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Materialize a draft as a new PENDING entry
    pub fn from_draft(id: TransactionId, draft: TransactionDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: draft.user_id,
            account_id: draft.account_id,
            amount: draft.amount,
            currency: draft.currency,
            reference_id: draft.reference_id,
            status: TransactionStatus::Pending,
            transaction_type: draft.transaction_type,
            metadata: draft.metadata,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.status == TransactionStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    #[test]
    fn test_status_ids() {
        assert_eq!(TransactionStatus::from_id(0), Some(TransactionStatus::Pending));
        assert_eq!(TransactionStatus::from_id(1), Some(TransactionStatus::Success));
        assert_eq!(TransactionStatus::from_id(-1), Some(TransactionStatus::Failed));
        assert_eq!(TransactionStatus::from_id(7), None);
        assert_eq!(TransactionType::from_id(3), Some(TransactionType::OutgoingFee));
        assert_eq!(TransactionType::OutgoingFee.to_string(), "OUTGOING_FEE");
    }

    #[test]
    fn test_metadata_json_shape() {
        let linked = Uuid::new_v4();
        let account = Uuid::new_v4();
        let meta = EntryMetadata {
            version: EntryMetadata::VERSION,
            operation_type: OperationType::FeeTransfer,
            linked_transaction_id: linked,
            linked_account_id: account,
            source_account_id: None,
            destination_account_id: None,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            note: None,
        };

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["operation_type"], "Fee Transfer");
        assert_eq!(json["timestamp"], "2024-01-02T03:04:05Z");
        assert!(json.get("source_account_id").is_none());
        assert!(json.get("note").is_none());

        let back: EntryMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, meta);
    }
}

//! Transfer Stage Definitions
//!
//! ```text
//! VALIDATING → MATERIALIZING → BALANCING → FINALIZING → DONE
//!      ↓             ↓             ↓           ↓
//!                        FAILED
//! ```

use std::fmt;
use tracing::{debug, info};

use crate::core_types::ReferenceId;

/// Per-transfer stage
///
/// Terminal stages: DONE (40), FAILED (-10)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum TransferStage {
    /// Loading and checking both accounts (read-only)
    Validating = 0,

    /// Find-or-create of the PENDING ledger entries
    Materializing = 10,

    /// Source debit and destination credit
    /// CRITICAL: money moves here; every leg is keyed by reference ID
    Balancing = 20,

    /// PENDING -> SUCCESS on every entry
    Finalizing = 30,

    /// Terminal: result assembled
    Done = 40,

    /// Terminal: a step failed
    Failed = -10,
}

impl TransferStage {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStage::Done | TransferStage::Failed)
    }

    /// Balances may already have moved in this stage
    #[inline]
    pub fn has_moved_funds(&self) -> bool {
        matches!(self, TransferStage::Balancing | TransferStage::Finalizing)
    }

    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(TransferStage::Validating),
            10 => Some(TransferStage::Materializing),
            20 => Some(TransferStage::Balancing),
            30 => Some(TransferStage::Finalizing),
            40 => Some(TransferStage::Done),
            -10 => Some(TransferStage::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStage::Validating => "VALIDATING",
            TransferStage::Materializing => "MATERIALIZING",
            TransferStage::Balancing => "BALANCING",
            TransferStage::Finalizing => "FINALIZING",
            TransferStage::Done => "DONE",
            TransferStage::Failed => "FAILED",
        }
    }

    /// Next stage on success, `None` once terminal
    pub fn next(&self) -> Option<Self> {
        match self {
            TransferStage::Validating => Some(TransferStage::Materializing),
            TransferStage::Materializing => Some(TransferStage::Balancing),
            TransferStage::Balancing => Some(TransferStage::Finalizing),
            TransferStage::Finalizing => Some(TransferStage::Done),
            TransferStage::Done | TransferStage::Failed => None,
        }
    }

    /// Strictly linear: only the next stage, or FAILED from a live stage
    pub fn can_transition_to(&self, to: TransferStage) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == TransferStage::Failed || self.next() == Some(to)
    }
}

impl fmt::Display for TransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for TransferStage {
    type Error = ();

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        TransferStage::from_id(value).ok_or(())
    }
}

/// Tracks the stage of one transfer instance and logs transitions
#[derive(Debug)]
pub struct StageTracker {
    source_ref: ReferenceId,
    stage: TransferStage,
}

impl StageTracker {
    pub fn new(source_ref: ReferenceId) -> Self {
        Self {
            source_ref,
            stage: TransferStage::Validating,
        }
    }

    #[inline]
    pub fn current(&self) -> TransferStage {
        self.stage
    }

    /// Move to the next stage; returns the new stage
    pub fn advance(&mut self) -> TransferStage {
        if let Some(next) = self.stage.next() {
            debug!(source_ref = %self.source_ref, from = %self.stage, to = %next, "Stage transition");
            self.stage = next;
            if next == TransferStage::Done {
                info!(source_ref = %self.source_ref, "Transfer reached DONE");
            }
        }
        self.stage
    }

    /// Mark FAILED; returns the stage the failure happened in
    pub fn fail(&mut self) -> TransferStage {
        let at = self.stage;
        if at.can_transition_to(TransferStage::Failed) {
            self.stage = TransferStage::Failed;
        }
        at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_terminal_stages() {
        assert!(TransferStage::Done.is_terminal());
        assert!(TransferStage::Failed.is_terminal());

        assert!(!TransferStage::Validating.is_terminal());
        assert!(!TransferStage::Materializing.is_terminal());
        assert!(!TransferStage::Balancing.is_terminal());
        assert!(!TransferStage::Finalizing.is_terminal());
    }

    #[test]
    fn test_linear_transitions() {
        use TransferStage::*;

        assert!(Validating.can_transition_to(Materializing));
        assert!(Materializing.can_transition_to(Balancing));
        assert!(Balancing.can_transition_to(Finalizing));
        assert!(Finalizing.can_transition_to(Done));

        assert!(!Validating.can_transition_to(Balancing));
        assert!(!Finalizing.can_transition_to(Materializing));
        assert!(!Done.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Validating));

        for stage in [Validating, Materializing, Balancing, Finalizing] {
            assert!(stage.can_transition_to(Failed));
        }
    }

    #[test]
    fn test_invalid_stage_id() {
        assert!(TransferStage::from_id(999).is_none());
        assert_eq!(TransferStage::try_from(20), Ok(TransferStage::Balancing));
    }

    #[test]
    fn test_tracker_walks_to_done() {
        let mut tracker = StageTracker::new(Uuid::new_v4());
        assert_eq!(tracker.current(), TransferStage::Validating);
        tracker.advance();
        tracker.advance();
        tracker.advance();
        assert_eq!(tracker.advance(), TransferStage::Done);
        // DONE is terminal
        assert_eq!(tracker.advance(), TransferStage::Done);
        assert_eq!(tracker.fail(), TransferStage::Done);
        assert_eq!(tracker.current(), TransferStage::Done);
    }

    #[test]
    fn test_tracker_fail_reports_stage() {
        let mut tracker = StageTracker::new(Uuid::new_v4());
        tracker.advance();
        tracker.advance();
        assert_eq!(tracker.fail(), TransferStage::Balancing);
        assert_eq!(tracker.current(), TransferStage::Failed);
    }

    #[test]
    fn test_display() {
        assert_eq!(TransferStage::Validating.to_string(), "VALIDATING");
        assert_eq!(TransferStage::Done.to_string(), "DONE");
        assert!(TransferStage::Finalizing.has_moved_funds());
        assert!(!TransferStage::Materializing.has_moved_funds());
    }
}

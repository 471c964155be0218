//! Stage — The semantic moments of a draw round
//!
//! A Stage is NOT an animation and NOT a UI callback.
//! It is the meaning of a moment in the draw flow.

use serde::{Deserialize, Serialize};

/// Canonical draw stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Stage {
    // ═══════════════════════════════════════════════════════════════════════
    // SPIN LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════
    /// Spin accepted, a winner has been drawn and a step plan built
    SpinRequested {
        /// Position the highlight starts from
        start_index: usize,
        /// Number of planned steps
        total_steps: usize,
    },

    /// Highlight moved to a slot
    StepAdvanced {
        /// Slot the highlight landed on
        index: usize,
    },

    /// Last step of the plan, highlight is on the winner
    FinalStep {
        /// Winning slot
        index: usize,
    },

    /// Spin was cancelled mid-flight, nothing consumed
    SpinCancelled {
        /// Slot the highlight was on when cancelled
        index: usize,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // RESULT
    // ═══════════════════════════════════════════════════════════════════════
    /// Reward stock changed as a result of a win
    StockChanged {
        slot_id: String,
        quantity: u32,
        available: bool,
    },

    /// Spin finished on a slot
    SpinResolved {
        index: usize,
        slot_id: String,
        is_fail: bool,
    },

    /// Caller confirmed the result was shown
    ResultAcknowledged,

    // ═══════════════════════════════════════════════════════════════════════
    // REJECTION
    // ═══════════════════════════════════════════════════════════════════════
    /// Spin request was refused
    SpinRejected {
        /// Machine-readable reason (`busy`, `empty_registry`, `no_eligible_slot`)
        reason: String,
    },
}

impl Stage {
    /// Stage category
    pub fn category(&self) -> StageCategory {
        match self {
            Stage::SpinRequested { .. }
            | Stage::StepAdvanced { .. }
            | Stage::FinalStep { .. }
            | Stage::SpinCancelled { .. } => StageCategory::SpinLifecycle,

            Stage::StockChanged { .. }
            | Stage::SpinResolved { .. }
            | Stage::ResultAcknowledged => StageCategory::Result,

            Stage::SpinRejected { .. } => StageCategory::Rejection,
        }
    }

    /// Stable snake_case name, matches the serde tag
    pub fn type_name(&self) -> &'static str {
        match self {
            Stage::SpinRequested { .. } => "spin_requested",
            Stage::StepAdvanced { .. } => "step_advanced",
            Stage::FinalStep { .. } => "final_step",
            Stage::SpinCancelled { .. } => "spin_cancelled",
            Stage::StockChanged { .. } => "stock_changed",
            Stage::SpinResolved { .. } => "spin_resolved",
            Stage::ResultAcknowledged => "result_acknowledged",
            Stage::SpinRejected { .. } => "spin_rejected",
        }
    }

    /// Slot index the highlight is on for this stage, if any
    pub fn landed_index(&self) -> Option<usize> {
        match self {
            Stage::StepAdvanced { index }
            | Stage::FinalStep { index }
            | Stage::SpinCancelled { index }
            | Stage::SpinResolved { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Does this stage end the animated part of a round?
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Stage::SpinResolved { .. } | Stage::SpinCancelled { .. } | Stage::SpinRejected { .. }
        )
    }
}

/// Grouping used for filtering/routing stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageCategory {
    SpinLifecycle,
    Result,
    Rejection,
}

impl StageCategory {
    pub const ALL: [StageCategory; 3] = [Self::SpinLifecycle, Self::Result, Self::Rejection];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SpinLifecycle => "Spin Lifecycle",
            Self::Result => "Result",
            Self::Rejection => "Rejection",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name_matches_serde_tag() {
        let stages = [
            Stage::SpinRequested {
                start_index: 0,
                total_steps: 10,
            },
            Stage::StepAdvanced { index: 2 },
            Stage::FinalStep { index: 3 },
            Stage::SpinCancelled { index: 1 },
            Stage::StockChanged {
                slot_id: "gift".into(),
                quantity: 4,
                available: true,
            },
            Stage::SpinResolved {
                index: 3,
                slot_id: "gift".into(),
                is_fail: false,
            },
            Stage::ResultAcknowledged,
            Stage::SpinRejected {
                reason: "busy".into(),
            },
        ];

        for stage in stages {
            let json = serde_json::to_value(&stage).unwrap();
            assert_eq!(json["type"], stage.type_name());
        }
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            Stage::StepAdvanced { index: 0 }.category(),
            StageCategory::SpinLifecycle
        );
        assert_eq!(Stage::ResultAcknowledged.category(), StageCategory::Result);
        assert_eq!(
            Stage::SpinRejected {
                reason: "busy".into()
            }
            .category(),
            StageCategory::Rejection
        );
    }

    #[test]
    fn test_terminal_stages() {
        assert!(Stage::SpinCancelled { index: 0 }.is_terminal());
        assert!(
            Stage::SpinRejected {
                reason: "busy".into()
            }
            .is_terminal()
        );
        assert!(!Stage::FinalStep { index: 1 }.is_terminal());
        assert!(!Stage::ResultAcknowledged.is_terminal());
        assert_eq!(StageCategory::ALL[0].display_name(), "Spin Lifecycle");
    }

    #[test]
    fn test_landed_index() {
        assert_eq!(Stage::FinalStep { index: 5 }.landed_index(), Some(5));
        assert_eq!(Stage::ResultAcknowledged.landed_index(), None);
    }
}

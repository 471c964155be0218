//! Winner selection — roulette-wheel draw over eligible slots

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::slot::{FailSlotRule, RewardSlot};

/// Weighted, stock-limited, fail-slot-aware winner selection
///
/// Eligibility is computed from the slot snapshot passed in, not from the
/// cached availability flags, so a stale flag can never leak a winner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionPolicy {
    pub fail_rule: FailSlotRule,
}

impl SelectionPolicy {
    pub fn new(fail_rule: FailSlotRule) -> Self {
        Self { fail_rule }
    }

    /// Weight each slot contributes to the draw (0 when not selectable)
    pub fn eligible_weights(&self, slots: &[RewardSlot]) -> Vec<u64> {
        let gate_open = self.fail_rule.gate_open(slots);
        slots
            .iter()
            .map(|slot| {
                let selectable = if slot.is_fail_slot() {
                    gate_open
                } else {
                    slot.is_reward_selectable()
                };
                if selectable {
                    u64::from(slot.weight())
                } else {
                    0
                }
            })
            .collect()
    }

    /// Is this slot drawable right now?
    pub fn is_selectable(&self, index: usize, slots: &[RewardSlot]) -> bool {
        self.eligible_weights(slots)
            .get(index)
            .is_some_and(|w| *w > 0)
    }

    pub fn total_eligible_weight(&self, slots: &[RewardSlot]) -> u64 {
        self.eligible_weights(slots).iter().sum()
    }

    /// Draw a winner, `None` when nothing is eligible
    ///
    /// Draws uniformly in `[0, total)` and walks slots in order; the first
    /// slot whose cumulative weight exceeds the draw wins.
    pub fn select_winner<R: Rng + ?Sized>(&self, slots: &[RewardSlot], rng: &mut R) -> Option<usize> {
        let weights = self.eligible_weights(slots);
        let total: u64 = weights.iter().sum();
        if total == 0 {
            return None;
        }

        let draw = rng.random_range(0..total);
        let mut cumulative = 0u64;
        for (index, weight) in weights.iter().enumerate() {
            cumulative += weight;
            if draw < cumulative {
                return Some(index);
            }
        }
        None
    }

    /// Probability of each slot winning the next draw
    pub fn odds(&self, slots: &[RewardSlot]) -> Vec<f64> {
        let weights = self.eligible_weights(slots);
        let total: u64 = weights.iter().sum();
        if total == 0 {
            return vec![0.0; slots.len()];
        }
        weights
            .iter()
            .map(|w| *w as f64 / total as f64)
            .collect()
    }
}

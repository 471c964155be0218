//! Landing statistics — how often each slot has been landed on

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::slot::RewardSlot;

/// Per-slot landing counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandingStats {
    counts: BTreeMap<String, u64>,
    total: u64,
    fails: u64,
}

impl LandingStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one resolved spin
    pub fn record(&mut self, slot_id: &str, is_fail: bool) {
        *self.counts.entry(slot_id.to_string()).or_insert(0) += 1;
        self.total += 1;
        if is_fail {
            self.fails += 1;
        }
    }

    pub fn count(&self, slot_id: &str) -> u64 {
        self.counts.get(slot_id).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Landings on fail slots
    pub fn fails(&self) -> u64 {
        self.fails
    }

    /// Share of landings that won something
    pub fn hit_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.total - self.fails) as f64 / self.total as f64
    }

    pub fn reset(&mut self) {
        log::info!("Landing stats reset ({} landings cleared)", self.total);
        *self = Self::default();
    }

    /// Text report in wheel order, as shown on the admin panel
    ///
    /// ```text
    /// Total Landings: 3
    /// ---------------
    /// 00. Tote Bag (tote_bag) = 2
    /// 01. Try Again (try_again) = 1
    /// ```
    pub fn report(&self, slots: &[RewardSlot]) -> String {
        let mut out = String::with_capacity(64 + slots.len() * 32);
        let _ = writeln!(out, "Total Landings: {}", self.total);
        let _ = writeln!(out, "---------------");

        if slots.is_empty() {
            let _ = writeln!(out, "(no slots)");
            return out;
        }

        for (i, slot) in slots.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:02}. {} ({}) = {}",
                i,
                slot.display_name(),
                slot.id(),
                self.count(slot.id())
            );
        }
        out
    }
}

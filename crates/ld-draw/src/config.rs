//! Draw configuration — slot definitions, timing and fail-slot rule

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::slot::{FailSlotRule, RewardSlot, SlotDef};
use crate::timing::SpinTiming;

/// Complete, serializable description of one lucky draw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawConfig {
    /// Draw name (shown in logs and traces)
    pub name: String,

    /// Slots in wheel order
    pub slots: Vec<SlotDef>,

    pub timing: SpinTiming,

    pub fail_rule: FailSlotRule,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            name: "Lucky Draw".to_string(),
            slots: Vec::new(),
            timing: SpinTiming::default(),
            fail_rule: FailSlotRule::default(),
        }
    }
}

impl DrawConfig {
    /// Create an empty config with a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder: add a slot
    pub fn with_slot(mut self, slot: SlotDef) -> Self {
        self.slots.push(slot);
        self
    }

    pub fn with_timing(mut self, timing: SpinTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_fail_rule(mut self, rule: FailSlotRule) -> Self {
        self.fail_rule = rule;
        self
    }

    /// Eight-slot booth wheel used by the kiosk demo
    pub fn demo() -> Self {
        Self::new("Booth Lucky Draw")
            .with_slot(SlotDef::reward("voucher_50", "$50 Voucher", 2, 3))
            .with_slot(SlotDef::reward("tote_bag", "Tote Bag", 10, 20))
            .with_slot(SlotDef::reward("keychain", "Keychain", 20, 50))
            .with_slot(SlotDef::fail("try_again", "Try Again", 25))
            .with_slot(SlotDef::reward("mug", "Branded Mug", 8, 15))
            .with_slot(SlotDef::reward("sticker", "Sticker Pack", 25, 100))
            .with_slot(SlotDef::reward("headphones", "Headphones", 1, 1))
            .with_slot(SlotDef::reward("pen", "Pen", 15, 80))
    }

    /// Parse and validate
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Pretty JSON export
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check structural problems that clamping cannot fix
    ///
    /// Negative numbers are not errors; they are clamped when slots are built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (index, def) in self.slots.iter().enumerate() {
            if def.id.trim().is_empty() {
                return Err(ConfigError::EmptySlotId(index));
            }
            if !seen.insert(def.id.as_str()) {
                return Err(ConfigError::DuplicateSlotId(def.id.clone()));
            }
        }
        self.timing.validate()
    }

    /// Build runtime slots (availability is settled by the registry)
    pub fn build_slots(&self) -> Vec<RewardSlot> {
        self.slots.iter().map(RewardSlot::from_def).collect()
    }

    pub fn fail_slot_count(&self) -> usize {
        self.slots.iter().filter(|s| s.fail).count()
    }
}

//! Reward slot definitions

use serde::{Deserialize, Serialize};

/// When a fail ("no prize") slot may be drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailSlotRule {
    /// Eligible while any real reward still has stock
    #[default]
    RequiresStockedReward,
    /// Eligible while any real reward is itself selectable (stock and weight)
    RequiresSelectableReward,
    /// Eligible whenever its own weight is positive
    Always,
}

impl FailSlotRule {
    /// Does the gate allow fail slots for this slot set?
    pub fn gate_open(&self, slots: &[RewardSlot]) -> bool {
        match self {
            Self::RequiresStockedReward => slots
                .iter()
                .any(|s| !s.is_fail_slot && s.quantity > 0),
            Self::RequiresSelectableReward => slots.iter().any(RewardSlot::is_reward_selectable),
            Self::Always => true,
        }
    }
}

/// Slot definition as written in config files
///
/// Numbers are signed so that bad input can be clamped at the boundary
/// instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotDef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: i64,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub fail: bool,
}

fn default_weight() -> i64 {
    1
}

impl SlotDef {
    /// A real reward
    pub fn reward(id: impl Into<String>, name: impl Into<String>, weight: i64, quantity: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            weight,
            quantity,
            fail: false,
        }
    }

    /// A "no prize" slot
    pub fn fail(id: impl Into<String>, name: impl Into<String>, weight: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            weight,
            quantity: 0,
            fail: true,
        }
    }
}

/// One prize position on the wheel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSlot {
    id: String,
    display_name: String,
    weight: u32,
    quantity: u32,
    default_quantity: u32,
    is_fail_slot: bool,
    is_available: bool,
}

impl RewardSlot {
    /// Create a real reward slot
    pub fn reward(id: impl Into<String>, display_name: impl Into<String>, weight: u32, quantity: u32) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            weight,
            quantity,
            default_quantity: quantity,
            is_fail_slot: false,
            is_available: weight > 0 && quantity > 0,
        }
    }

    /// Create a fail slot (availability is settled by the registry)
    pub fn fail(id: impl Into<String>, display_name: impl Into<String>, weight: u32) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            weight,
            quantity: 0,
            default_quantity: 0,
            is_fail_slot: true,
            is_available: false,
        }
    }

    /// Build from a config definition, clamping negative numbers to 0
    pub fn from_def(def: &SlotDef) -> Self {
        let weight = clamp_non_negative(&def.id, "weight", def.weight);
        let display_name = if def.name.trim().is_empty() {
            def.id.clone()
        } else {
            def.name.clone()
        };

        if def.fail {
            Self::fail(def.id.clone(), display_name, weight)
        } else {
            let quantity = clamp_non_negative(&def.id, "quantity", def.quantity);
            Self::reward(def.id.clone(), display_name, weight, quantity)
        }
    }

    /// Back to a config definition (uses the default stock, not the live one)
    pub fn to_def(&self) -> SlotDef {
        SlotDef {
            id: self.id.clone(),
            name: self.display_name.clone(),
            weight: i64::from(self.weight),
            quantity: i64::from(self.default_quantity),
            fail: self.is_fail_slot,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Remaining stock (always 0 for fail slots)
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn default_quantity(&self) -> u32 {
        self.default_quantity
    }

    pub fn is_fail_slot(&self) -> bool {
        self.is_fail_slot
    }

    /// Selectable under the current stock rules (as of the last refresh)
    pub fn is_available(&self) -> bool {
        self.is_available
    }

    /// A real reward with stock and weight
    pub fn is_reward_selectable(&self) -> bool {
        !self.is_fail_slot && self.quantity > 0 && self.weight > 0
    }

    pub(crate) fn set_display_name(&mut self, name: impl Into<String>) {
        self.display_name = name.into();
    }

    /// Fail slots carry no stock; the call is ignored for them
    pub(crate) fn set_quantity(&mut self, quantity: u32) {
        if !self.is_fail_slot {
            self.quantity = quantity;
        }
    }

    pub(crate) fn set_available(&mut self, available: bool) {
        self.is_available = available;
    }
}

fn clamp_non_negative(id: &str, field: &str, value: i64) -> u32 {
    if value < 0 {
        log::warn!("Slot '{}': negative {} {} clamped to 0", id, field, value);
        0
    } else {
        u32::try_from(value).unwrap_or(u32::MAX)
    }
}

//! Slot Registry — Ordered storage for the wheel's reward slots

use std::fmt;

use crate::slot::{FailSlotRule, RewardSlot};

/// Callback fired with the full slot list after a change
pub type SlotObserver = Box<dyn FnMut(&[RewardSlot]) + Send>;

/// Handle returned by [`SlotRegistry::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Ordered collection of reward slots
///
/// Order is the visual order of the wheel and the order steps walk through.
/// Subscribers hear about replacements and admin edits, not about stock
/// consumed by spins (those go to the presenter as stock-changed events).
pub struct SlotRegistry {
    slots: Vec<RewardSlot>,
    observers: Vec<(SubscriptionId, SlotObserver)>,
    next_subscription: u64,
}

impl SlotRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Create with an initial slot set (availability refreshed, nobody notified)
    pub fn with_slots(slots: Vec<RewardSlot>, rule: FailSlotRule) -> Self {
        let mut registry = Self::new();
        registry.slots = slots;
        registry.refresh_availability(rule);
        registry
    }

    /// Replace the whole slot set and notify subscribers
    pub fn replace(&mut self, slots: Vec<RewardSlot>, rule: FailSlotRule) {
        self.slots = slots;
        self.refresh_availability(rule);
        self.notify_changed();
    }

    /// All slots in wheel order
    pub fn slots(&self) -> &[RewardSlot] {
        &self.slots
    }

    /// Slot at index, `None` when out of range
    pub fn get(&self, index: usize) -> Option<&RewardSlot> {
        self.slots.get(index)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.id() == id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Any slot currently selectable?
    pub fn any_available(&self) -> bool {
        self.slots.iter().any(RewardSlot::is_available)
    }

    /// Register a change observer
    pub fn subscribe(&mut self, observer: SlotObserver) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, observer));
        id
    }

    /// Remove an observer, returns false if it was not registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.observers.len()
    }

    /// Recompute every slot's availability flag
    ///
    /// Fail slots depend on the rest of the wheel, so this always runs over
    /// the full set.
    pub fn refresh_availability(&mut self, rule: FailSlotRule) {
        let gate_open = rule.gate_open(&self.slots);
        for slot in &mut self.slots {
            let available = if slot.is_fail_slot() {
                gate_open && slot.weight() > 0
            } else {
                slot.is_reward_selectable()
            };
            slot.set_available(available);
        }
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut RewardSlot> {
        self.slots.get_mut(index)
    }

    pub(crate) fn notify_changed(&mut self) {
        log::debug!(
            "Slot registry changed ({} slots, {} subscribers)",
            self.slots.len(),
            self.observers.len()
        );
        for (_, observer) in &mut self.observers {
            observer(&self.slots);
        }
    }
}

impl Default for SlotRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SlotRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotRegistry")
            .field("slots", &self.slots)
            .field("subscribers", &self.observers.len())
            .finish()
    }
}

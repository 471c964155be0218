//! Collaborator traits — presentation and quantity persistence
//!
//! The engine never renders or touches files. Hosts plug in a
//! [`SpinPresenter`] for the wheel UI and a [`QuantityStore`] for stock that
//! must survive a restart.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::SpinRejection;

/// Receives everything the wheel UI needs to animate a spin
///
/// All methods default to no-ops.
pub trait SpinPresenter: Send {
    /// Highlight moved to `index`
    fn on_step_advanced(&mut self, _index: usize) {}

    /// Spin landed; the result should be revealed after the reveal delay
    fn on_spin_resolved(&mut self, _index: usize, _is_fail: bool) {}

    fn on_spin_rejected(&mut self, _reason: &SpinRejection) {}

    /// Stock of one slot changed (fired before the result)
    fn on_stock_changed(&mut self, _slot_id: &str, _quantity: u32, _is_available: bool) {}
}

/// Presenter that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl SpinPresenter for NullPresenter {}

/// Persistent stock per slot id
pub trait QuantityStore: Send + Sync {
    /// Stored quantity, `None` when nothing was saved yet
    fn load_quantity(&self, slot_id: &str) -> Option<u32>;

    fn save_quantity(&self, slot_id: &str, quantity: u32);
}

/// In-memory store (tests, simulation, hosts that persist elsewhere)
#[derive(Debug, Default)]
pub struct MemoryQuantityStore {
    quantities: RwLock<HashMap<String, u32>>,
}

impl MemoryQuantityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed from `(id, quantity)` pairs
    pub fn with_quantities<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let quantities = entries.into_iter().map(|(id, q)| (id.into(), q)).collect();
        Self {
            quantities: RwLock::new(quantities),
        }
    }

    pub fn len(&self) -> usize {
        self.quantities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.read().is_empty()
    }

    /// Sorted copy of the stored values
    pub fn snapshot(&self) -> Vec<(String, u32)> {
        let mut entries: Vec<_> = self
            .quantities
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        entries.sort();
        entries
    }
}

impl QuantityStore for MemoryQuantityStore {
    fn load_quantity(&self, slot_id: &str) -> Option<u32> {
        self.quantities.read().get(slot_id).copied()
    }

    fn save_quantity(&self, slot_id: &str, quantity: u32) {
        self.quantities.write().insert(slot_id.to_string(), quantity);
    }
}

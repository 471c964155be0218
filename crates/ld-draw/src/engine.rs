//! Spin Engine — one spin transaction end to end
//!
//! ```text
//! Idle ──request_spin──► Spinning ──steps exhausted──► Resolving ──► AwaitingAck
//!  ▲                        │                                            │
//!  └──────── cancel_spin ───┘◄─────────────── acknowledge_result ────────┘
//! ```
//!
//! The engine is driven from outside: every [`SpinEngine::advance`] call
//! performs one step and returns how long to wait before the next call.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use ld_stage::{SLOW_PHASE_TAG, Stage, StageEvent, StageTrace};

use crate::collaborators::{NullPresenter, QuantityStore, SpinPresenter};
use crate::config::DrawConfig;
use crate::error::{AdminError, AdminResult, ConfigError, SpinRejection};
use crate::names::NameBook;
use crate::planner::{StepEvent, StepPlan, StepPlanner, ms_to_duration};
use crate::registry::{SlotObserver, SlotRegistry, SubscriptionId};
use crate::scheduler::Scheduler;
use crate::selection::SelectionPolicy;
use crate::slot::{FailSlotRule, RewardSlot};
use crate::stats::LandingStats;
use crate::timing::SpinTiming;

/// Where the engine is in the spin cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinState {
    #[default]
    Idle,
    Spinning,
    Resolving,
    AwaitingAck,
}

impl SpinState {
    /// Admin edits are refused while the wheel is moving or settling
    pub fn allows_admin(&self) -> bool {
        !matches!(self, Self::Spinning | Self::Resolving)
    }
}

impl fmt::Display for SpinState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Spinning => "spinning",
            Self::Resolving => "resolving",
            Self::AwaitingAck => "awaiting_ack",
        };
        f.write_str(name)
    }
}

/// Returned when a spin is accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinStarted {
    pub spin_id: u64,
    pub start_index: usize,
    pub total_steps: usize,
    /// Sum of all step delays
    pub duration: Duration,
}

/// Result of a resolved spin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinOutcome {
    pub spin_id: u64,
    pub index: usize,
    pub slot_id: String,
    pub display_name: String,
    pub is_fail: bool,
    /// Remaining stock after the win (`None` for fail slots)
    pub quantity_after: Option<u32>,
    /// Pause before the result should be shown
    pub reveal_after: Duration,
}

/// What one [`SpinEngine::advance`] call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Highlight moved; wait `delay` before advancing again
    Step(StepEvent),
    /// Plan exhausted, spin resolved and waiting for acknowledgement
    Resolved(SpinOutcome),
    /// No spin in flight
    Idle,
}

/// In-flight spin
#[derive(Debug)]
struct SpinSession {
    spin_id: u64,
    target_index: usize,
    target_id: String,
    plan: StepPlan,
}

/// Lucky draw spin engine
///
/// Owns the slot registry, the wheel position and the stock bookkeeping.
/// Nothing else mutates slots while a spin is in flight.
pub struct SpinEngine {
    /// Draw name, stamped on traces
    draw_id: String,
    /// Slots in wheel order
    registry: SlotRegistry,
    /// Winner selection
    selection: SelectionPolicy,
    /// Step planner (holds normalized timing)
    planner: StepPlanner,
    /// Timing as configured
    timing: SpinTiming,
    /// Random number generator
    rng: ChaCha8Rng,
    /// Current state
    state: SpinState,
    /// Highlight position, unset until the first spin
    current_index: Option<usize>,
    /// In-flight spin
    session: Option<SpinSession>,
    /// Presentation collaborator
    presenter: Box<dyn SpinPresenter>,
    /// Persistence collaborator
    store: Option<Arc<dyn QuantityStore>>,
    /// Landing counters
    stats: LandingStats,
    /// Admin name overrides
    names: NameBook,
    /// Trace of the current/last spin
    trace: Option<StageTrace>,
    /// Virtual time within the current spin (ms)
    timeline_ms: f64,
    /// Spin attempts that reached the draw (accepted or rejected)
    spin_count: u64,
}

impl SpinEngine {
    /// Create an engine for a draw
    pub fn new(config: DrawConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let registry = SlotRegistry::with_slots(config.build_slots(), config.fail_rule);
        log::info!(
            "Draw '{}' loaded: {} slots ({} fail), rule {:?}",
            config.name,
            registry.len(),
            config.fail_slot_count(),
            config.fail_rule
        );

        Ok(Self {
            draw_id: config.name,
            registry,
            selection: SelectionPolicy::new(config.fail_rule),
            planner: StepPlanner::new(&config.timing),
            timing: config.timing,
            rng: ChaCha8Rng::from_os_rng(),
            state: SpinState::Idle,
            current_index: None,
            session: None,
            presenter: Box::new(NullPresenter),
            store: None,
            stats: LandingStats::new(),
            names: NameBook::new(),
            trace: None,
            timeline_ms: 0.0,
            spin_count: 0,
        })
    }

    /// Builder: attach a presenter
    pub fn with_presenter(mut self, presenter: impl SpinPresenter + 'static) -> Self {
        self.presenter = Box::new(presenter);
        self
    }

    /// Builder: attach a quantity store; stored quantities override defaults
    pub fn with_store(mut self, store: Arc<dyn QuantityStore>) -> Self {
        self.store = Some(store);
        self.load_stored_quantities();
        self
    }

    /// Builder: deterministic RNG
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed(seed);
        self
    }

    /// Reseed the RNG
    pub fn seed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // SPIN FLOW
    // ═══════════════════════════════════════════════════════════════════════

    /// Start a spin
    ///
    /// On rejection nothing changes except that the presenter is told.
    pub fn request_spin(&mut self) -> Result<SpinStarted, SpinRejection> {
        if self.state != SpinState::Idle {
            log::warn!("Spin rejected: engine is {}", self.state);
            return Err(self.reject(SpinRejection::Busy));
        }
        if self.registry.is_empty() {
            self.current_index = None;
            return Err(self.reject_with_trace(SpinRejection::EmptyRegistry));
        }

        let Some(target_index) = self.selection.select_winner(self.registry.slots(), &mut self.rng)
        else {
            return Err(self.reject_with_trace(SpinRejection::NoEligibleSlot));
        };

        let slot_count = self.registry.len();
        let start_index = match self.current_index {
            Some(index) if index < slot_count => index,
            _ => self.rng.random_range(0..slot_count),
        };
        self.current_index = Some(start_index);

        let plan = self
            .planner
            .plan(start_index, target_index, slot_count, &mut self.rng);
        let total_steps = plan.total_steps();
        let duration = plan.total_duration();

        self.spin_count += 1;
        let spin_id = self.spin_count;
        let target_id = self
            .registry
            .get(target_index)
            .map(|s| s.id().to_string())
            .unwrap_or_default();

        self.timeline_ms = 0.0;
        let mut trace = StageTrace::new(spin_id, self.draw_id.clone());
        trace.record(
            Stage::SpinRequested {
                start_index,
                total_steps,
            },
            0.0,
        );
        self.trace = Some(trace);

        log::debug!(
            "Spin #{} accepted: {} steps from {} ({:?})",
            spin_id,
            total_steps,
            start_index,
            duration
        );

        self.session = Some(SpinSession {
            spin_id,
            target_index,
            target_id,
            plan,
        });
        self.state = SpinState::Spinning;

        Ok(SpinStarted {
            spin_id,
            start_index,
            total_steps,
            duration,
        })
    }

    /// Perform the next step, or resolve once the plan is exhausted
    pub fn advance(&mut self) -> Advance {
        if self.state != SpinState::Spinning {
            return Advance::Idle;
        }
        let Some(session) = self.session.as_mut() else {
            self.state = SpinState::Idle;
            return Advance::Idle;
        };

        let slow_phase = session.plan.remaining() <= session.plan.shape().slow_steps;
        match session.plan.next() {
            Some(step) => {
                self.current_index = Some(step.landed_index);
                let stage = if step.is_final {
                    Stage::FinalStep {
                        index: step.landed_index,
                    }
                } else {
                    Stage::StepAdvanced {
                        index: step.landed_index,
                    }
                };
                if slow_phase {
                    self.record_tagged(stage, SLOW_PHASE_TAG);
                } else {
                    self.record(stage);
                }
                self.timeline_ms += step.delay.as_secs_f64() * 1000.0;
                self.presenter.on_step_advanced(step.landed_index);
                Advance::Step(step)
            }
            None => match self.resolve() {
                Some(outcome) => Advance::Resolved(outcome),
                None => Advance::Idle,
            },
        }
    }

    /// Run a whole spin against a scheduler
    ///
    /// Returns once the spin has resolved; the engine is left in
    /// [`SpinState::AwaitingAck`].
    pub fn spin_blocking<S: Scheduler + ?Sized>(
        &mut self,
        scheduler: &mut S,
    ) -> Result<SpinOutcome, SpinRejection> {
        self.request_spin()?;
        self.run_to_resolution(scheduler)
    }

    fn run_to_resolution<S: Scheduler + ?Sized>(
        &mut self,
        scheduler: &mut S,
    ) -> Result<SpinOutcome, SpinRejection> {
        loop {
            match self.advance() {
                Advance::Step(step) => scheduler.sleep(step.delay),
                Advance::Resolved(outcome) => return Ok(outcome),
                Advance::Idle => {
                    // Only reachable if the winning slot disappeared mid-spin
                    log::error!("Spin #{} ended without resolving", self.spin_count);
                    return Err(SpinRejection::Aborted);
                }
            }
        }
    }

    /// Confirm the result was shown; no-op outside `AwaitingAck`
    pub fn acknowledge_result(&mut self) -> bool {
        if self.state != SpinState::AwaitingAck {
            log::debug!("Acknowledge ignored in state {}", self.state);
            return false;
        }
        self.timeline_ms += self.timing.result_reveal_delay_ms.max(0.0);
        self.record(Stage::ResultAcknowledged);
        self.state = SpinState::Idle;
        true
    }

    /// Abort the spin in flight; only accepted while `Spinning`
    ///
    /// Stock is only touched on resolution, so nothing is consumed.
    pub fn cancel_spin(&mut self) -> bool {
        if self.state != SpinState::Spinning {
            return false;
        }
        let spin_id = self.session.take().map_or(0, |s| s.spin_id);
        let index = self.current_index.unwrap_or(0);
        self.record(Stage::SpinCancelled { index });
        self.state = SpinState::Idle;
        log::info!("Spin #{} cancelled at slot {}", spin_id, index);
        true
    }

    fn resolve(&mut self) -> Option<SpinOutcome> {
        let session = self.session.take()?;
        self.state = SpinState::Resolving;

        let index = session.target_index;
        self.current_index = Some(index);

        let Some(slot) = self.registry.get(index) else {
            log::warn!("Spin #{}: slot {} vanished", session.spin_id, index);
            self.state = SpinState::Idle;
            return None;
        };
        let is_fail = slot.is_fail_slot();
        let display_name = slot.display_name().to_string();
        let slot_id = session.target_id;

        let quantity_after = if is_fail {
            None
        } else {
            Some(self.consume_stock(index))
        };

        self.stats.record(&slot_id, is_fail);
        self.record(Stage::SpinResolved {
            index,
            slot_id: slot_id.clone(),
            is_fail,
        });
        self.presenter.on_spin_resolved(index, is_fail);

        log::info!(
            "Spin #{} landed on {} '{}'{}",
            session.spin_id,
            index,
            display_name,
            if is_fail { " (no prize)" } else { "" }
        );

        let outcome = SpinOutcome {
            spin_id: session.spin_id,
            index,
            slot_id,
            display_name,
            is_fail,
            quantity_after,
            reveal_after: ms_to_duration(self.timing.result_reveal_delay_ms),
        };
        self.state = SpinState::AwaitingAck;
        Some(outcome)
    }

    /// Take one unit of stock from a won slot
    fn consume_stock(&mut self, index: usize) -> u32 {
        let Some(slot) = self.registry.get_mut(index) else {
            return 0;
        };
        let remaining = slot.quantity().saturating_sub(1);
        slot.set_quantity(remaining);
        self.registry.refresh_availability(self.selection.fail_rule);
        self.publish_stock(index);
        remaining
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ADMIN
    // ═══════════════════════════════════════════════════════════════════════

    /// Set remaining stock for a slot (negative values clamp to 0)
    pub fn set_quantity(&mut self, slot_id: &str, quantity: i64) -> AdminResult<u32> {
        self.ensure_admin_allowed()?;
        let index = self.find_slot(slot_id)?;

        let quantity = if quantity < 0 {
            log::warn!("Slot '{}': negative quantity {} clamped to 0", slot_id, quantity);
            0
        } else {
            u32::try_from(quantity).unwrap_or(u32::MAX)
        };
        Ok(self.apply_quantity(index, quantity))
    }

    /// Restore the configured stock for a slot
    pub fn reset_quantity_to_default(&mut self, slot_id: &str) -> AdminResult<u32> {
        self.ensure_admin_allowed()?;
        let index = self.find_slot(slot_id)?;
        let default = self
            .registry
            .get(index)
            .map_or(0, RewardSlot::default_quantity);
        Ok(self.apply_quantity(index, default))
    }

    fn apply_quantity(&mut self, index: usize, quantity: u32) -> u32 {
        if let Some(slot) = self.registry.get_mut(index) {
            slot.set_quantity(quantity);
        }
        self.registry.refresh_availability(self.selection.fail_rule);
        self.publish_stock(index);
        self.registry.notify_changed();
        self.registry.get(index).map_or(0, RewardSlot::quantity)
    }

    /// Rename a slot; blank names are ignored
    pub fn rename_slot(&mut self, slot_id: &str, name: &str) -> AdminResult<()> {
        self.ensure_admin_allowed()?;
        let index = self.find_slot(slot_id)?;
        if name.trim().is_empty() {
            log::debug!("Blank name for '{}' ignored", slot_id);
            return Ok(());
        }

        self.names.set(slot_id, name);
        if let Some(slot) = self.registry.get_mut(index) {
            slot.set_display_name(name);
        }
        self.registry.notify_changed();
        Ok(())
    }

    /// Apply every non-empty override from a name book, returns how many slots changed
    pub fn apply_names(&mut self, book: &NameBook) -> AdminResult<usize> {
        self.ensure_admin_allowed()?;

        let mut applied = 0;
        for (slot_id, name) in book.overrides() {
            self.names.set(slot_id, name);
            let Some(index) = self.registry.index_of(slot_id) else {
                continue;
            };
            if let Some(slot) = self.registry.get_mut(index) {
                if slot.display_name() != name {
                    slot.set_display_name(name);
                    applied += 1;
                }
            }
        }

        if applied > 0 {
            self.registry.notify_changed();
        }
        Ok(applied)
    }

    /// Swap in a new slot set, timing and rule
    ///
    /// Stored quantities and name overrides are re-applied to the new slots.
    pub fn replace_slots(&mut self, config: DrawConfig) -> AdminResult<()> {
        self.ensure_admin_allowed()?;
        config.validate()?;

        let mut slots = config.build_slots();
        for slot in &mut slots {
            if let Some(q) = self.stored_quantity(slot) {
                slot.set_quantity(q);
            }
            if let Some(name) = self.names.get(slot.id()).filter(|n| !n.is_empty()) {
                slot.set_display_name(name);
            }
        }

        self.selection = SelectionPolicy::new(config.fail_rule);
        self.planner = StepPlanner::new(&config.timing);
        self.timing = config.timing;
        self.draw_id = config.name;
        self.registry.replace(slots, config.fail_rule);

        let len = self.registry.len();
        self.current_index = self.current_index.filter(|i| *i < len);
        if self.state == SpinState::AwaitingAck {
            self.state = SpinState::Idle;
        }

        log::info!("Draw '{}' reloaded with {} slots", self.draw_id, len);
        Ok(())
    }

    /// Import a draw from JSON (see [`DrawConfig::from_json`])
    pub fn import_config(&mut self, json: &str) -> AdminResult<()> {
        let config = DrawConfig::from_json(json)?;
        self.replace_slots(config)
    }

    /// Current draw as config JSON (configured stock, not remaining stock)
    pub fn export_config(&self) -> Result<String, ConfigError> {
        self.config().to_json()
    }

    /// Current draw as a config
    pub fn config(&self) -> DrawConfig {
        DrawConfig {
            name: self.draw_id.clone(),
            slots: self.registry.slots().iter().map(RewardSlot::to_def).collect(),
            timing: self.timing.clone(),
            fail_rule: self.selection.fail_rule,
        }
    }

    pub fn set_timing(&mut self, timing: SpinTiming) -> AdminResult<()> {
        self.ensure_admin_allowed()?;
        timing.validate()?;
        self.planner = StepPlanner::new(&timing);
        self.timing = timing;
        Ok(())
    }

    pub fn set_fail_rule(&mut self, rule: FailSlotRule) -> AdminResult<()> {
        self.ensure_admin_allowed()?;
        self.selection = SelectionPolicy::new(rule);
        self.registry.refresh_availability(rule);
        self.registry.notify_changed();
        Ok(())
    }

    /// Observe registry changes (replacement and admin edits)
    pub fn subscribe(&mut self, observer: SlotObserver) -> SubscriptionId {
        self.registry.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.registry.unsubscribe(id)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn state(&self) -> SpinState {
        self.state
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn draw_id(&self) -> &str {
        &self.draw_id
    }

    pub fn registry(&self) -> &SlotRegistry {
        &self.registry
    }

    pub fn slots(&self) -> &[RewardSlot] {
        self.registry.slots()
    }

    pub fn timing(&self) -> &SpinTiming {
        &self.timing
    }

    pub fn fail_rule(&self) -> FailSlotRule {
        self.selection.fail_rule
    }

    pub fn names(&self) -> &NameBook {
        &self.names
    }

    pub fn landing_stats(&self) -> &LandingStats {
        &self.stats
    }

    pub fn reset_landing_stats(&mut self) {
        self.stats.reset();
    }

    /// Trace of the current or most recent spin attempt
    pub fn last_trace(&self) -> Option<&StageTrace> {
        self.trace.as_ref()
    }

    /// Probability of each slot winning the next spin
    pub fn odds(&self) -> Vec<f64> {
        self.selection.odds(self.registry.slots())
    }

    pub fn spin_count(&self) -> u64 {
        self.spin_count
    }

    // ═══════════════════════════════════════════════════════════════════════
    // INTERNALS
    // ═══════════════════════════════════════════════════════════════════════

    fn ensure_admin_allowed(&self) -> AdminResult<()> {
        if self.state.allows_admin() {
            Ok(())
        } else {
            log::warn!("Admin change refused while {}", self.state);
            Err(AdminError::Busy(self.state))
        }
    }

    fn find_slot(&self, slot_id: &str) -> AdminResult<usize> {
        self.registry.index_of(slot_id).ok_or_else(|| {
            log::warn!("Admin change for unknown slot '{}'", slot_id);
            AdminError::UnknownSlot(slot_id.to_string())
        })
    }

    fn stored_quantity(&self, slot: &RewardSlot) -> Option<u32> {
        if slot.is_fail_slot() {
            return None;
        }
        self.store.as_ref()?.load_quantity(slot.id())
    }

    fn load_stored_quantities(&mut self) {
        let mut loaded = 0;
        for index in 0..self.registry.len() {
            let stored = self
                .registry
                .get(index)
                .and_then(|slot| self.stored_quantity(slot));
            if let (Some(q), Some(slot)) = (stored, self.registry.get_mut(index)) {
                slot.set_quantity(q);
                loaded += 1;
            }
        }
        self.registry.refresh_availability(self.selection.fail_rule);
        log::debug!("Loaded {} stored quantities", loaded);
    }

    /// Persist and announce the stock of one slot
    fn publish_stock(&mut self, index: usize) {
        let Some(slot) = self.registry.get(index) else {
            return;
        };
        if slot.is_fail_slot() {
            return;
        }
        let slot_id = slot.id().to_string();
        let quantity = slot.quantity();
        let available = slot.is_available();

        if let Some(store) = &self.store {
            store.save_quantity(&slot_id, quantity);
        }
        self.presenter.on_stock_changed(&slot_id, quantity, available);
        if self.state == SpinState::Resolving {
            self.record(Stage::StockChanged {
                slot_id,
                quantity,
                available,
            });
        }
    }

    fn record(&mut self, stage: Stage) {
        if let Some(trace) = self.trace.as_mut() {
            trace.record(stage, self.timeline_ms);
        }
    }

    fn record_tagged(&mut self, stage: Stage, tag: &str) {
        if let Some(trace) = self.trace.as_mut() {
            let event = StageEvent::new(stage, self.timeline_ms)
                .with_spin(trace.spin_id)
                .with_tag(tag);
            trace.push(event);
        }
    }

    fn reject(&mut self, reason: SpinRejection) -> SpinRejection {
        self.presenter.on_spin_rejected(&reason);
        reason
    }

    /// Rejection from `Idle`: counted as an attempt with its own trace
    fn reject_with_trace(&mut self, reason: SpinRejection) -> SpinRejection {
        log::warn!("Spin rejected: {}", reason);
        self.spin_count += 1;
        self.timeline_ms = 0.0;
        let mut trace = StageTrace::new(self.spin_count, self.draw_id.clone());
        trace.record(
            Stage::SpinRejected {
                reason: reason.code().to_string(),
            },
            0.0,
        );
        self.trace = Some(trace);
        self.reject(reason)
    }
}

impl fmt::Debug for SpinEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpinEngine")
            .field("draw_id", &self.draw_id)
            .field("state", &self.state)
            .field("current_index", &self.current_index)
            .field("slots", &self.registry.len())
            .field("spin_count", &self.spin_count)
            .finish()
    }
}

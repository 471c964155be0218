//! End-to-End Spin Scenario Tests
//!
//! Drives the engine the way a kiosk does:
//! - Weighted, stock-limited winner selection
//! - Step walk shape and landing
//! - Stock consumption, cancellation and admin edits
//! - Persistence, presenter callbacks and traces

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use approx::assert_relative_eq;
use parking_lot::Mutex;

use ld_draw::{
    AdminError, Advance, ConfigError, DrawConfig, FailSlotRule, MemoryQuantityStore, NameBook,
    QuantityStore, SlotDef, SpinEngine, SpinOutcome, SpinPresenter, SpinRejection, SpinState,
    SpinTiming, StepPlanner, VirtualClock,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const SEED: u64 = 0x5EED;

fn scenario_config(rule: FailSlotRule) -> DrawConfig {
    DrawConfig::new("scenario")
        .with_slot(SlotDef::reward("a", "Prize A", 10, 2))
        .with_slot(SlotDef::reward("b", "Prize B", 0, 5))
        .with_slot(SlotDef::fail("fail", "Try Again", 10))
        .with_timing(SpinTiming::studio())
        .with_fail_rule(rule)
}

fn engine_for(config: DrawConfig) -> SpinEngine {
    SpinEngine::new(config).unwrap().with_seed(SEED)
}

/// Run one spin to the end and acknowledge it
fn spin_once(
    engine: &mut SpinEngine,
    clock: &mut VirtualClock,
) -> Result<SpinOutcome, SpinRejection> {
    let outcome = engine.spin_blocking(clock)?;
    assert!(engine.acknowledge_result());
    Ok(outcome)
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Step(usize),
    Resolved(usize, bool),
    Rejected(SpinRejection),
    Stock(String, u32, bool),
}

#[derive(Clone, Default)]
struct RecordingPresenter {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl SpinPresenter for RecordingPresenter {
    fn on_step_advanced(&mut self, index: usize) {
        self.calls.lock().push(Call::Step(index));
    }

    fn on_spin_resolved(&mut self, index: usize, is_fail: bool) {
        self.calls.lock().push(Call::Resolved(index, is_fail));
    }

    fn on_spin_rejected(&mut self, reason: &SpinRejection) {
        self.calls.lock().push(Call::Rejected(reason.clone()));
    }

    fn on_stock_changed(&mut self, slot_id: &str, quantity: u32, is_available: bool) {
        self.calls
            .lock()
            .push(Call::Stock(slot_id.to_string(), quantity, is_available));
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SELECTION SCENARIOS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_weightless_slot_never_wins_and_fail_takes_over() {
    let mut engine = engine_for(scenario_config(FailSlotRule::RequiresStockedReward));
    let mut clock = VirtualClock::new();
    let mut a_wins = 0;

    for _ in 0..60 {
        let outcome = spin_once(&mut engine, &mut clock).unwrap();
        assert_ne!(outcome.slot_id, "b");
        if outcome.slot_id == "a" {
            a_wins += 1;
        }
    }

    // A is exhausted after two wins; everything after that is FAIL
    assert_eq!(a_wins, 2);
    assert_eq!(engine.slots()[0].quantity(), 0);
    assert_eq!(engine.slots()[1].quantity(), 5);
    for _ in 0..20 {
        let outcome = spin_once(&mut engine, &mut clock).unwrap();
        assert_eq!(outcome.slot_id, "fail");
        assert!(outcome.is_fail);
    }
}

#[test]
fn test_strict_rule_rejects_once_rewards_unselectable() {
    let mut engine = engine_for(scenario_config(FailSlotRule::RequiresSelectableReward));
    engine.set_quantity("a", 0).unwrap();

    assert_eq!(engine.request_spin(), Err(SpinRejection::NoEligibleSlot));
    assert_eq!(engine.state(), SpinState::Idle);
    assert_eq!(engine.slots()[1].quantity(), 5);
}

#[test]
fn test_frequencies_follow_weights() {
    let config = DrawConfig::new("frequencies")
        .with_slot(SlotDef::reward("common", "Common", 7, 1_000_000))
        .with_slot(SlotDef::reward("rare", "Rare", 1, 1_000_000))
        .with_slot(SlotDef::fail("none", "Try Again", 2))
        .with_timing(SpinTiming::studio());
    let mut engine = engine_for(config);
    let mut clock = VirtualClock::new();
    let spins = 20_000;

    for _ in 0..spins {
        spin_once(&mut engine, &mut clock).unwrap();
    }

    let stats = engine.landing_stats();
    assert_eq!(stats.total(), spins);
    assert_relative_eq!(stats.count("common") as f64 / spins as f64, 0.7, epsilon = 0.02);
    assert_relative_eq!(stats.count("rare") as f64 / spins as f64, 0.1, epsilon = 0.02);
    assert_relative_eq!(stats.count("none") as f64 / spins as f64, 0.2, epsilon = 0.02);
}

#[test]
fn test_same_seed_same_draws() {
    let run = || {
        let mut engine = engine_for(DrawConfig {
            timing: SpinTiming::studio(),
            ..DrawConfig::demo()
        });
        let mut clock = VirtualClock::new();
        (0..25)
            .map(|_| spin_once(&mut engine, &mut clock).map(|o| o.index))
            .collect::<Vec<_>>()
    };

    assert_eq!(run(), run());
}

// ═══════════════════════════════════════════════════════════════════════════════
// STEP WALK
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_walk_from_zero_to_three_on_eight_slots() {
    let timing = SpinTiming {
        min_cycles: 3,
        max_cycles: 4,
        final_slow_steps: 3,
        ..SpinTiming::normal()
    };
    let planner = StepPlanner::new(&timing);
    let mut rng = ChaCha8Rng::seed_from_u64(SEED);

    for _ in 0..100 {
        let plan = planner.plan(0, 3, 8, &mut rng);
        let extra = plan.shape().extra_steps as usize;
        let steps: Vec<_> = plan.collect();

        assert!(steps.len() >= 24 + extra);
        assert_eq!(steps.last().unwrap().landed_index, 3);

        let tail: Vec<_> = steps[steps.len() - 4..].iter().map(|s| s.landed_index).collect();
        assert_eq!(tail, vec![0, 1, 2, 3]);
    }
}

#[test]
fn test_engine_walk_matches_trace() {
    let mut engine = engine_for(DrawConfig {
        timing: SpinTiming::normal(),
        ..DrawConfig::demo()
    });
    let started = engine.request_spin().unwrap();

    let mut path = Vec::new();
    let mut waited = std::time::Duration::ZERO;
    let outcome = loop {
        match engine.advance() {
            Advance::Step(step) => {
                path.push(step.landed_index);
                waited += step.delay;
            }
            Advance::Resolved(outcome) => break outcome,
            Advance::Idle => panic!("spin stopped early"),
        }
    };

    assert_eq!(path.len(), started.total_steps);
    assert_eq!(waited, started.duration);
    assert_eq!(*path.last().unwrap(), outcome.index);

    let trace = engine.last_trace().unwrap();
    assert_eq!(trace.path(), path);
    assert_eq!(trace.resolution(), Some((outcome.index, outcome.is_fail)));

    let validation = trace.validate();
    assert!(validation.is_valid(), "{:?}", validation.warnings());
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATE MACHINE
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_request_while_busy_is_rejected() {
    let presenter = RecordingPresenter::default();
    let calls = Arc::clone(&presenter.calls);
    let mut engine = engine_for(scenario_config(FailSlotRule::default())).with_presenter(presenter);
    let mut clock = VirtualClock::new();

    let quantities =
        |e: &SpinEngine| -> Vec<u32> { e.slots().iter().map(|s| s.quantity()).collect() };

    engine.request_spin().unwrap();
    engine.advance();
    let (index, stock) = (engine.current_index(), quantities(&engine));
    assert_eq!(engine.request_spin(), Err(SpinRejection::Busy));
    assert_eq!(engine.state(), SpinState::Spinning);
    assert_eq!(engine.current_index(), index);
    assert_eq!(quantities(&engine), stock);

    while let Advance::Step(_) = engine.advance() {}
    assert_eq!(engine.state(), SpinState::AwaitingAck);
    let (index, stock) = (engine.current_index(), quantities(&engine));
    assert_eq!(engine.spin_blocking(&mut clock), Err(SpinRejection::Busy));
    assert_eq!(engine.current_index(), index);
    assert_eq!(quantities(&engine), stock);

    let rejections = calls
        .lock()
        .iter()
        .filter(|c| matches!(c, Call::Rejected(SpinRejection::Busy)))
        .count();
    assert_eq!(rejections, 2);
}

#[test]
fn test_acknowledge_outside_awaiting_ack_is_noop() {
    let mut engine = engine_for(scenario_config(FailSlotRule::default()));
    assert!(!engine.acknowledge_result());
    assert_eq!(engine.state(), SpinState::Idle);

    engine.request_spin().unwrap();
    assert!(!engine.acknowledge_result());
    assert_eq!(engine.state(), SpinState::Spinning);
}

#[test]
fn test_stock_event_comes_before_result() {
    let presenter = RecordingPresenter::default();
    let calls = Arc::clone(&presenter.calls);
    let config = DrawConfig::new("single")
        .with_slot(SlotDef::reward("mug", "Mug", 1, 1))
        .with_timing(SpinTiming::studio());
    let mut engine = engine_for(config).with_presenter(presenter);
    let mut clock = VirtualClock::new();

    let outcome = spin_once(&mut engine, &mut clock).unwrap();
    assert_eq!(outcome.quantity_after, Some(0));

    let calls = calls.lock();
    let n = calls.len();
    assert_eq!(calls[n - 2], Call::Stock("mug".to_string(), 0, false));
    assert_eq!(calls[n - 1], Call::Resolved(0, false));
    drop(calls);

    assert_eq!(engine.request_spin(), Err(SpinRejection::NoEligibleSlot));
}

#[test]
fn test_cancel_consumes_nothing() {
    let mut engine = engine_for(scenario_config(FailSlotRule::default()));
    engine.request_spin().unwrap();
    for _ in 0..3 {
        engine.advance();
    }
    let parked = engine.current_index();

    assert!(engine.cancel_spin());
    assert_eq!(engine.state(), SpinState::Idle);
    assert_eq!(engine.current_index(), parked);
    assert_eq!(engine.slots()[0].quantity(), 2);
    assert_eq!(engine.landing_stats().total(), 0);
    assert!(engine.last_trace().unwrap().has_stage("spin_cancelled"));

    // Next spin starts from where the highlight stopped
    let started = engine.request_spin().unwrap();
    assert_eq!(Some(started.start_index), parked);
}

#[test]
fn test_position_persists_across_spins() {
    let mut engine = engine_for(DrawConfig {
        timing: SpinTiming::studio(),
        ..DrawConfig::demo()
    });
    let mut clock = VirtualClock::new();

    let first = spin_once(&mut engine, &mut clock).unwrap();
    let started = engine.request_spin().unwrap();
    assert_eq!(started.start_index, first.index);
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADMIN & PERSISTENCE
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_admin_changes_notify_subscribers() {
    let mut engine = engine_for(scenario_config(FailSlotRule::default()));
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = Arc::clone(&hits);
    let id = engine.subscribe(Box::new(move |_slots| {
        hits_clone.fetch_add(1, Ordering::SeqCst);
    }));

    engine.set_quantity("a", 7).unwrap();
    engine.reset_quantity_to_default("a").unwrap();
    engine.rename_slot("b", "Mystery Box").unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 3);

    // Spin resolution is not a registry change
    let mut clock = VirtualClock::new();
    spin_once(&mut engine, &mut clock).unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 3);

    engine.replace_slots(scenario_config(FailSlotRule::Always)).unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 4);

    assert!(engine.unsubscribe(id));
    engine.set_quantity("a", 1).unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 4);
}

#[test]
fn test_admin_refused_mid_spin() {
    let mut engine = engine_for(scenario_config(FailSlotRule::default()));
    engine.request_spin().unwrap();

    let busy = AdminError::Busy(SpinState::Spinning);
    assert_eq!(engine.set_quantity("a", 9), Err(busy.clone()));
    assert_eq!(engine.reset_quantity_to_default("a"), Err(busy.clone()));
    assert_eq!(engine.rename_slot("a", "Nope"), Err(busy.clone()));
    assert_eq!(engine.replace_slots(DrawConfig::demo()), Err(busy));
    assert_eq!(engine.slots()[0].quantity(), 2);
    assert_eq!(engine.slots()[0].display_name(), "Prize A");
}

#[test]
fn test_stored_quantities_override_defaults() {
    let store = Arc::new(MemoryQuantityStore::with_quantities([("a", 1), ("fail", 9)]));
    let mut engine = engine_for(scenario_config(FailSlotRule::default())).with_store(store.clone());
    let mut clock = VirtualClock::new();

    assert_eq!(engine.slots()[0].quantity(), 1);
    assert_eq!(engine.slots()[0].default_quantity(), 2);
    assert_eq!(engine.slots()[2].quantity(), 0);

    // Win the last A, then the store reflects it
    while engine.slots()[0].quantity() > 0 {
        spin_once(&mut engine, &mut clock).unwrap();
    }
    assert_eq!(store.load_quantity("a"), Some(0));

    engine.reset_quantity_to_default("a").unwrap();
    assert_eq!(store.load_quantity("a"), Some(2));
}

#[test]
fn test_names_applied_and_survive_reload() {
    let mut engine = engine_for(scenario_config(FailSlotRule::default()));
    let mut book = NameBook::new();
    book.set("a", "Grand Prize");
    book.set("b", "");
    book.set("ghost", "Not on this wheel");

    assert_eq!(engine.apply_names(&book), Ok(1));
    assert_eq!(engine.slots()[0].display_name(), "Grand Prize");
    assert_eq!(engine.slots()[1].display_name(), "Prize B");

    engine.replace_slots(scenario_config(FailSlotRule::default())).unwrap();
    assert_eq!(engine.slots()[0].display_name(), "Grand Prize");
}

#[test]
fn test_config_import_export() {
    let mut engine = engine_for(scenario_config(FailSlotRule::default()));
    let json = DrawConfig::demo().to_json().unwrap();

    engine.import_config(&json).unwrap();
    assert_eq!(engine.slots().len(), 8);
    assert_eq!(engine.draw_id(), "Booth Lucky Draw");
    assert_eq!(engine.config(), DrawConfig::demo());

    let bad = r#"{ "slots": [ { "id": "x" }, { "id": "x" } ] }"#;
    assert_eq!(
        engine.import_config(bad),
        Err(AdminError::Config(ConfigError::DuplicateSlotId("x".to_string())))
    );
    assert_eq!(engine.slots().len(), 8);
}

#[test]
fn test_landing_stats_report() {
    let mut engine = engine_for(scenario_config(FailSlotRule::default()));
    let mut clock = VirtualClock::new();
    for _ in 0..10 {
        spin_once(&mut engine, &mut clock).unwrap();
    }

    let stats = engine.landing_stats();
    assert_eq!(stats.total(), 10);
    assert_eq!(stats.count("a") + stats.count("fail"), 10);

    let report = stats.report(engine.slots());
    assert!(report.starts_with("Total Landings: 10\n---------------\n"));
    assert!(report.contains("01. Prize B (b) = 0"));

    engine.reset_landing_stats();
    assert_eq!(engine.landing_stats().total(), 0);
}

#[test]
fn test_virtual_clock_accumulates_delays() {
    let mut engine = engine_for(DrawConfig {
        timing: SpinTiming::normal(),
        ..DrawConfig::demo()
    });
    let mut clock = VirtualClock::new();

    let started = engine.request_spin().unwrap();
    engine.cancel_spin();
    let outcome = engine.spin_blocking(&mut clock).unwrap();

    assert!(clock.elapsed() > std::time::Duration::ZERO);
    assert!(clock.ticks() as usize > 0);
    assert_eq!(outcome.reveal_after, std::time::Duration::from_secs(1));
    assert!(started.total_steps > 0);
}

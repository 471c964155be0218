//! StageTrace — The full stage timeline of one draw round

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::StageEvent;
use crate::stage::{Stage, StageCategory};

/// A complete trace of stage events for one spin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTrace {
    /// Spin sequence number
    pub spin_id: u64,

    /// Draw identifier (config name)
    pub draw_id: String,

    /// All events in chronological order
    pub events: Vec<StageEvent>,

    /// When this trace was started
    pub recorded_at: DateTime<Utc>,
}

impl StageTrace {
    /// Create a new empty trace
    pub fn new(spin_id: u64, draw_id: impl Into<String>) -> Self {
        Self {
            spin_id,
            draw_id: draw_id.into(),
            events: Vec::new(),
            recorded_at: Utc::now(),
        }
    }

    /// Append a stage at the given timeline position
    pub fn record(&mut self, stage: Stage, timestamp_ms: f64) {
        self.events
            .push(StageEvent::new(stage, timestamp_ms).with_spin(self.spin_id));
    }

    /// Append a fully built event
    pub fn push(&mut self, event: StageEvent) {
        self.events.push(event);
    }

    /// Total duration in milliseconds
    pub fn duration_ms(&self) -> f64 {
        match (self.events.first(), self.events.last()) {
            (Some(first), Some(last)) => last.timestamp_ms - first.timestamp_ms,
            _ => 0.0,
        }
    }

    pub fn events_by_category(&self, category: StageCategory) -> Vec<&StageEvent> {
        self.events
            .iter()
            .filter(|e| e.stage.category() == category)
            .collect()
    }

    pub fn tagged(&self, tag: &str) -> Vec<&StageEvent> {
        self.events.iter().filter(|e| e.has_tag(tag)).collect()
    }

    pub fn events_by_type(&self, type_name: &str) -> Vec<&StageEvent> {
        self.events
            .iter()
            .filter(|e| e.stage.type_name() == type_name)
            .collect()
    }

    pub fn has_stage(&self, type_name: &str) -> bool {
        self.events.iter().any(|e| e.stage.type_name() == type_name)
    }

    /// Number of highlight moves, including the final one
    pub fn step_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e.stage, Stage::StepAdvanced { .. } | Stage::FinalStep { .. }))
            .count()
    }

    /// Slot indices visited by the highlight, in order
    pub fn path(&self) -> Vec<usize> {
        self.events
            .iter()
            .filter(|e| matches!(e.stage, Stage::StepAdvanced { .. } | Stage::FinalStep { .. }))
            .filter_map(|e| e.stage.landed_index())
            .collect()
    }

    /// Resolved slot and fail flag, if the round resolved
    pub fn resolution(&self) -> Option<(usize, bool)> {
        self.events.iter().rev().find_map(|e| match &e.stage {
            Stage::SpinResolved { index, is_fail, .. } => Some((*index, *is_fail)),
            _ => None,
        })
    }

    /// Check the trace describes a well-formed round
    pub fn validate(&self) -> TraceValidation {
        let final_steps = self.events_by_type("final_step").len();
        let final_index = self
            .events
            .iter()
            .find_map(|e| match e.stage {
                Stage::FinalStep { index } => Some(index),
                _ => None,
            });

        TraceValidation {
            has_request: self.has_stage("spin_requested"),
            has_resolution: self.has_stage("spin_resolved"),
            final_step_count: final_steps,
            terminal_count: self.events.iter().filter(|e| e.stage.is_terminal()).count(),
            lands_on_winner: match (final_index, self.resolution()) {
                (Some(landed), Some((winner, _))) => landed == winner,
                _ => false,
            },
            monotonic: self
                .events
                .windows(2)
                .all(|w| w[0].timestamp_ms <= w[1].timestamp_ms),
        }
    }
}

/// Validation result for a trace
#[derive(Debug, Clone, Default)]
pub struct TraceValidation {
    pub has_request: bool,
    pub has_resolution: bool,
    pub final_step_count: usize,
    pub terminal_count: usize,
    pub lands_on_winner: bool,
    pub monotonic: bool,
}

impl TraceValidation {
    pub fn is_valid(&self) -> bool {
        self.has_request
            && self.has_resolution
            && self.final_step_count == 1
            && self.terminal_count == 1
            && self.lands_on_winner
            && self.monotonic
    }

    pub fn warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();

        if !self.has_request {
            warnings.push("Missing SPIN_REQUESTED event");
        }
        if !self.has_resolution {
            warnings.push("Missing SPIN_RESOLVED event");
        }
        if self.final_step_count != 1 {
            warnings.push("Expected exactly one FINAL_STEP event");
        }
        if self.terminal_count != 1 {
            warnings.push("Expected exactly one terminal stage");
        }
        if !self.lands_on_winner {
            warnings.push("Final step does not land on the resolved slot");
        }
        if !self.monotonic {
            warnings.push("Timestamps go backwards");
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::SLOW_PHASE_TAG;

    fn create_basic_trace() -> StageTrace {
        let mut trace = StageTrace::new(1, "demo");

        trace.record(
            Stage::SpinRequested {
                start_index: 0,
                total_steps: 3,
            },
            0.0,
        );
        trace.record(Stage::StepAdvanced { index: 2 }, 40.0);
        trace.record(Stage::StepAdvanced { index: 3 }, 90.0);
        trace.record(Stage::FinalStep { index: 4 }, 160.0);
        trace.record(
            Stage::StockChanged {
                slot_id: "mug".into(),
                quantity: 9,
                available: true,
            },
            300.0,
        );
        trace.record(
            Stage::SpinResolved {
                index: 4,
                slot_id: "mug".into(),
                is_fail: false,
            },
            300.0,
        );

        trace
    }

    #[test]
    fn test_trace_creation() {
        let trace = create_basic_trace();

        assert_eq!(trace.draw_id, "demo");
        assert_eq!(trace.events.len(), 6);
        assert!(trace.events.iter().all(|e| e.spin_id == Some(1)));
    }

    #[test]
    fn test_trace_duration() {
        assert_eq!(create_basic_trace().duration_ms(), 300.0);
        assert_eq!(StageTrace::new(2, "empty").duration_ms(), 0.0);
    }

    #[test]
    fn test_trace_path_and_resolution() {
        let trace = create_basic_trace();

        assert_eq!(trace.step_count(), 3);
        assert_eq!(trace.path(), vec![2, 3, 4]);
        assert_eq!(trace.resolution(), Some((4, false)));
    }

    #[test]
    fn test_trace_validation() {
        let trace = create_basic_trace();
        let validation = trace.validate();

        assert!(validation.is_valid());
        assert!(validation.warnings().is_empty());
    }

    #[test]
    fn test_trace_validation_detects_wrong_landing() {
        let mut trace = StageTrace::new(3, "demo");
        trace.record(
            Stage::SpinRequested {
                start_index: 0,
                total_steps: 1,
            },
            0.0,
        );
        trace.record(Stage::FinalStep { index: 1 }, 50.0);
        trace.record(
            Stage::SpinResolved {
                index: 2,
                slot_id: "x".into(),
                is_fail: true,
            },
            60.0,
        );

        let validation = trace.validate();
        assert!(!validation.is_valid());
        assert!(validation
            .warnings()
            .contains(&"Final step does not land on the resolved slot"));
    }

    #[test]
    fn test_trace_validation_detects_double_ending() {
        let mut trace = create_basic_trace();
        trace.record(Stage::SpinCancelled { index: 4 }, 310.0);

        let validation = trace.validate();
        assert_eq!(validation.terminal_count, 2);
        assert!(!validation.is_valid());
        assert!(validation
            .warnings()
            .contains(&"Expected exactly one terminal stage"));
    }

    #[test]
    fn test_tagged_and_category_lookup() {
        let mut trace = create_basic_trace();
        trace.push(
            StageEvent::new(Stage::StepAdvanced { index: 5 }, 320.0)
                .with_spin(1)
                .with_tag(SLOW_PHASE_TAG),
        );

        let slow = trace.tagged(SLOW_PHASE_TAG);
        assert_eq!(slow.len(), 1);
        assert_eq!(slow[0].stage.landed_index(), Some(5));
        assert_eq!(trace.events_by_category(StageCategory::Result).len(), 2);
        assert!(trace.events_by_category(StageCategory::Rejection).is_empty());
    }

    #[test]
    fn test_trace_serialization() {
        let trace = create_basic_trace();
        let json = serde_json::to_string_pretty(&trace).unwrap();

        assert!(json.contains("spin_requested"));
        assert!(json.contains("stock_changed"));

        let deserialized: StageTrace = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, trace);
    }
}

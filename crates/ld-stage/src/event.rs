//! StageEvent — A stage occurrence with timing metadata

use serde::{Deserialize, Serialize};

use crate::stage::Stage;

/// Tag on steps of the final +1 crawl
pub const SLOW_PHASE_TAG: &str = "slow_phase";

/// A stage event stamped on the round's timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEvent {
    /// The canonical stage
    pub stage: Stage,

    /// Milliseconds since the spin was requested (virtual timeline)
    pub timestamp_ms: f64,

    /// Spin sequence number this event belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spin_id: Option<u64>,

    /// Custom tags for filtering/routing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl StageEvent {
    pub fn new(stage: Stage, timestamp_ms: f64) -> Self {
        Self {
            stage,
            timestamp_ms,
            spin_id: None,
            tags: Vec::new(),
        }
    }

    /// Attach the spin sequence number
    pub fn with_spin(mut self, spin_id: u64) -> Self {
        self.spin_id = Some(spin_id);
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.stage.type_name()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

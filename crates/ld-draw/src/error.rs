//! Error types for the draw engine

use thiserror::Error;

use crate::engine::SpinState;

/// Why a spin request was turned down
///
/// Always recoverable. Rejected requests leave the engine state as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpinRejection {
    #[error("Spin already in progress")]
    Busy,

    #[error("No reward slots configured")]
    EmptyRegistry,

    #[error("No slot is eligible to win")]
    NoEligibleSlot,

    /// The spin stopped before it could resolve
    #[error("Spin ended without resolving")]
    Aborted,
}

impl SpinRejection {
    /// Stable machine-readable code (used in stage events and logs)
    pub fn code(&self) -> &'static str {
        match self {
            Self::Busy => "busy",
            Self::EmptyRegistry => "empty_registry",
            Self::NoEligibleSlot => "no_eligible_slot",
            Self::Aborted => "aborted",
        }
    }
}

/// Admin surface errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdminError {
    #[error("Unknown slot: {0}")]
    UnknownSlot(String),

    #[error("Draw is busy ({0}), try again when idle")]
    Busy(SpinState),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid config: {0}")]
    Json(String),

    #[error("Duplicate slot id: {0}")]
    DuplicateSlotId(String),

    #[error("Slot #{0} has an empty id")]
    EmptySlotId(usize),

    #[error("Invalid timing: {0}")]
    InvalidTiming(&'static str),
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

/// Result type alias for admin calls
pub type AdminResult<T> = Result<T, AdminError>;

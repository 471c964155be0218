//! # ld-stage — Lucky Draw Stage System
//!
//! Defines the canonical moments of a lucky draw round. Presentation layers
//! (lights, sounds, popups) react to STAGES, never to engine internals.
//!
//! ## Flow
//!
//! ```text
//! SpinRequested → StepAdvanced × N → FinalStep → StockChanged? → SpinResolved
//!                                                                   │
//!                                                       ResultAcknowledged
//! ```
//!
//! A rejected request produces a single `SpinRejected` stage and nothing else.

pub mod event;
pub mod stage;
pub mod trace;

pub use event::*;
pub use stage::*;
pub use trace::*;

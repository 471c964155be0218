//! # ld-draw — Lucky Draw Spin Engine
//!
//! The core of a kiosk lucky draw: picks a winner under weighted,
//! stock-limited, fail-slot-aware rules, plans the highlight's walk around
//! the wheel, and consumes reward stock when the spin lands.
//!
//! ## Architecture
//!
//! ```text
//! SpinEngine
//!     │
//!     ├── SlotRegistry (ordered RewardSlots + change subscriptions)
//!     ├── SelectionPolicy (roulette-wheel draw, FailSlotRule gate)
//!     ├── StepPlanner (random cycling → +1 crawl → landing)
//!     └── collaborators (SpinPresenter, QuantityStore, Scheduler)
//!           │
//!           v
//!     StepEvent × N → SpinOutcome + StageTrace
//! ```
//!
//! The engine never sleeps on its own. A [`Scheduler`] (or any host loop)
//! waits for each [`StepEvent::delay`] and calls [`SpinEngine::advance`].

pub mod collaborators;
pub mod config;
pub mod engine;
pub mod error;
pub mod names;
pub mod planner;
pub mod registry;
pub mod scheduler;
pub mod selection;
pub mod slot;
pub mod stats;
pub mod timing;

pub use collaborators::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use names::*;
pub use planner::*;
pub use registry::*;
pub use scheduler::*;
pub use selection::*;
pub use slot::*;
pub use stats::*;
pub use timing::*;

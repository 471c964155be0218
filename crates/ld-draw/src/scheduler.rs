//! Scheduler — the owner of real time
//!
//! The engine hands out [`StepEvent`](crate::StepEvent)s with a delay and
//! waits to be advanced again. A scheduler decides what "waiting" means.

use std::time::Duration;

/// Something that can wait
pub trait Scheduler {
    fn sleep(&mut self, delay: Duration);
}

/// Virtual clock: records time instead of waiting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VirtualClock {
    elapsed: Duration,
    ticks: u64,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total virtual time slept
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Elapsed time in milliseconds (trace timestamp unit)
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    /// Number of sleeps
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Scheduler for VirtualClock {
    fn sleep(&mut self, delay: Duration) {
        self.elapsed += delay;
        self.ticks += 1;
    }
}

/// Blocks the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct RealtimeScheduler;

impl Scheduler for RealtimeScheduler {
    fn sleep(&mut self, delay: Duration) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

//! Step Planner — turns (current, target, slot count) into the highlight walk
//!
//! A spin is two phases:
//!
//! 1. **Random phase**: at least `min_cycles` loops of the wheel, each step a
//!    jump of 1..=3 slots, delay easing from `start_step_delay_ms` towards
//!    `end_step_delay_ms` over the whole timeline.
//! 2. **Slow phase**: `final_slow_steps` single-slot steps, delay easing from
//!    the last random delay up to `end_step_delay_ms * final_slow_delay_multiplier`.
//!
//! Random jumps are drawn first and then nudged (each staying in 1..=3) so
//! the random phase stops exactly `slow_steps` slots before the target.

use std::iter::FusedIterator;
use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::timing::{Easing, SpinTiming};

const MIN_JUMP: u8 = 1;
const MAX_JUMP: u8 = 3;

/// One highlight move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEvent {
    /// Slot the highlight lands on after this step
    pub landed_index: usize,
    /// Wait this long before the next step (or the result reveal)
    pub delay: Duration,
    /// Last step of the spin
    pub is_final: bool,
}

/// Numbers a plan was built from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanShape {
    pub cycles: u32,
    pub extra_steps: u32,
    pub forward_distance: usize,
    pub slow_steps: usize,
    pub pre_offset_steps: usize,
    pub random_steps: usize,
}

impl PlanShape {
    pub fn total_steps(&self) -> usize {
        self.random_steps + self.slow_steps
    }
}

/// Lazy, single-use step sequence for one spin
///
/// Not `Clone`: a plan is consumed once by the spin that owns it.
#[derive(Debug)]
pub struct StepPlan {
    shape: PlanShape,
    jumps: Vec<u8>,
    slot_count: usize,
    position: usize,
    emitted: usize,
    start_delay_ms: f64,
    end_delay_ms: f64,
    full_speed_delay_ms: f64,
    slow_end_delay_ms: f64,
    easing: Easing,
}

impl StepPlan {
    fn empty() -> Self {
        Self {
            shape: PlanShape::default(),
            jumps: Vec::new(),
            slot_count: 0,
            position: 0,
            emitted: 0,
            start_delay_ms: 0.0,
            end_delay_ms: 0.0,
            full_speed_delay_ms: 0.0,
            slow_end_delay_ms: 0.0,
            easing: Easing::default(),
        }
    }

    pub fn shape(&self) -> &PlanShape {
        &self.shape
    }

    pub fn total_steps(&self) -> usize {
        self.shape.total_steps()
    }

    /// Steps not yet consumed
    pub fn remaining(&self) -> usize {
        self.total_steps() - self.emitted
    }

    /// Sum of every step delay in the plan
    pub fn total_duration(&self) -> Duration {
        (0..self.total_steps())
            .map(|k| ms_to_duration(self.delay_ms_at(k)))
            .sum()
    }

    /// Delay of step `k` (0-based)
    fn delay_ms_at(&self, k: usize) -> f64 {
        let random = self.shape.random_steps;
        if k < random {
            let t = (k + 1) as f64 / self.total_steps() as f64;
            lerp(self.start_delay_ms, self.end_delay_ms, self.easing.apply(t))
        } else {
            let t = (k - random + 1) as f64 / self.shape.slow_steps as f64;
            lerp(
                self.full_speed_delay_ms,
                self.slow_end_delay_ms,
                self.easing.apply(t),
            )
        }
    }

    fn jump_at(&self, k: usize) -> usize {
        self.jumps.get(k).map_or(1, |j| usize::from(*j))
    }
}

impl Iterator for StepPlan {
    type Item = StepEvent;

    fn next(&mut self) -> Option<StepEvent> {
        let total = self.total_steps();
        if self.emitted >= total {
            return None;
        }

        let k = self.emitted;
        self.emitted += 1;
        self.position = (self.position + self.jump_at(k)) % self.slot_count;

        Some(StepEvent {
            landed_index: self.position,
            delay: ms_to_duration(self.delay_ms_at(k)),
            is_final: self.emitted == total,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for StepPlan {}

impl FusedIterator for StepPlan {}

/// Builds [`StepPlan`]s from a [`SpinTiming`]
#[derive(Debug, Clone, Default)]
pub struct StepPlanner {
    timing: SpinTiming,
}

impl StepPlanner {
    /// Create a planner (timing is normalized first)
    pub fn new(timing: &SpinTiming) -> Self {
        Self {
            timing: timing.normalized(),
        }
    }

    pub fn timing(&self) -> &SpinTiming {
        &self.timing
    }

    /// Plan the walk from `current` to `target` on a wheel of `slot_count`
    ///
    /// Indices are taken modulo `slot_count`. An empty wheel gives an empty plan.
    pub fn plan<R: Rng + ?Sized>(
        &self,
        current: usize,
        target: usize,
        slot_count: usize,
        rng: &mut R,
    ) -> StepPlan {
        if slot_count == 0 {
            return StepPlan::empty();
        }

        let n = slot_count;
        let current = current % n;
        let target = target % n;
        let t = &self.timing;

        let cycles = rng.random_range(t.min_cycles..=t.max_cycles);
        let extra_steps = rng.random_range(t.extra_steps_min..=t.extra_steps_max);
        let forward_distance = (target + n - current) % n;
        let slow_steps = (t.final_slow_steps as usize).clamp(1, (n - 1).max(1));
        let pre_offset_steps = forward_distance.saturating_sub(slow_steps);
        let random_count = cycles as usize * n + pre_offset_steps + extra_steps as usize;

        let mut jumps: Vec<u8> = (0..random_count)
            .map(|_| rng.random_range(MIN_JUMP..=MAX_JUMP))
            .collect();

        // Random phase must stop `slow_steps` short of the target
        let random_end = (target + n - slow_steps % n) % n;
        let needed = (random_end + n - current) % n;
        align_jumps(&mut jumps, needed, n, rng);

        let shape = PlanShape {
            cycles,
            extra_steps,
            forward_distance,
            slow_steps,
            pre_offset_steps,
            random_steps: jumps.len(),
        };

        let easing = t.easing;
        let total = shape.total_steps() as f64;
        let full_speed_delay_ms = if shape.random_steps > 0 {
            lerp(
                t.start_step_delay_ms,
                t.end_step_delay_ms,
                easing.apply(shape.random_steps as f64 / total),
            )
        } else {
            t.start_step_delay_ms
        };

        log::debug!(
            "Planned spin {} -> {} on {} slots: {} random + {} slow steps",
            current,
            target,
            n,
            shape.random_steps,
            shape.slow_steps
        );

        StepPlan {
            shape,
            jumps,
            slot_count: n,
            position: current,
            emitted: 0,
            start_delay_ms: t.start_step_delay_ms,
            end_delay_ms: t.end_step_delay_ms,
            full_speed_delay_ms,
            slow_end_delay_ms: t.end_step_delay_ms * t.final_slow_delay_multiplier,
            easing,
        }
    }
}

/// Nudge jumps so their sum is congruent to `needed` modulo `n`
fn align_jumps<R: Rng + ?Sized>(jumps: &mut Vec<u8>, needed: usize, n: usize, rng: &mut R) {
    let sum: usize = jumps.iter().map(|j| usize::from(*j)).sum();
    let mut deficit = (needed + n - sum % n) % n;
    if deficit == 0 {
        return;
    }

    let mut headroom_up: usize = jumps.iter().map(|j| usize::from(MAX_JUMP - j)).sum();
    let headroom_down: usize = jumps.iter().map(|j| usize::from(j - MIN_JUMP)).sum();
    let surplus = n - deficit;

    let raise_ok = deficit <= headroom_up;
    let lower_ok = surplus <= headroom_down;

    if raise_ok && (!lower_ok || deficit <= surplus) {
        spread(jumps, deficit, true, rng);
    } else if lower_ok {
        spread(jumps, surplus, false, rng);
    } else {
        // Too few random steps to reach every residue; extend the phase
        while deficit > headroom_up {
            jumps.push(MIN_JUMP);
            deficit -= 1;
            headroom_up += usize::from(MAX_JUMP - MIN_JUMP);
        }
        spread(jumps, deficit, true, rng);
    }
}

fn spread<R: Rng + ?Sized>(jumps: &mut [u8], mut amount: usize, raise: bool, rng: &mut R) {
    let mut order: Vec<usize> = (0..jumps.len()).collect();
    order.shuffle(rng);

    for i in order {
        if amount == 0 {
            break;
        }
        let room = usize::from(if raise {
            MAX_JUMP - jumps[i]
        } else {
            jumps[i] - MIN_JUMP
        });
        let delta = room.min(amount);
        // delta <= 2
        let delta_u8 = delta as u8;
        if raise {
            jumps[i] += delta_u8;
        } else {
            jumps[i] -= delta_u8;
        }
        amount -= delta;
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Milliseconds to a `Duration`; negative, NaN and overflowing values give zero
pub(crate) fn ms_to_duration(ms: f64) -> Duration {
    Duration::try_from_secs_f64(ms.max(0.0) / 1000.0).unwrap_or_default()
}

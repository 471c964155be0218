//! Timing profiles for the spin walk

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound for `min_cycles` / `max_cycles`
pub const MAX_CYCLES: u32 = 100;

/// Upper bound for `extra_steps_min` / `extra_steps_max`
pub const MAX_EXTRA_STEPS: u32 = 1_000;

/// Timing profile for a spin
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimingProfile {
    /// Kiosk floor timing
    #[default]
    Normal,
    /// Short spins for busy events
    Turbo,
    /// Studio mode (instant, for testing and simulation)
    Studio,
    /// Anything hand-tuned or scaled
    Custom,
}

/// Curve applied to the delay interpolation parameter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    #[default]
    EaseOutQuad,
}

impl Easing {
    /// Map `t` in `[0, 1]` onto the curve
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
        }
    }
}

/// Spin timing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinTiming {
    /// Profile type
    pub profile: TimingProfile,

    /// Delay of the first random step (ms)
    pub start_step_delay_ms: f64,

    /// Delay reached at the end of the random phase timeline (ms)
    pub end_step_delay_ms: f64,

    /// Minimum full loops around the wheel
    pub min_cycles: u32,

    /// Maximum full loops around the wheel
    pub max_cycles: u32,

    /// Extra random steps added on top of the loops
    pub extra_steps_min: u32,
    pub extra_steps_max: u32,

    /// Number of +1 crawl steps before landing
    pub final_slow_steps: u32,

    /// Last crawl step delay = `end_step_delay_ms * final_slow_delay_multiplier`
    pub final_slow_delay_multiplier: f64,

    pub easing: Easing,

    /// Pause between landing and showing the result (ms)
    pub result_reveal_delay_ms: f64,
}

impl SpinTiming {
    /// Kiosk floor timing
    pub fn normal() -> Self {
        Self {
            profile: TimingProfile::Normal,
            start_step_delay_ms: 40.0,
            end_step_delay_ms: 120.0,
            min_cycles: 1,
            max_cycles: 2,
            extra_steps_min: 0,
            extra_steps_max: 3,
            final_slow_steps: 3,
            final_slow_delay_multiplier: 2.5,
            easing: Easing::EaseOutQuad,
            result_reveal_delay_ms: 1000.0,
        }
    }

    /// Turbo mode
    pub fn turbo() -> Self {
        Self {
            profile: TimingProfile::Turbo,
            start_step_delay_ms: 20.0,
            end_step_delay_ms: 60.0,
            min_cycles: 1,
            max_cycles: 1,
            extra_steps_min: 0,
            extra_steps_max: 2,
            final_slow_steps: 2,
            final_slow_delay_multiplier: 2.0,
            easing: Easing::EaseOutQuad,
            result_reveal_delay_ms: 400.0,
        }
    }

    /// Studio mode (zero delays, same walk shape)
    pub fn studio() -> Self {
        Self {
            profile: TimingProfile::Studio,
            start_step_delay_ms: 0.0,
            end_step_delay_ms: 0.0,
            result_reveal_delay_ms: 0.0,
            ..Self::normal()
        }
    }

    /// Get timing for profile
    pub fn from_profile(profile: TimingProfile) -> Self {
        match profile {
            TimingProfile::Normal => Self::normal(),
            TimingProfile::Turbo => Self::turbo(),
            TimingProfile::Studio => Self::studio(),
            TimingProfile::Custom => Self::normal(),
        }
    }

    /// Scale all delays by factor (< 1.0 = faster)
    pub fn scaled(&self, factor: f64) -> Self {
        let factor = if factor.is_finite() { factor.max(0.0) } else { 1.0 };
        Self {
            profile: TimingProfile::Custom,
            start_step_delay_ms: self.start_step_delay_ms * factor,
            end_step_delay_ms: self.end_step_delay_ms * factor,
            result_reveal_delay_ms: self.result_reveal_delay_ms * factor,
            ..self.clone()
        }
    }

    /// Reject values that cannot be clamped into something meaningful
    pub fn validate(&self) -> Result<(), ConfigError> {
        let delays = [
            self.start_step_delay_ms,
            self.end_step_delay_ms,
            self.final_slow_delay_multiplier,
            self.result_reveal_delay_ms,
        ];
        if delays.iter().any(|d| !d.is_finite()) {
            return Err(ConfigError::InvalidTiming("delays must be finite"));
        }
        if self.min_cycles.max(self.max_cycles) > MAX_CYCLES {
            return Err(ConfigError::InvalidTiming("cycles out of range"));
        }
        if self.extra_steps_min.max(self.extra_steps_max) > MAX_EXTRA_STEPS {
            return Err(ConfigError::InvalidTiming("extra steps out of range"));
        }
        Ok(())
    }

    /// Copy with every field inside its usable range
    ///
    /// Negative delays become 0, `min_cycles` is at least 1, cycle and
    /// extra-step counts are capped and reversed ranges are swapped.
    pub fn normalized(&self) -> Self {
        let mut t = self.clone();

        for (name, value) in [
            ("start_step_delay_ms", &mut t.start_step_delay_ms),
            ("end_step_delay_ms", &mut t.end_step_delay_ms),
            ("final_slow_delay_multiplier", &mut t.final_slow_delay_multiplier),
            ("result_reveal_delay_ms", &mut t.result_reveal_delay_ms),
        ] {
            if !value.is_finite() || *value < 0.0 {
                log::warn!("Timing: {} = {} clamped to 0", name, value);
                *value = 0.0;
            }
        }

        for (name, value, cap) in [
            ("min_cycles", &mut t.min_cycles, MAX_CYCLES),
            ("max_cycles", &mut t.max_cycles, MAX_CYCLES),
            ("extra_steps_min", &mut t.extra_steps_min, MAX_EXTRA_STEPS),
            ("extra_steps_max", &mut t.extra_steps_max, MAX_EXTRA_STEPS),
        ] {
            if *value > cap {
                log::warn!("Timing: {} = {} capped to {}", name, value, cap);
                *value = cap;
            }
        }

        if t.min_cycles == 0 {
            log::warn!("Timing: min_cycles 0 raised to 1");
            t.min_cycles = 1;
        }
        if t.max_cycles < t.min_cycles {
            log::warn!(
                "Timing: cycle range {}..={} reversed, swapping",
                t.min_cycles,
                t.max_cycles
            );
            (t.min_cycles, t.max_cycles) = (t.max_cycles.max(1), t.min_cycles);
        }
        if t.extra_steps_max < t.extra_steps_min {
            (t.extra_steps_min, t.extra_steps_max) = (t.extra_steps_max, t.extra_steps_min);
        }

        t
    }
}

impl Default for SpinTiming {
    fn default() -> Self {
        Self::normal()
    }
}

// Time Controller - speed response curve and the per-frame simulation clock

use serde::{Deserialize, Serialize};

use crate::calendar::DAYS_PER_UNIT;

// =============================================================================
// CONSTANTS
// =============================================================================

pub const DEFAULT_MIN_SCALE: f64 = 0.1;
pub const DEFAULT_MAX_SCALE: f64 = 1000.0;
pub const DEFAULT_TIME_SCALE: f64 = 2.0;

/// Upper bound of the response curve, simulation units per wall second
pub const DEFAULT_RATE_CEILING: f64 = 5000.0;

/// Exponent of the power-law part of the curve
pub const RESPONSE_EXPONENT: f64 = 1.5;

/// Smallest slider movement the curve must still resolve
pub const SCALE_STEP: f64 = 0.1;

/// Relative rate change one `SCALE_STEP` must produce, far above f64 rounding
const MIN_RELATIVE_STEP: f64 = 1e-12;

/// Magnitude cap on simulation time, far below 2^53
pub const MAX_SIMULATION_TIME: f64 = 1.0e12;

/// Longest wall-clock gap a single frame may integrate (seconds)
pub const MAX_FRAME_DELTA: f64 = 0.25;

/// Differences smaller than this are float noise, not an external jump
pub const RESYNC_EPSILON: f64 = 1e-9;

/// Preset rates in earth days per wall second
pub mod rates {
    pub const DAY_PER_SEC: f64 = 1.0;
    pub const MONTH_PER_SEC: f64 = 30.0;
    pub const YEAR_PER_SEC: f64 = 365.0;
}

// =============================================================================
// TIME SCALE CONTROLLER
// =============================================================================

/// Maps the user-facing speed slider to simulation units per wall second.
///
/// `rate(s) = x / (1 + x / ceiling)` with `x = s^1.5`: close to `x` while
/// that is small against the ceiling, then flattening towards the ceiling.
/// Never above `ceiling`. Strictly increasing on `[min_scale, max_scale]`
/// whenever [`ResponseCurve::resolves_step`] holds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ResponseCurve {
    pub min_scale: f64,
    pub max_scale: f64,
    pub ceiling: f64,
}

impl ResponseCurve {
    pub fn new(min_scale: f64, max_scale: f64, ceiling: f64) -> Self {
        Self {
            min_scale,
            max_scale,
            ceiling,
        }
    }

    /// Clamp a slider value into the configured range. NaN maps to the minimum.
    pub fn clamp_scale(&self, scale: f64) -> f64 {
        if scale.is_nan() {
            return self.min_scale;
        }
        scale.clamp(self.min_scale, self.max_scale)
    }

    /// Simulation units advanced per wall-clock second at `scale`
    pub fn rate(&self, scale: f64) -> f64 {
        let raw = self.clamp_scale(scale).powf(RESPONSE_EXPONENT);
        raw / (1.0 + raw / self.ceiling)
    }

    /// True if moving the slider by `step` still changes the rate visibly at
    /// both ends. The slope is smallest at one of the ends.
    pub fn resolves_step(&self, step: f64) -> bool {
        let low = (self.min_scale + step).min(self.max_scale);
        let high = (self.max_scale - step).max(self.min_scale);
        let bottom = self.rate(self.min_scale);
        let top = self.rate(self.max_scale);
        self.rate(low) - bottom > bottom * MIN_RELATIVE_STEP
            && top - self.rate(high) > top * MIN_RELATIVE_STEP
    }

    pub fn days_per_second(&self, scale: f64) -> f64 {
        self.rate(scale) * DAYS_PER_UNIT
    }

    /// Human readable speed, e.g. "12.3 days/sec (0.034 years/sec)"
    pub fn describe(&self, scale: f64) -> String {
        describe_rate(self.days_per_second(scale))
    }
}

impl Default for ResponseCurve {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SCALE, DEFAULT_MAX_SCALE, DEFAULT_RATE_CEILING)
    }
}

/// Describe a rate given in earth days per wall second
pub fn describe_rate(days_per_second: f64) -> String {
    let years = days_per_second / rates::YEAR_PER_SEC;
    if days_per_second < rates::DAY_PER_SEC {
        format!("{:.2} days/sec", days_per_second)
    } else if days_per_second < rates::MONTH_PER_SEC {
        format!("{:.1} days/sec ({:.3} years/sec)", days_per_second, years)
    } else if days_per_second < rates::YEAR_PER_SEC {
        let months = days_per_second / rates::MONTH_PER_SEC;
        format!("{:.1} months/sec ({:.2} years/sec)", months, years)
    } else {
        format!("{:.1} years/sec", years)
    }
}

// =============================================================================
// SIMULATION CLOCK
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClockPhase {
    Running,
    Paused,
}

/// Per-frame integrator. Owns continuous playback only; the store owns jumps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationClock {
    phase: ClockPhase,
    /// Last value this clock published
    tracked: f64,
    curve: ResponseCurve,
}

impl SimulationClock {
    pub fn new(curve: ResponseCurve) -> Self {
        Self {
            phase: ClockPhase::Running,
            tracked: 0.0,
            curve,
        }
    }

    pub fn phase(&self) -> ClockPhase {
        self.phase
    }

    pub fn curve(&self) -> &ResponseCurve {
        &self.curve
    }

    pub fn pause(&mut self) {
        self.phase = ClockPhase::Paused;
    }

    pub fn resume(&mut self) {
        self.phase = ClockPhase::Running;
    }

    pub fn set_running(&mut self, running: bool) {
        if running {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Adopt an authoritative time, in either phase
    pub fn resync(&mut self, time: f64) {
        self.tracked = clamp_time(time);
    }

    /// Advance from `authoritative` by `wall_dt` seconds at `scale`.
    ///
    /// If `authoritative` differs from what this clock last published, it was
    /// set from outside and wins over the clock's own accumulated value.
    pub fn tick(&mut self, authoritative: f64, wall_dt: f64, scale: f64) -> f64 {
        if (authoritative - self.tracked).abs() > RESYNC_EPSILON {
            tracing::debug!(
                from = self.tracked,
                to = authoritative,
                "clock adopting external time"
            );
            self.resync(authoritative);
        }

        if self.phase == ClockPhase::Paused {
            return self.tracked;
        }

        let dt = sanitize_delta(wall_dt);
        let advanced = self.tracked + dt * self.curve.rate(scale);
        self.tracked = clamp_time(advanced);
        self.tracked
    }
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(ResponseCurve::default())
    }
}

/// Negative or non-finite deltas count as zero; long stalls are capped
pub fn sanitize_delta(wall_dt: f64) -> f64 {
    if wall_dt.is_finite() && wall_dt > 0.0 {
        wall_dt.min(MAX_FRAME_DELTA)
    } else {
        0.0
    }
}

/// Keep simulation time finite and inside ±MAX_SIMULATION_TIME
pub fn clamp_time(time: f64) -> f64 {
    if time.is_nan() {
        return 0.0;
    }
    time.clamp(-MAX_SIMULATION_TIME, MAX_SIMULATION_TIME)
}

// =============================================================================
// TESTS
// =============================================================================

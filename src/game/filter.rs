//! Adaptive one-euro filtering for hand telemetry.
//!
//! Low cutoff while the hand is still (jitter suppression), cutoff raised
//! in proportion to the smoothed derivative while it moves (lag reduction).
//! One filter per axis; `JitterFilter2d` pairs them with shared parameters.

use std::f32::consts::TAU;

/// dt is clamped to this range before any division so a stalled or
/// duplicated timestamp can never produce NaN/Inf.
pub const DT_MIN_S: f32 = 0.001;
pub const DT_MAX_S: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    pub min_cutoff: f32,
    pub beta: f32,
    pub derivative_cutoff: f32,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            min_cutoff: 1.15,
            beta: 0.03,
            derivative_cutoff: 1.0,
        }
    }
}

#[inline(always)]
fn smoothing_alpha(cutoff: f32, dt: f32) -> f32 {
    let r = TAU * cutoff * dt;
    r / (r + 1.0)
}

#[derive(Debug, Clone, Copy)]
pub struct JitterFilter {
    params: FilterParams,
    last_raw: f32,
    last_filtered: f32,
    derivative: f32,
    primed: bool,
}

impl JitterFilter {
    pub fn new(params: FilterParams) -> Self {
        Self {
            params,
            last_raw: 0.0,
            last_filtered: 0.0,
            derivative: 0.0,
            primed: false,
        }
    }

    /// Feed one raw sample taken `dt_s` after the previous one.
    ///
    /// The first sample initializes state and is returned unfiltered, so a
    /// fresh session has no smoothing latency on its opening frame.
    pub fn sample(&mut self, raw: f32, dt_s: f32) -> f32 {
        if !self.primed {
            self.primed = true;
            self.last_raw = raw;
            self.last_filtered = raw;
            self.derivative = 0.0;
            return raw;
        }

        let dt = dt_s.clamp(DT_MIN_S, DT_MAX_S);

        let raw_velocity = (raw - self.last_raw) / dt;
        let a_d = smoothing_alpha(self.params.derivative_cutoff, dt);
        self.derivative = a_d * raw_velocity + (1.0 - a_d) * self.derivative;

        let cutoff = self.params.min_cutoff + self.params.beta * self.derivative.abs();
        let a = smoothing_alpha(cutoff, dt);
        self.last_filtered = a * raw + (1.0 - a) * self.last_filtered;
        self.last_raw = raw;

        self.last_filtered
    }

    pub fn value(&self) -> f32 {
        self.last_filtered
    }

    pub fn reset(&mut self) {
        self.primed = false;
        self.derivative = 0.0;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct JitterFilter2d {
    pub x: JitterFilter,
    pub y: JitterFilter,
}

impl JitterFilter2d {
    pub fn new(params: FilterParams) -> Self {
        Self {
            x: JitterFilter::new(params),
            y: JitterFilter::new(params),
        }
    }

    pub fn sample(&mut self, raw: (f32, f32), dt_s: f32) -> (f32, f32) {
        (self.x.sample(raw.0, dt_s), self.y.sample(raw.1, dt_s))
    }

    pub fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
    }
}

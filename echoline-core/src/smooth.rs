//! Parameter smoothing primitives.
//!
//! Two flavours, both allocation-free and cheap enough to tick per block or
//! per sample:
//! - `LinearSlew`     : constant-rate linear ramp over a fixed time window.
//!   Reaches the target exactly, never overshoots. Used for the dry/wet mix.
//! - `OnePoleSmoother`: RC-style exponential lag (`y += (x - y) * (1 - a)`).
//!   Never quite arrives; good for general control-signal de-zippering.

use crate::dsp::{clamp, one_pole_coeff_ms};

/// Linear slew towards a target at a bounded per-tick rate.
///
/// `max_delta` is the largest move permitted per call to [`next`](Self::next),
/// expressed in the units of the smoothed value. For a full-range control in
/// [0,1] smoothed over `t_ms`, ticked once per block of `block_len` samples:
/// `max_delta = block_len / (t_ms * 0.001 * sr)`.
#[derive(Copy, Clone, Debug)]
pub struct LinearSlew {
    current: f32,
    target: f32,
    max_delta: f32,
}

impl LinearSlew {
    #[inline]
    pub fn new(initial: f32, max_delta: f32) -> Self {
        Self { current: initial, target: initial, max_delta: max_delta.max(0.0) }
    }

    /// Build from a smoothing window: full range (1.0) covered in `t_ms`,
    /// ticked once per `block_len` samples at sample rate `sr`.
    #[inline]
    pub fn per_block(initial: f32, t_ms: f32, block_len: usize, sr: f32) -> Self {
        let window = (t_ms * 0.001 * sr).max(1.0);
        Self::new(initial, block_len as f32 / window)
    }

    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Jump straight to `value` (session reset, not a smooth move).
    #[inline]
    pub fn reset(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    /// Advance one tick towards the target and return the new value.
    /// The step never exceeds `max_delta` and never passes the target.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let delta = clamp(self.target - self.current, -self.max_delta, self.max_delta);
        self.current += delta;
        self.current
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }
}

/// One-pole parameter smoother: `y += (x - y) * (1 - a)`, `a = exp(-1/(tau*sr))`.
#[derive(Copy, Clone, Debug)]
pub struct OnePoleSmoother {
    a: f32, // alpha (closer to 1 → slower)
    y: f32,
}

impl OnePoleSmoother {
    #[inline]
    pub fn new_ms(t_ms: f32, sr: f32) -> Self {
        Self { a: one_pole_coeff_ms(t_ms, sr), y: 0.0 }
    }

    #[inline]
    pub fn reset(&mut self, y0: f32) {
        self.y = y0;
    }

    #[inline]
    pub fn set_time_ms(&mut self, t_ms: f32, sr: f32) {
        self.a = one_pole_coeff_ms(t_ms, sr);
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        self.y += (x - self.y) * (1.0 - self.a);
        self.y
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.y
    }
}

// ------------------------------------ Tests --------------------------------------

//! Wobble: the LFO that modulates the delay read position.
//!
//! A phase-accumulating sine producing a bounded offset **in samples**. The
//! engine calls [`Wobble::next_offset`] once per output channel per block —
//! modulation is block-rate, not sample-rate. That trades a little precision
//! for deterministic, branch-light work on the audio thread (the block-rate
//! policy is deliberate; see DESIGN.md).
//!
//! Deterministic given {rate, depth, sample rate} and the call count; the
//! phase accumulator is the only state.

use echoline_core::dsp::sin_turns;

/// Low-frequency sine modulator with phase in [0, 1).
#[derive(Copy, Clone, Debug)]
pub struct Wobble {
    phase: f32,    // [0,1)
    rate_hz: f32,  // cycles per second
    depth: f32,    // peak offset in samples
    sr: f32,
}

impl Wobble {
    #[inline]
    pub fn new(rate_hz: f32, depth_samples: f32, sr: f32) -> Self {
        Self {
            phase: 0.0,
            rate_hz: rate_hz.max(0.0),
            depth: depth_samples.max(0.0),
            sr: sr.max(1.0),
        }
    }

    #[inline]
    pub fn set_rate(&mut self, hz: f32) {
        self.rate_hz = hz.max(0.0);
    }

    #[inline]
    pub fn set_depth(&mut self, samples: f32) {
        self.depth = samples.max(0.0);
    }

    /// Session (re)configuration: adopt the new sample rate and rewind the
    /// phase to zero so a fresh session never starts mid-cycle.
    #[inline]
    pub fn reset(&mut self, sr: f32) {
        self.sr = sr.max(1.0);
        self.phase = 0.0;
    }

    /// Current offset in samples, then advance the phase by one tick.
    ///
    /// Returns `sin(2π·φ) · depth` in `[-depth, +depth]`. The phase advances
    /// by `rate / sample_rate` per call and wraps by subtracting 1.0 when it
    /// reaches or exceeds 1.0.
    #[inline]
    pub fn next_offset(&mut self) -> f32 {
        let out = sin_turns(self.phase) * self.depth;
        self.phase += self.rate_hz / self.sr;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        out
    }

    #[inline]
    pub fn phase01(&self) -> f32 {
        self.phase
    }
}

// ------------------------------------ Tests --------------------------------------

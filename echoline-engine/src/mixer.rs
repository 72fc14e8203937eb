//! Dry/wet blend with a smoothed mix coefficient.
//!
//! The mix knob is the one control whose jumps are most audible, so the mixer
//! never applies a target directly: [`Mixer::next_value`] slews linearly
//! towards it over a fixed 50 ms window, ticked once per block. Within one
//! block the mix is constant, matching the parameter-snapshot discipline.
//!
//! The blend itself is the plain linear crossfade
//! `out[i] = dry[i]·(1−m) + wet[i]·m` — continuous in `m` and monotonic in
//! the dry/wet balance.

use echoline_core::dsp::clamp;
use echoline_core::smooth::LinearSlew;

/// Smoothing window for the mix coefficient.
pub const MIX_SMOOTHING_MS: f32 = 50.0;

/// Block-rate smoothed dry/wet mixer.
#[derive(Copy, Clone, Debug)]
pub struct Mixer {
    slew: LinearSlew,
}

impl Mixer {
    /// `block_len` and `sr` size the per-block step so a full-range change
    /// completes within [`MIX_SMOOTHING_MS`].
    #[inline]
    pub fn new(initial_mix: f32, block_len: usize, sr: f32) -> Self {
        let initial = clamp(initial_mix, 0.0, 1.0);
        Self { slew: LinearSlew::per_block(initial, MIX_SMOOTHING_MS, block_len, sr) }
    }

    /// Re-derive the per-block step for a new session geometry and jump the
    /// smoother to `mix` (session reset, not a smooth move).
    #[inline]
    pub fn reconfigure(&mut self, mix: f32, block_len: usize, sr: f32) {
        let m = clamp(mix, 0.0, 1.0);
        self.slew = LinearSlew::per_block(m, MIX_SMOOTHING_MS, block_len, sr);
    }

    #[inline]
    pub fn set_target(&mut self, mix: f32) {
        self.slew.set_target(clamp(mix, 0.0, 1.0));
    }

    /// The mix value to use for the coming block. Moves at most one smoothing
    /// step per call; monotonic towards the target, no overshoot.
    #[inline]
    pub fn next_value(&mut self) -> f32 {
        self.slew.next()
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.slew.value()
    }

    /// Linear crossfade of one block: `out = dry·(1−m) + wet·m`.
    /// All three slices must be the same length.
    #[inline]
    pub fn blend(dry: &[f32], wet: &[f32], mix: f32, out: &mut [f32]) {
        debug_assert!(dry.len() == wet.len() && wet.len() == out.len());
        let m = clamp(mix, 0.0, 1.0);
        let dry_g = 1.0 - m;
        for ((o, &d), &w) in out.iter_mut().zip(dry).zip(wet) {
            *o = d * dry_g + w * m;
        }
    }
}

// ------------------------------------ Tests --------------------------------------

//! Lock-free parameter store and the per-block snapshot discipline.
//!
//! The four knobs live in a [`ParamStore`] owned by the control context (UI,
//! host automation, CLI flags) and shared with the audio thread behind an
//! `Arc`. Each knob is an independent f32 bit-packed into an `AtomicU32`, so
//! the audio thread can take a torn-free copy of each scalar with a relaxed
//! load. The knobs are independent controls, not an interdependent unit, so
//! four scalar loads are enough; no compound read, no lock.
//!
//! [`ParamStore::snapshot`] is called once per block. The resulting
//! [`ParamSnapshot`] is plain data: every channel of that block sees the same
//! values, and no write can be observed mid-block.
//!
//! Range policy: values are clamped to their documented range on store *and*
//! on load. Out-of-range input is recovered locally, never an error.

use core::sync::atomic::{AtomicU32, Ordering};

use echoline_core::dsp::clamp;

use crate::delay::MAX_FEEDBACK;

/// Documented delay-time range in milliseconds.
pub const DELAY_MS_MIN: f32 = 0.1;
pub const DELAY_MS_MAX: f32 = 2000.0;

/// f32 scalar stored as atomic bits.
#[derive(Debug)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(v: f32) -> Self {
        Self(AtomicU32::new(v.to_bits()))
    }

    #[inline]
    fn store(&self, v: f32) {
        self.0.store(v.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// Shared knob storage. Control threads write, the audio thread snapshots.
#[derive(Debug)]
pub struct ParamStore {
    delay_ms: AtomicF32,
    feedback: AtomicF32,
    level: AtomicF32,
    mix: AtomicF32,
}

impl Default for ParamStore {
    fn default() -> Self {
        Self {
            delay_ms: AtomicF32::new(500.0),
            feedback: AtomicF32::new(0.35),
            level: AtomicF32::new(0.8),
            mix: AtomicF32::new(0.5),
        }
    }
}

impl ParamStore {
    pub fn new(delay_ms: f32, feedback: f32, level: f32, mix: f32) -> Self {
        let s = Self::default();
        s.set_delay_ms(delay_ms);
        s.set_feedback(feedback);
        s.set_level(level);
        s.set_mix(mix);
        s
    }

    #[inline]
    pub fn set_delay_ms(&self, ms: f32) {
        self.delay_ms.store(clamp(ms, DELAY_MS_MIN, DELAY_MS_MAX));
    }

    #[inline]
    pub fn set_feedback(&self, fb: f32) {
        self.feedback.store(clamp(fb, 0.0, MAX_FEEDBACK));
    }

    #[inline]
    pub fn set_level(&self, level: f32) {
        self.level.store(clamp(level, 0.0, 1.0));
    }

    #[inline]
    pub fn set_mix(&self, mix: f32) {
        self.mix.store(clamp(mix, 0.0, 1.0));
    }

    /// One torn-free copy of every knob for the coming block.
    #[inline]
    pub fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            delay_ms: clamp(self.delay_ms.load(), DELAY_MS_MIN, DELAY_MS_MAX),
            feedback: clamp(self.feedback.load(), 0.0, MAX_FEEDBACK),
            level: clamp(self.level.load(), 0.0, 1.0),
            mix: clamp(self.mix.load(), 0.0, 1.0),
        }
    }
}

/// Read-only per-block copy of the four knobs.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ParamSnapshot {
    pub delay_ms: f32,
    pub feedback: f32,
    pub level: f32,
    pub mix: f32,
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_stores() {
        let p = ParamStore::default();
        p.set_delay_ms(250.0);
        p.set_feedback(0.4);
        p.set_level(0.9);
        p.set_mix(0.25);
        let s = p.snapshot();
        assert_eq!(s.delay_ms, 250.0);
        assert_eq!(s.feedback, 0.4);
        assert_eq!(s.level, 0.9);
        assert_eq!(s.mix, 0.25);
    }

    #[test]
    fn out_of_range_values_are_clamped_not_rejected() {
        let p = ParamStore::default();
        p.set_delay_ms(-10.0);
        p.set_feedback(3.0);
        p.set_level(2.0);
        p.set_mix(-0.5);
        let s = p.snapshot();
        assert_eq!(s.delay_ms, DELAY_MS_MIN);
        assert_eq!(s.feedback, MAX_FEEDBACK);
        assert_eq!(s.level, 1.0);
        assert_eq!(s.mix, 0.0);
    }

    #[test]
    fn snapshots_are_stable_copies() {
        let p = ParamStore::new(100.0, 0.2, 0.5, 0.5);
        let s1 = p.snapshot();
        p.set_delay_ms(1000.0);
        // An already-taken snapshot never changes mid-block.
        assert_eq!(s1.delay_ms, 100.0);
        assert_eq!(p.snapshot().delay_ms, 1000.0);
    }
}

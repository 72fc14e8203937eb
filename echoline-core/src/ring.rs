//! Wrap-aware circular sample storage.
//!
//! The ring is the single place in the engine where buffer indices wrap, so
//! every operation here takes a raw `offset` and reduces it modulo capacity.
//! The ring deliberately owns **no cursor**: the delay line aggregate holds
//! one write cursor shared by all of its per-channel rings, so all channels
//! of a block see the same position.
//!
//! Operations:
//! - `write`      : copy a span in, with a linear gain ramp
//! - `accumulate` : add a span into existing contents (feedback path)
//! - `read`       : copy a span out, no mutation
//!
//! All three split into a tail copy and a head copy when the span crosses the
//! end of storage. The gain ramp is indexed by position within the *logical*
//! span, so the ramp is continuous across the split.
//!
//! Capacity is fixed for the lifetime of a playback session; `resize` is only
//! called from session (re)configuration, never from the audio thread.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

/// Fixed-capacity circular buffer of f32 samples.
#[derive(Clone, Debug)]
pub struct RingBuffer {
    buf: Vec<f32>,
}

impl RingBuffer {
    /// Allocate a ring holding `capacity` samples, zero-filled.
    /// Capacity is clamped to at least 1 so the modulo arithmetic is defined.
    pub fn new(capacity: usize) -> Self {
        Self { buf: vec![0.0; capacity.max(1)] }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Zero the contents without touching capacity.
    pub fn clear(&mut self) {
        self.buf.fill(0.0);
    }

    /// Re-size the storage between sessions. Contents are discarded.
    /// Must not be called from the audio thread (allocates).
    pub fn resize(&mut self, capacity: usize) {
        self.buf.clear();
        self.buf.resize(capacity.max(1), 0.0);
    }

    /// Copy `src` into the ring starting at `offset mod capacity`, scaling by
    /// a linear gain ramp from `g0` (first sample) towards `g1`.
    ///
    /// Spans up to the full capacity are accepted; longer spans are a logic
    /// error upstream (debug-asserted).
    #[inline]
    pub fn write(&mut self, offset: usize, src: &[f32], g0: f32, g1: f32) {
        self.apply_ramped(offset, src, g0, g1, false);
    }

    /// Like [`write`](Self::write), but adds into existing contents instead
    /// of overwriting them. Used for the feedback path.
    #[inline]
    pub fn accumulate(&mut self, offset: usize, src: &[f32], g0: f32, g1: f32) {
        self.apply_ramped(offset, src, g0, g1, true);
    }

    /// Copy `dst.len()` samples out of the ring, starting at
    /// `offset mod capacity`, splitting at the wrap boundary. Never mutates.
    pub fn read(&self, offset: usize, dst: &mut [f32]) {
        let cap = self.buf.len();
        let len = dst.len();
        if len == 0 {
            return;
        }
        debug_assert!(len <= cap, "read span ({len}) exceeds ring capacity ({cap})");
        let offset = offset % cap;

        let tail = (cap - offset).min(len);
        dst[..tail].copy_from_slice(&self.buf[offset..offset + tail]);
        if tail < len {
            dst[tail..].copy_from_slice(&self.buf[..len - tail]);
        }
    }

    /// Shared span copy with wrap split. The ramp index `i` runs over the
    /// logical span so sample `i` always carries gain `g0 + i * step`,
    /// regardless of which physical sub-copy it lands in.
    fn apply_ramped(&mut self, offset: usize, src: &[f32], g0: f32, g1: f32, add: bool) {
        let cap = self.buf.len();
        let len = src.len();
        if len == 0 {
            return;
        }
        debug_assert!(len <= cap, "span ({len}) exceeds ring capacity ({cap})");
        let offset = offset % cap;
        let step = crate::dsp::ramp_step(g0, g1, len);

        let tail = (cap - offset).min(len);
        for i in 0..tail {
            let v = src[i] * (g0 + step * i as f32);
            let slot = &mut self.buf[offset + i];
            if add {
                *slot += v;
            } else {
                *slot = v;
            }
        }
        for i in tail..len {
            let v = src[i] * (g0 + step * i as f32);
            let slot = &mut self.buf[i - tail];
            if add {
                *slot += v;
            } else {
                *slot = v;
            }
        }
    }

    /// Direct sample access, mainly for tests and meters.
    #[inline]
    pub fn at(&self, index: usize) -> f32 {
        self.buf[index % self.buf.len()]
    }
}

// ------------------------------------ Tests --------------------------------------

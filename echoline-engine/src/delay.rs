//! The delay line aggregate: per-channel rings behind one shared write cursor.
//!
//! Layout
//! - One [`RingBuffer`] per channel (channel count fixed per session).
//! - A single write cursor `W`, owned here and shared by every channel, so all
//!   channels of one block read and write relative to the same position. The
//!   cursor advances once per block, after all channels are done.
//!
//! Gain continuity
//! - `write_dry` and `feedback_into` ramp their gain linearly from the value
//!   used in the previous block to the value requested for this block. The
//!   previous values are committed in `advance_cursor`, so a parameter jump
//!   between blocks turns into a ramp across the next block instead of a click.
//!
//! Read positions
//! - `R = (C + W − round(delay_samples − wobble_offset)) mod C`, with the net
//!   lookbehind clamped to `[0, C − span]` so a read never runs ahead of `W`
//!   into samples that have not been written yet.

use echoline_core::dsp::clamp;
use echoline_core::ring::RingBuffer;

/// Hard ceiling on feedback gain. At or above unity the loop would grow
/// without bound; 0.7 keeps the geometric decay comfortably summable.
pub const MAX_FEEDBACK: f32 = 0.7;

/// Multi-channel delay storage with a shared write cursor.
#[derive(Clone, Debug)]
pub struct DelayLine {
    rings: Vec<RingBuffer>,
    write_pos: usize,
    // gains used by the previous block (ramp starts) and the values the
    // current block asked for (committed at advance_cursor)
    prev_level: f32,
    pending_level: f32,
    prev_feedback: f32,
    pending_feedback: f32,
}

impl DelayLine {
    /// Allocate `channels` rings of `capacity` samples each. Allocation
    /// happens here (session setup), never in the per-block calls.
    pub fn new(channels: usize, capacity: usize) -> Self {
        Self {
            rings: (0..channels.max(1)).map(|_| RingBuffer::new(capacity)).collect(),
            write_pos: 0,
            prev_level: 0.0,
            pending_level: 0.0,
            prev_feedback: 0.0,
            pending_feedback: 0.0,
        }
    }

    /// Session reconfiguration: new channel count and/or capacity.
    /// Discards contents and rewinds the cursor.
    pub fn reconfigure(&mut self, channels: usize, capacity: usize) {
        let channels = channels.max(1);
        self.rings.clear();
        self.rings.extend((0..channels).map(|_| RingBuffer::new(capacity)));
        self.reset();
    }

    /// Zero all rings, rewind the cursor, and fade gains in from silence.
    pub fn reset(&mut self) {
        for r in &mut self.rings {
            r.clear();
        }
        self.write_pos = 0;
        self.prev_level = 0.0;
        self.pending_level = 0.0;
        self.prev_feedback = 0.0;
        self.pending_feedback = 0.0;
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.rings.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.rings[0].capacity()
    }

    /// Position where the next sample will be written.
    #[inline]
    pub fn write_cursor(&self) -> usize {
        self.write_pos
    }

    /// Record this block's dry input at the shared cursor, ramping from the
    /// previous block's level gain to `level` (clamped to [0, 1]).
    #[inline]
    pub fn write_dry(&mut self, channel: usize, input: &[f32], level: f32) {
        let level = clamp(level, 0.0, 1.0);
        self.rings[channel].write(self.write_pos, input, self.prev_level, level);
        self.pending_level = level;
    }

    /// Resolve the read position for a span of `span_len` samples delayed by
    /// `delay_samples` and nudged by `wobble_offset` (both in samples).
    ///
    /// The net lookbehind is clamped to `[0, C − span_len]`: zero means the
    /// read starts exactly at the span just written (near-zero-latency
    /// passthrough), the upper bound keeps the read behind the cursor.
    #[inline]
    pub fn read_position(&self, delay_samples: f32, wobble_offset: f32, span_len: usize) -> usize {
        let cap = self.capacity();
        let max_back = cap.saturating_sub(span_len) as f32;
        let back = clamp((delay_samples - wobble_offset).round(), 0.0, max_back) as usize;
        (cap + self.write_pos - back) % cap
    }

    /// Read `dst.len()` delayed samples for `channel` into `dst`.
    #[inline]
    pub fn read_delayed(
        &self,
        channel: usize,
        dst: &mut [f32],
        delay_samples: f32,
        wobble_offset: f32,
    ) {
        let pos = self.read_position(delay_samples, wobble_offset, dst.len());
        self.rings[channel].read(pos, dst);
    }

    /// Re-inject the processed (wet) block into the ring at the cursor,
    /// accumulating on top of the dry input already recorded there. Feedback
    /// gain ramps from the previous block's value and is clamped to
    /// `[0, MAX_FEEDBACK]` so the loop stays bounded.
    #[inline]
    pub fn feedback_into(&mut self, channel: usize, wet: &[f32], feedback: f32) {
        let fb = clamp(feedback, 0.0, MAX_FEEDBACK);
        self.rings[channel].accumulate(self.write_pos, wet, self.prev_feedback, fb);
        self.pending_feedback = fb;
    }

    /// Advance the shared cursor past this block and commit the gains the
    /// block used as next block's ramp starts. Call exactly once per block,
    /// after every channel has been written, read, and fed back.
    #[inline]
    pub fn advance_cursor(&mut self, block_len: usize) {
        let cap = self.capacity();
        self.write_pos = (self.write_pos + block_len) % cap;
        self.prev_level = self.pending_level;
        self.prev_feedback = self.pending_feedback;
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_position_is_always_in_range() {
        let mut dl = DelayLine::new(1, 1000);
        for _ in 0..7 {
            for delay in [0.0, 1.0, 63.5, 500.0, 936.0, 5000.0] {
                for wob in [-20.0, 0.0, 20.0] {
                    let r = dl.read_position(delay, wob, 64);
                    assert!(r < 1000, "r={r} delay={delay} wob={wob}");
                }
            }
            dl.advance_cursor(64);
        }
    }

    #[test]
    fn zero_delay_reads_the_block_just_written() {
        let mut dl = DelayLine::new(1, 256);
        // Settle the level ramp so the next write is unity across the block.
        let silence = [0.0f32; 4];
        dl.write_dry(0, &silence, 1.0);
        dl.advance_cursor(4);

        let block = [1.0, 2.0, 3.0, 4.0];
        dl.write_dry(0, &block, 1.0);
        let mut out = [0.0f32; 4];
        dl.read_delayed(0, &mut out, 0.0, 0.0);
        assert_eq!(out, block);
        // After advancing, the zero-delay read position equals the new
        // cursor, i.e. the read sat at cursor-minus-block-length.
        let before = dl.read_position(0.0, 0.0, 4);
        dl.advance_cursor(4);
        assert_eq!(before, dl.write_cursor() - 4);
    }

    #[test]
    fn echo_is_unity_once_level_ramp_has_settled() {
        let mut dl = DelayLine::new(1, 512);
        let block_len = 16;
        let delay = (2 * block_len) as f32;
        let silence = vec![0.0f32; block_len];
        let mut out = vec![0.0f32; block_len];

        // Settle the level ramp with one silent block first.
        dl.write_dry(0, &silence, 1.0);
        dl.advance_cursor(block_len);

        let mut impulse = vec![0.0f32; block_len];
        impulse[3] = 1.0;
        dl.write_dry(0, &impulse, 1.0);
        dl.advance_cursor(block_len);

        dl.write_dry(0, &silence, 1.0);
        dl.advance_cursor(block_len);

        dl.write_dry(0, &silence, 1.0);
        dl.read_delayed(0, &mut out, delay, 0.0);
        assert!((out[3] - 1.0).abs() < 1e-6, "echo magnitude: {}", out[3]);
    }

    #[test]
    fn channels_share_one_cursor() {
        let mut dl = DelayLine::new(2, 128);
        let a = [1.0f32; 8];
        let b = [2.0f32; 8];
        dl.write_dry(0, &a, 1.0);
        dl.write_dry(1, &b, 1.0);
        let w = dl.write_cursor();
        dl.advance_cursor(8);
        assert_eq!(dl.write_cursor(), w + 8);

        let mut out = [0.0f32; 8];
        dl.read_delayed(0, &mut out, 8.0, 0.0);
        assert_eq!(out, a);
        dl.read_delayed(1, &mut out, 8.0, 0.0);
        assert_eq!(out, b);
    }

    #[test]
    fn feedback_gain_is_clamped_to_ceiling() {
        let mut dl = DelayLine::new(1, 64);
        let wet = [1.0f32; 4];
        // Ask for runaway feedback; the line must cap it at MAX_FEEDBACK.
        dl.feedback_into(0, &wet, 1.5);
        dl.advance_cursor(4);
        dl.feedback_into(0, &wet, 1.5);
        let mut out = [0.0f32; 4];
        dl.read_delayed(0, &mut out, 0.0, 0.0);
        for s in out {
            assert!(s <= MAX_FEEDBACK + 1e-6, "feedback not clamped: {s}");
        }
    }

    #[test]
    fn sustained_feedback_converges_to_a_finite_bound() {
        // Sustained unit impulses with feedback pinned at the ceiling must
        // converge to the geometric bound 1/(1-0.7), never grow unbounded.
        let mut dl = DelayLine::new(1, 256);
        let block_len = 32;
        let delay = block_len as f32;
        let mut input = vec![0.0f32; block_len];
        input[0] = 1.0;
        let mut wet = vec![0.0f32; block_len];
        let mut peak = 0.0f32;

        for _ in 0..400 {
            dl.write_dry(0, &input, 1.0);
            dl.read_delayed(0, &mut wet, delay, 0.0);
            dl.feedback_into(0, &wet, MAX_FEEDBACK);
            dl.advance_cursor(block_len);
            for &s in wet.iter() {
                peak = peak.max(s.abs());
            }
        }

        let bound = 1.0 / (1.0 - MAX_FEEDBACK) + 0.5;
        assert!(peak <= bound, "peak {peak} exceeded bound {bound}");
        assert!(peak > 1.0, "feedback never built up (peak {peak})");
    }

    #[test]
    fn level_ramp_starts_where_last_block_ended() {
        let mut dl = DelayLine::new(1, 128);
        let ones = [1.0f32; 8];
        dl.write_dry(0, &ones, 0.5);
        dl.advance_cursor(8);
        // Second block jumps the level to 1.0; its first sample must still
        // carry the previous block's 0.5 as the ramp start.
        dl.write_dry(0, &ones, 1.0);
        let mut out = [0.0f32; 8];
        dl.read_delayed(0, &mut out, 0.0, 0.0);
        assert!((out[0] - 0.5).abs() < 1e-6, "ramp start: {}", out[0]);
        assert!(out[7] < 1.0 && out[7] > out[0], "ramp not rising: {:?}", out);
    }

    #[test]
    fn wobble_offset_shifts_the_read_position() {
        let mut dl = DelayLine::new(1, 128);
        dl.advance_cursor(64);
        let base = dl.read_position(32.0, 0.0, 8);
        let earlier = dl.read_position(32.0, -4.0, 8); // deeper lookbehind
        let later = dl.read_position(32.0, 4.0, 8);
        assert_eq!(base, 32);
        assert_eq!(earlier, 28);
        assert_eq!(later, 36);
    }
}

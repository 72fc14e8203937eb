//! Per-block orchestration: the facade the host/CLI/FFI layers drive.
//!
//! Lifecycle: `Unconfigured → Ready`, with processing re-entered every block
//! while Ready. [`DelayEngine::configure`] sizes all owned storage for the
//! session (sample rate, max block length, channel count), resets the cursor,
//! the wobble phase, and the mix smoother; it may be called again between
//! sessions and fully resets state each time. [`DelayEngine::process_block`]
//! is the realtime entry point: bounded time, no allocation, no locks, no I/O.
//!
//! Per block the facade:
//! 1. snapshots the shared parameter store (one torn-free copy for the block)
//! 2. advances the mix smoother once (mix is constant within the block)
//! 3. per channel: takes a wobble offset, records the level-ramped dry input
//!    at the cursor, reads the delayed span into wet scratch, re-injects the
//!    wet span with feedback gain, and blends dry/wet into the output
//! 4. advances the shared write cursor by the block length

use std::sync::Arc;

use thiserror::Error;

use echoline_core::dsp::{kill_denormals, ms_to_samples};

use crate::delay::DelayLine;
use crate::mixer::Mixer;
use crate::params::{ParamStore, DELAY_MS_MAX};
use crate::wobble::Wobble;

/// Fatal session-configuration errors. Anything here means the session
/// cannot start; there is no per-block recovery path.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("sample rate must be positive and finite, got {0}")]
    BadSampleRate(f32),
    #[error("max block length must be non-zero")]
    BadBlockLength,
    #[error("channel count must be non-zero")]
    BadChannelCount,
    #[error("ring capacity {capacity} too small for max delay {max_delay_samples} + block {max_block}")]
    CapacityTooSmall {
        capacity: usize,
        max_delay_samples: usize,
        max_block: usize,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum EngineState {
    Unconfigured,
    Ready,
}

/// The delay engine facade. Owns the delay line, the wobble LFO, the mixer,
/// and the wet scratch block; shares only the [`ParamStore`] with the
/// control context.
pub struct DelayEngine {
    state: EngineState,
    sr: f32,
    max_block: usize,
    channels: usize,

    delay: DelayLine,
    wobble: Wobble,
    mixer: Mixer,
    params: Arc<ParamStore>,

    // wet scratch, sized to max_block at configure time
    wet: Vec<f32>,
}

impl DelayEngine {
    /// A new, unconfigured engine. Wobble starts disabled (zero rate and
    /// depth); enable it with [`set_wobble`](Self::set_wobble).
    pub fn new(params: Arc<ParamStore>) -> Self {
        Self {
            state: EngineState::Unconfigured,
            sr: 0.0,
            max_block: 0,
            channels: 0,
            delay: DelayLine::new(1, 1),
            wobble: Wobble::new(0.0, 0.0, 48_000.0),
            mixer: Mixer::new(0.0, 1, 48_000.0),
            params,
            wet: Vec::new(),
        }
    }

    /// Size the engine for a playback session. Safe to call again between
    /// sessions; every call fully resets cursor, phase, and smoother state.
    ///
    /// Ring capacity per channel is `2·(sample_rate + max_block)` samples,
    /// which holds the full 2000 ms delay range plus one block of headroom at
    /// any sample rate. The capacity invariant
    /// `C > max_block + max_delay_samples` is checked here, not per block.
    pub fn configure(
        &mut self,
        sample_rate: f32,
        max_block: usize,
        channels: usize,
    ) -> Result<(), ConfigError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ConfigError::BadSampleRate(sample_rate));
        }
        if max_block == 0 {
            return Err(ConfigError::BadBlockLength);
        }
        if channels == 0 {
            return Err(ConfigError::BadChannelCount);
        }

        let capacity = (2.0 * (sample_rate + max_block as f32)) as usize;
        let max_delay_samples = ms_to_samples(DELAY_MS_MAX, sample_rate).ceil() as usize;
        if capacity <= max_block + max_delay_samples {
            return Err(ConfigError::CapacityTooSmall {
                capacity,
                max_delay_samples,
                max_block,
            });
        }

        self.sr = sample_rate;
        self.max_block = max_block;
        self.channels = channels;

        self.delay.reconfigure(channels, capacity);
        self.wobble.reset(sample_rate);
        self.mixer
            .reconfigure(self.params.snapshot().mix, max_block, sample_rate);
        self.wet.clear();
        self.wet.resize(max_block, 0.0);
        self.state = EngineState::Ready;
        Ok(())
    }

    /// Clear audio state without changing the session geometry (stop/play).
    /// Stale echoes must not bleed into the next run.
    pub fn reset(&mut self) {
        if self.state != EngineState::Ready {
            return;
        }
        self.delay.reset();
        self.wobble.reset(self.sr);
        self.mixer
            .reconfigure(self.params.snapshot().mix, self.max_block, self.sr);
    }

    /// Set the wobble modulation: `rate_hz` cycles per second, `depth` in
    /// samples of read-position excursion.
    pub fn set_wobble(&mut self, rate_hz: f32, depth_samples: f32) {
        self.wobble.set_rate(rate_hz);
        self.wobble.set_depth(depth_samples);
    }

    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.sr
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn max_block(&self) -> usize {
        self.max_block
    }

    #[inline]
    pub fn params(&self) -> &Arc<ParamStore> {
        &self.params
    }

    /// Process one block. Realtime-safe: no allocation, no locks, no I/O.
    ///
    /// # Panics
    ///
    /// Calling this before [`configure`](Self::configure), or with a channel
    /// count or block length that does not match the configured session, is a
    /// caller bug and panics. These are precondition violations, not runtime
    /// conditions to recover from.
    pub fn process_block(&mut self, input: &[&[f32]], output: &mut [&mut [f32]]) {
        assert!(
            self.state == EngineState::Ready,
            "process_block called before configure"
        );
        assert!(
            input.len() == self.channels && output.len() == self.channels,
            "channel count mismatch: configured {}, got {} in / {} out",
            self.channels,
            input.len(),
            output.len()
        );
        let block_len = input[0].len();
        assert!(
            block_len <= self.max_block,
            "block length {} exceeds configured maximum {}",
            block_len,
            self.max_block
        );
        for ch in 0..self.channels {
            assert!(
                input[ch].len() == block_len && output[ch].len() == block_len,
                "ragged channel buffers in block"
            );
        }

        // One temporally consistent view of the knobs for the whole block.
        let snap = self.params.snapshot();
        let delay_samples = ms_to_samples(snap.delay_ms, self.sr);

        // Mix moves one smoothing step per block, constant within it.
        self.mixer.set_target(snap.mix);
        let mix = self.mixer.next_value();

        for ch in 0..self.channels {
            let dry = input[ch];
            let offset = self.wobble.next_offset();

            self.delay.write_dry(ch, dry, snap.level);

            let wet = &mut self.wet[..block_len];
            self.delay.read_delayed(ch, wet, delay_samples, offset);

            // Flush denormals before they re-enter the loop; decayed
            // feedback tails otherwise stall the FPU on some targets.
            for s in wet.iter_mut() {
                *s = kill_denormals(*s);
            }

            self.delay.feedback_into(ch, wet, snap.feedback);
            Mixer::blend(dry, &*wet, mix, &mut *output[ch]);
        }

        self.delay.advance_cursor(block_len);
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(params: ParamStore, sr: f32, block: usize, ch: usize) -> DelayEngine {
        let mut e = DelayEngine::new(Arc::new(params));
        e.configure(sr, block, ch).expect("configure failed");
        e
    }

    fn run_block(e: &mut DelayEngine, input: &[Vec<f32>]) -> Vec<Vec<f32>> {
        let mut out: Vec<Vec<f32>> = input.iter().map(|c| vec![0.0; c.len()]).collect();
        let ins: Vec<&[f32]> = input.iter().map(|c| c.as_slice()).collect();
        let mut outs: Vec<&mut [f32]> = out.iter_mut().map(|c| c.as_mut_slice()).collect();
        e.process_block(&ins, &mut outs);
        out
    }

    #[test]
    fn configure_rejects_bad_geometry() {
        let mut e = DelayEngine::new(Arc::new(ParamStore::default()));
        assert!(matches!(
            e.configure(0.0, 512, 2),
            Err(ConfigError::BadSampleRate(_))
        ));
        assert!(matches!(
            e.configure(f32::NAN, 512, 2),
            Err(ConfigError::BadSampleRate(_))
        ));
        assert!(matches!(
            e.configure(48_000.0, 0, 2),
            Err(ConfigError::BadBlockLength)
        ));
        assert!(matches!(
            e.configure(48_000.0, 512, 0),
            Err(ConfigError::BadChannelCount)
        ));
        assert!(e.configure(48_000.0, 512, 2).is_ok());
    }

    #[test]
    #[should_panic(expected = "before configure")]
    fn processing_unconfigured_is_a_caller_bug() {
        let mut e = DelayEngine::new(Arc::new(ParamStore::default()));
        let buf = [0.0f32; 4];
        let input = [buf.as_slice()];
        let mut out = [0.0f32; 4];
        let mut outs = [out.as_mut_slice()];
        e.process_block(&input, &mut outs);
    }

    #[test]
    #[should_panic(expected = "channel count mismatch")]
    fn channel_mismatch_is_a_caller_bug() {
        let mut e = engine(ParamStore::default(), 48_000.0, 64, 2);
        let buf = [0.0f32; 4];
        let input = [buf.as_slice()];
        let mut out = [0.0f32; 4];
        let mut outs = [out.as_mut_slice()];
        e.process_block(&input, &mut outs);
    }

    #[test]
    fn dry_mix_passes_input_through() {
        let params = ParamStore::new(100.0, 0.3, 0.8, 0.0); // mix 0 → all dry
        let mut e = engine(params, 44_100.0, 64, 1);
        let input = vec![vec![0.5f32, -0.5, 0.25, 1.0]];
        let out = run_block(&mut e, &input);
        assert_eq!(out[0], input[0]);
    }

    #[test]
    fn impulse_echo_arrives_after_delay_blocks() {
        let sr = 44_100.0;
        let block = 441; // 10 ms
        let delay_ms = 20.0; // exactly two blocks
        let params = ParamStore::new(delay_ms, 0.0, 1.0, 1.0); // full wet
        let mut e = engine(params, sr, block, 1);

        let silence = vec![vec![0.0f32; block]];
        let mut impulse = vec![0.0f32; block];
        impulse[100] = 1.0;

        // Settle the level ramp, then send the impulse.
        let _ = run_block(&mut e, &silence);
        let _ = run_block(&mut e, &vec![impulse]);

        let between = run_block(&mut e, &silence);
        assert!(
            between[0].iter().all(|&s| s.abs() < 1e-6),
            "echo arrived a block early"
        );

        let arrive = run_block(&mut e, &silence);
        assert!(
            (arrive[0][100] - 1.0).abs() < 1e-3,
            "echo magnitude: {}",
            arrive[0][100]
        );
    }

    #[test]
    fn feedback_tail_repeats_and_decays() {
        let sr = 44_100.0;
        let block = 441;
        let params = ParamStore::new(10.0, 0.5, 1.0, 1.0); // one-block delay
        let mut e = engine(params, sr, block, 1);

        let silence = vec![vec![0.0f32; block]];
        let mut impulse = vec![0.0f32; block];
        impulse[7] = 1.0;

        let _ = run_block(&mut e, &silence);
        let _ = run_block(&mut e, &vec![impulse]);

        // First echo at full level, each following one halved by feedback.
        let e1 = run_block(&mut e, &silence)[0][7];
        let e2 = run_block(&mut e, &silence)[0][7];
        let e3 = run_block(&mut e, &silence)[0][7];
        assert!((e1 - 1.0).abs() < 1e-3, "e1={e1}");
        assert!((e2 - 0.5).abs() < 1e-2, "e2={e2}");
        assert!((e3 - 0.25).abs() < 1e-2, "e3={e3}");
    }

    #[test]
    fn reconfigure_discards_stale_echoes() {
        let sr = 48_000.0;
        let block = 480;
        let params = ParamStore::new(10.0, 0.5, 1.0, 1.0);
        let mut e = engine(params, sr, block, 2);

        let loud = vec![vec![1.0f32; block]; 2];
        let _ = run_block(&mut e, &loud);
        let _ = run_block(&mut e, &loud);

        e.configure(sr, block, 2).expect("reconfigure failed");
        let silence = vec![vec![0.0f32; block]; 2];
        let out = run_block(&mut e, &silence);
        for ch in &out {
            assert!(ch.iter().all(|&s| s == 0.0), "stale audio after reconfigure");
        }
    }

    #[test]
    fn stereo_channels_stay_independent() {
        let sr = 44_100.0;
        let block = 441;
        let params = ParamStore::new(10.0, 0.0, 1.0, 1.0);
        let mut e = engine(params, sr, block, 2);

        let silence = vec![vec![0.0f32; block]; 2];
        let mut left = vec![0.0f32; block];
        left[5] = 1.0;
        let input = vec![left, vec![0.0f32; block]];

        let _ = run_block(&mut e, &silence);
        let _ = run_block(&mut e, &input);
        let out = run_block(&mut e, &silence);
        assert!((out[0][5] - 1.0).abs() < 1e-3, "left echo missing");
        assert!(out[1].iter().all(|&s| s.abs() < 1e-6), "bleed into right");
    }

    #[test]
    fn mix_changes_ramp_instead_of_jumping() {
        let sr = 48_000.0;
        let block = 480;
        let params = ParamStore::new(100.0, 0.0, 1.0, 0.0);
        let mut e = engine(params, sr, block, 1);

        let ones = vec![vec![1.0f32; block]];
        let _ = run_block(&mut e, &ones);

        // Slam the mix knob; output level must move gradually.
        e.params().set_mix(1.0);
        let out = run_block(&mut e, &ones);
        let max_step = block as f32 / (0.050 * sr);
        // Dry input is 1.0 and the wet tail is quiet, so a full jump to wet
        // would drop the block level to near zero. One smoothing step keeps
        // it within max_step of unity.
        assert!(
            out[0][0] > 1.0 - max_step - 1e-3,
            "mix jumped: {}",
            out[0][0]
        );
    }
}

//! C ABI wrapper for the echoline delay engine.
//!
//! Exposes a small set of functions to create/destroy an engine, process
//! interleaved f32 audio through the delay, and tweak the four knobs.
//!
//! ABI notes
//! - All functions are `extern "C"` and `#[no_mangle]`.
//! - Opaque handle type: `EcholineEngine` (heap-allocated; you own/delete it).
//! - The process call takes and returns **interleaved** f32 frames; planar
//!   scratch for the engine lives inside the handle, sized at configure time.
//!
//! Threading
//! - Knob setters are safe from any thread (they route through the atomic
//!   parameter store). Everything else must be called from one thread.

use std::sync::Arc;

use echoline_engine::{DelayEngine, ParamStore};

/// Opaque engine wrapper we hand to C.
///
/// Holds the planar de/re-interleave scratch so the per-call path never
/// allocates. The host should call `echoline_configure` again whenever the
/// device geometry changes.
#[repr(C)]
pub struct EcholineEngine {
    channels: usize,
    max_block: usize,
    params: Arc<ParamStore>,
    inner: DelayEngine,
    in_planar: Vec<Vec<f32>>,
    out_planar: Vec<Vec<f32>>,
}

impl EcholineEngine {
    fn new(sample_rate: f32, max_block: usize, channels: usize) -> Option<Self> {
        let params = Arc::new(ParamStore::default());
        let mut inner = DelayEngine::new(params.clone());
        inner.configure(sample_rate, max_block, channels).ok()?;
        Some(Self {
            channels,
            max_block,
            params,
            inner,
            in_planar: vec![vec![0.0; max_block]; channels],
            out_planar: vec![vec![0.0; max_block]; channels],
        })
    }
}

// --- Creation / destruction -------------------------------------------------------

/// Create a new engine configured for the given session geometry.
/// Returns null if the configuration is rejected (bad sample rate, zero
/// block length or channel count).
#[no_mangle]
pub extern "C" fn echoline_create(
    sample_rate: f32,
    max_block: usize,
    channels: usize,
) -> *mut EcholineEngine {
    match EcholineEngine::new(sample_rate, max_block, channels) {
        Some(e) => Box::into_raw(Box::new(e)),
        None => std::ptr::null_mut(),
    }
}

/// Destroy an engine previously returned by `echoline_create`.
#[no_mangle]
pub extern "C" fn echoline_destroy(engine: *mut EcholineEngine) {
    if !engine.is_null() {
        unsafe { drop(Box::from_raw(engine)); }
    }
}

/// Re-configure for a new session (sample rate / block / channel change).
/// Fully resets cursor, wobble phase, and smoother state.
/// Returns 1 on success, 0 if the configuration is rejected.
#[no_mangle]
pub extern "C" fn echoline_configure(
    engine: *mut EcholineEngine,
    sample_rate: f32,
    max_block: usize,
    channels: usize,
) -> i32 {
    if engine.is_null() {
        return 0;
    }
    let e = unsafe { &mut *engine };
    if e.inner.configure(sample_rate, max_block, channels).is_err() {
        return 0;
    }
    e.channels = channels;
    e.max_block = max_block;
    e.in_planar = vec![vec![0.0; max_block]; channels];
    e.out_planar = vec![vec![0.0; max_block]; channels];
    1
}

/// Clear audio state (stop/play) without changing the session geometry.
#[no_mangle]
pub extern "C" fn echoline_reset(engine: *mut EcholineEngine) {
    if engine.is_null() {
        return;
    }
    unsafe { &mut *engine }.inner.reset();
}

// --- Knobs ------------------------------------------------------------------------

/// Delay time in milliseconds, clamped to [0.1, 2000].
#[no_mangle]
pub extern "C" fn echoline_set_delay_ms(engine: *mut EcholineEngine, ms: f32) {
    if engine.is_null() { return; }
    unsafe { &*engine }.params.set_delay_ms(ms);
}

/// Feedback gain, clamped to [0, 0.7].
#[no_mangle]
pub extern "C" fn echoline_set_feedback(engine: *mut EcholineEngine, feedback: f32) {
    if engine.is_null() { return; }
    unsafe { &*engine }.params.set_feedback(feedback);
}

/// Input level gain, clamped to [0, 1].
#[no_mangle]
pub extern "C" fn echoline_set_level(engine: *mut EcholineEngine, level: f32) {
    if engine.is_null() { return; }
    unsafe { &*engine }.params.set_level(level);
}

/// Dry/wet mix, clamped to [0, 1]. Smoothed over 50 ms inside the engine.
#[no_mangle]
pub extern "C" fn echoline_set_mix(engine: *mut EcholineEngine, mix: f32) {
    if engine.is_null() { return; }
    unsafe { &*engine }.params.set_mix(mix);
}

/// Wobble modulation: rate in Hz, depth in samples of read-position excursion.
#[no_mangle]
pub extern "C" fn echoline_set_wobble(engine: *mut EcholineEngine, rate_hz: f32, depth_samples: f32) {
    if engine.is_null() { return; }
    unsafe { &mut *engine }.inner.set_wobble(rate_hz, depth_samples);
}

// --- Processing -------------------------------------------------------------------

/// Process `frames` of interleaved f32 audio with `channels` channels from
/// `input` into `output` (both `frames * channels` floats). `channels` must
/// match the configured channel count. Frame counts larger than the
/// configured max block are processed in chunks.
///
/// Returns the number of frames processed (0 on any argument error).
#[no_mangle]
pub extern "C" fn echoline_process_interleaved_f32(
    engine: *mut EcholineEngine,
    input: *const f32,
    output: *mut f32,
    frames: usize,
    channels: usize,
) -> usize {
    if engine.is_null() || input.is_null() || output.is_null() || frames == 0 {
        return 0;
    }
    let e = unsafe { &mut *engine };
    if channels != e.channels {
        return 0;
    }

    let in_slice = unsafe { std::slice::from_raw_parts(input, frames * channels) };
    let out_slice = unsafe { std::slice::from_raw_parts_mut(output, frames * channels) };

    let mut done = 0usize;
    while done < frames {
        let n = (frames - done).min(e.max_block);

        // de-interleave
        for ch in 0..channels {
            let plane = &mut e.in_planar[ch];
            for i in 0..n {
                plane[i] = in_slice[(done + i) * channels + ch];
            }
        }

        {
            let ins: Vec<&[f32]> = e.in_planar.iter().map(|c| &c[..n]).collect();
            let mut outs: Vec<&mut [f32]> = e.out_planar.iter_mut().map(|c| &mut c[..n]).collect();
            e.inner.process_block(&ins, &mut outs);
        }

        // re-interleave
        for ch in 0..channels {
            let plane = &e.out_planar[ch];
            for i in 0..n {
                out_slice[(done + i) * channels + ch] = plane[i];
            }
        }

        done += n;
    }
    done
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_process_destroy_roundtrip() {
        let e = echoline_create(48_000.0, 128, 2);
        assert!(!e.is_null());

        echoline_set_mix(e, 0.0); // all dry → output mirrors input
        echoline_reset(e); // adopt the new mix immediately instead of ramping
        let frames = 256; // forces chunking at max_block = 128
        let input: Vec<f32> = (0..frames * 2).map(|i| (i % 7) as f32 * 0.1).collect();
        let mut output = vec![0.0f32; frames * 2];
        let n = echoline_process_interleaved_f32(e, input.as_ptr(), output.as_mut_ptr(), frames, 2);
        assert_eq!(n, frames);
        assert_eq!(output, input);

        echoline_destroy(e);
    }

    #[test]
    fn null_and_mismatch_arguments_are_rejected() {
        assert!(echoline_create(0.0, 128, 2).is_null());

        let e = echoline_create(44_100.0, 64, 2);
        let buf = [0.0f32; 64];
        let mut out = [0.0f32; 64];
        // wrong channel count
        assert_eq!(
            echoline_process_interleaved_f32(e, buf.as_ptr(), out.as_mut_ptr(), 32, 1),
            0
        );
        // null engine tolerated
        assert_eq!(
            echoline_process_interleaved_f32(
                std::ptr::null_mut(),
                buf.as_ptr(),
                out.as_mut_ptr(),
                32,
                2
            ),
            0
        );
        echoline_destroy(e);
    }
}

#![cfg_attr(not(feature = "std"), no_std)]
//! Echoline Core — no_std-ready DSP primitives for the realtime delay engine.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` and use `libm`/`micromath` math backends
//! - `fast-math`: enable approximations (polys) for trig in hot paths
//! - `simd`     : enable portable SIMD helper code paths (wide/safe_arch)
//!
//! Modules
//! - [`dsp`]    : math backend, utils (db/lin, ramps, ms↔samples, fast trig)
//! - [`ring`]   : wrap-aware circular sample storage with ramped write/add/read
//! - [`smooth`] : linear slew and one-pole parameter smoothers
//!
//! Design
//! - No heap work inside any per-block operation; ring storage is sized only
//!   at session configuration
//! - Offsets into ring storage always reduce modulo capacity, in one place
//! - Friendly to embedded / real-time targets

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod dsp;
pub mod ring;
pub mod smooth;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::dsp::{
        clamp, db_to_lin, kill_denormals, lerp, lin_to_db, ms_to_samples, ramp_step, sin_turns,
        wrap_phase01, TAU,
    };
    pub use crate::ring::RingBuffer;
    pub use crate::smooth::{LinearSlew, OnePoleSmoother};
}

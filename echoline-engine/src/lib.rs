//! Echoline Engine — realtime circular-buffer delay.
//!
//! Crate layout:
//! - [`delay`]  : `DelayLine` (per-channel rings, shared write cursor)
//! - [`wobble`] : `Wobble`, the read-position modulation LFO
//! - [`mixer`]  : `Mixer`, smoothed dry/wet blend
//! - [`params`] : atomic `ParamStore` and the per-block `ParamSnapshot`
//! - [`engine`] : `DelayEngine`, the per-block facade the host drives
//!
//! The engine deliberately avoids heap allocations in the audio thread: all
//! storage is sized in `configure`, and `process_block` is a pure,
//! block-to-completion function of its inputs and internal state.

pub mod delay;
pub mod engine;
pub mod mixer;
pub mod params;
pub mod wobble;

// Re-export some commonly used items to make downstream imports ergonomic.
pub use delay::{DelayLine, MAX_FEEDBACK};
pub use engine::{ConfigError, DelayEngine};
pub use mixer::Mixer;
pub use params::{ParamSnapshot, ParamStore, DELAY_MS_MAX, DELAY_MS_MIN};
pub use wobble::Wobble;

//! # DSP (Digital Signal Processing) Primitives
//!
//! The core building blocks for the delay effect:
//!
//! - **`circular_buffer`**: a fixed-capacity, power-of-two ring buffer that
//!   stores past audio samples and retrieves them at an arbitrary (even
//!   fractional) lookback. This is the delay line's storage.
//!
//! - **`delay`**: the feedback delay algorithm itself — block-rate parameter
//!   smoothing plus the per-sample cross-faded tap, feedback write, and
//!   dry/wet blend.

pub mod circular_buffer;
pub mod delay;

//! # Circular Buffer (Delay Line Storage)
//!
//! A fixed-capacity ring buffer that stores past audio samples and lets you
//! look back an arbitrary number of samples from "now". This is the heart of
//! the delay effect: the effect writes every processed sample into the ring,
//! and reads echoes back out from `delay` samples in the past.
//!
//! ## How the ring works
//!
//! Picture a circular tape loop with a single write head. Each incoming
//! sample advances the head one slot and records there, overwriting whatever
//! was written a full revolution ago. Reading `N` samples into the past is
//! just an index subtraction on the same loop — nothing is ever shifted or
//! removed.
//!
//! ## Power-of-two capacity
//!
//! The capacity must be a power of two so that wrapping an index reduces to
//! a single bitmask:
//!
//! ```text
//! wrapped = index & (capacity - 1)
//! ```
//!
//! This replaces the `%` a general-size ring would need, which matters in a
//! per-sample loop that runs tens of thousands of times per second. The
//! constraint is checked once, at construction.

/// Ring buffer over a power-of-two sample store.
///
/// The store is allocated once in [`new`](Self::new) and never resized, so
/// no memory allocation can happen during audio processing. All samples
/// start at 0.0 (silence), which is also what cold-start reads of slots that
/// have never been written return.
pub struct CircularBuffer {
    /// The sample store. Length is always a power of two.
    samples: Vec<f32>,

    /// `capacity - 1`. Because the capacity is a power of two, ANDing any
    /// index with this mask wraps it into `[0, capacity)`.
    mask: usize,

    /// The slot holding the most recently written sample. [`write`](Self::write)
    /// advances this first, then stores, so the cursor always rests on the
    /// newest value.
    write_pos: usize,
}

impl CircularBuffer {
    /// Create a buffer holding exactly `capacity` samples of history.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is not a power of two, or is smaller than 2.
    /// Both would break the bitmask wrap above, and a violation is a
    /// programming error rather than a runtime condition, so it is caught
    /// here at construction time — never in the audio path.
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two() && capacity >= 2,
            "circular buffer capacity must be a power of two >= 2, got {capacity}"
        );
        Self {
            samples: vec![0.0; capacity],
            mask: capacity - 1,
            write_pos: 0,
        }
    }

    /// Push one sample: advance the cursor (wrapping) and store `value` at
    /// the new position, overwriting the oldest sample in the ring.
    ///
    /// After `write(v)`, [`head`](Self::head) and `read(0)` both return `v`.
    #[inline]
    pub fn write(&mut self, value: f32) {
        self.write_pos = (self.write_pos + 1) & self.mask;
        self.samples[self.write_pos] = value;
    }

    /// Read the sample written exactly `steps_back` writes before the most
    /// recent one. `read(0)` is the newest sample; larger arguments move
    /// further into the past.
    ///
    /// The index is masked internally, so any magnitude of `steps_back` is
    /// accepted and wraps around the ring. Wrapping past the capacity means
    /// re-reading newer samples again — silently, which is the intended
    /// ring-buffer semantics, not an error.
    ///
    /// The wrapping subtraction is exact modular arithmetic: the capacity
    /// divides `usize::MAX + 1`, so underflow and the mask agree.
    #[inline]
    pub fn read(&self, steps_back: usize) -> f32 {
        self.samples[self.write_pos.wrapping_sub(steps_back) & self.mask]
    }

    /// The most recently written value. Equivalent to `read(0)`.
    #[inline]
    pub fn head(&self) -> f32 {
        self.samples[self.write_pos]
    }

    /// The oldest sample still held in the ring — the slot that the next
    /// [`write`](Self::write) will overwrite.
    ///
    /// Index formula: `(write_pos + 1) & mask`, which is the same sample as
    /// `read(capacity - 1)`. Note this is NOT the most recently written
    /// value; that is [`head`](Self::head)'s job.
    #[inline]
    pub fn tail(&self) -> f32 {
        self.samples[(self.write_pos + 1) & self.mask]
    }

    /// Read at a fractional number of steps into the past, linearly
    /// interpolating between the two neighboring samples:
    ///
    /// ```text
    /// result = read(floor) * (1 - frac) + read(floor + 1) * frac
    /// ```
    ///
    /// For an integer argument this degenerates to a plain `read` with no
    /// blending. Fractional positions blend toward the older neighbor as
    /// the fraction grows, consistent with `read`'s larger-is-older
    /// convention.
    #[inline]
    pub fn interpolate(&self, steps_back: f32) -> f32 {
        let whole = steps_back as usize;
        let frac = steps_back - whole as f32;
        let low = self.read(whole);
        let high = self.read(whole + 1);
        low * (1.0 - frac) + high * frac
    }

    /// The fixed capacity of the ring, in samples.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Zero the entire store and reset the cursor.
    ///
    /// Called when playback stops so that stale echoes don't bleed into the
    /// next play session.
    pub fn clear(&mut self) {
        self.samples.fill(0.0);
        self.write_pos = 0;
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

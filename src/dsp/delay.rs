//! # Feedback Delay Core
//!
//! The per-block delay algorithm: smoothed parameter tracking plus a
//! branch-free per-sample loop that reads a cross-faded tap out of the ring
//! buffer, feeds it back in, and blends dry and wet in place.
//!
//! ## Why two layers of smoothing?
//!
//! Abrupt control changes cause two distinct audible problems:
//!
//! 1. A jump in delay *length* teleports the read tap to a different part of
//!    the ring, producing a waveform discontinuity — a click. The block-rate
//!    exponential moving average below limits how far the tap can move per
//!    block, and the per-sample cross-fade walks the output from the old tap
//!    to the new one across the block so there is no step at all.
//! 2. A jump in the dry/wet *mix* rebalances the output instantly — zipper
//!    noise. The same moving average, applied to the mix, ramps it instead.
//!
//! Feedback is deliberately NOT smoothed: it only scales what is written
//! into the ring, so a jump there is no more discontinuous than the input
//! signal itself.

use super::circular_buffer::CircularBuffer;

/// Per-block convergence rate of the exponential moving averages. Each block
/// closes 4% of the remaining distance to the target, so the distance decays
/// geometrically at `(1 - ALPHA)` per block.
const ALPHA: f32 = 0.04;

/// A mono feedback delay line with click-free delay-time transitions.
///
/// Owns one [`CircularBuffer`] plus the two smoothing scalars that persist
/// across blocks. All state is created once at construction; processing a
/// block performs no allocation and no branching in the sample loop.
pub struct DelayEffect {
    /// The delay line storage.
    buffer: CircularBuffer,

    /// Smoothed delay length in samples. Updated once per block, read every
    /// sample as the "old" tap of the cross-fade. Always within
    /// `[0, capacity - 1]`: the target below is bounded by `capacity - 1`
    /// and a moving average of bounded values stays bounded.
    current_delay: usize,

    /// Smoothed dry/wet mix in `[0, 1]`. 0 = dry only, 1 = wet only.
    dry_wet: f32,
}

impl DelayEffect {
    /// Create an effect over a ring of `capacity` samples.
    ///
    /// `capacity` must be a power of two >= 2 (asserted by the buffer).
    /// The delay starts at zero length and fully dry, and the smoothers
    /// glide toward the host's controls from there.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: CircularBuffer::new(capacity),
            current_delay: 0,
            dry_wet: 0.0,
        }
    }

    /// Clear the delay line and zero the smoothing state, as if freshly
    /// constructed. Called when playback stops so old echoes don't leak
    /// into the next session.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.current_delay = 0;
        self.dry_wet = 0.0;
    }

    /// The current smoothed delay length in samples.
    pub fn delay_samples(&self) -> usize {
        self.current_delay
    }

    /// The current smoothed dry/wet mix.
    pub fn mix(&self) -> f32 {
        self.dry_wet
    }

    /// Process one audio block in place.
    ///
    /// `delay_ctrl`, `feedback`, and `mix_ctrl` are the host's normalized
    /// control values in `[0, 1]`, read once per block. The host is
    /// responsible for clamping them and for never passing an empty block.
    /// Feedback at or above 1.0 makes the loop self-sustaining or growing —
    /// that is the knob's documented hazard, not something corrected here.
    ///
    /// Per block:
    /// 1. Map `delay_ctrl` onto `[5%, 100%]` of the ring, so the delay can
    ///    never collapse to zero length.
    /// 2. Move `current_delay` 4% of the way toward that target (truncated
    ///    to whole samples), and the mix 4% of the way toward `mix_ctrl`.
    /// 3. For every sample, compute the tap as a linear cross-fade in time
    ///    from the old delay length to the new one across the block, write
    ///    `feedback * tap + input` into the ring, and output
    ///    `tap * wet + input * dry`.
    pub fn process_block(
        &mut self,
        samples: &mut [f32],
        delay_ctrl: f32,
        feedback: f32,
        mix_ctrl: f32,
    ) {
        let delay_time = 0.05 + 0.95 * delay_ctrl;
        let raw_target = delay_time * (self.buffer.capacity() - 1) as f32;
        let new_delay =
            (ALPHA * raw_target + (1.0 - ALPHA) * self.current_delay as f32) as usize;
        self.dry_wet = ALPHA * mix_ctrl + (1.0 - ALPHA) * self.dry_wet;

        let old_delay = self.current_delay;
        let block_len = samples.len() as f32;
        let dry = 1.0 - self.dry_wet;

        for (n, sample) in samples.iter_mut().enumerate() {
            // Cross-fade between the tap at the old delay length and the tap
            // at the new one. At n = 0 the old tap dominates; by the end of
            // the block the new tap has taken over, and the next block
            // starts from it. The weights sum to (S - 1) / S, a constant
            // factor the feedback and mix stages inherit.
            let fade = n as f32;
            let dly = (self.buffer.read(old_delay) * (block_len - 1.0 - fade)
                + self.buffer.read(new_delay) * fade)
                / block_len;

            // Feed the attenuated tap plus the live input back into the
            // ring. This recursion is what turns one echo into a train.
            self.buffer.write(feedback * dly + *sample);

            // In-place dry/wet blend.
            *sample = dly * self.dry_wet + *sample * dry;
        }

        self.current_delay = new_delay;
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: usize = 64;

    /// Run `blocks` blocks of silence through the effect with fixed controls.
    fn run_silence(fx: &mut DelayEffect, blocks: usize, delay: f32, feedback: f32, mix: f32) {
        let mut block = [0.0f32; BLOCK];
        for _ in 0..blocks {
            block.fill(0.0);
            fx.process_block(&mut block, delay, feedback, mix);
        }
    }

    /// With constant controls, the smoothed delay length and mix converge
    /// geometrically onto their targets. The integer delay stalls within
    /// `1 / ALPHA` samples below the target, where the per-block increment
    /// truncates to zero.
    #[test]
    fn test_smoothing_convergence() {
        let mut fx = DelayEffect::new(1024);

        run_silence(&mut fx, 50, 1.0, 0.0, 0.8);
        let halfway = fx.delay_samples();
        run_silence(&mut fx, 350, 1.0, 0.0, 0.8);
        let settled = fx.delay_samples();

        // delay_ctrl = 1.0 maps to the full ring: target = 1023 samples.
        let target = 1023;
        assert!(halfway > 0 && halfway < settled, "smoothing should be gradual");
        assert!(settled <= target);
        assert!(
            target - settled <= 26,
            "delay should settle within the ~1/ALPHA truncation band of {target}, got {settled}"
        );
        assert!(
            (fx.mix() - 0.8).abs() < 1e-3,
            "mix should converge to 0.8, got {}",
            fx.mix()
        );

        // Once stalled, the integer delay is a fixed point: further blocks
        // with the same control must not move it.
        run_silence(&mut fx, 10, 1.0, 0.0, 0.8);
        assert_eq!(fx.delay_samples(), settled);
    }

    /// The smoothed delay tracks downward too.
    #[test]
    fn test_smoothing_tracks_downward() {
        let mut fx = DelayEffect::new(1024);
        run_silence(&mut fx, 400, 1.0, 0.0, 0.0);
        let long = fx.delay_samples();

        run_silence(&mut fx, 400, 0.0, 0.0, 0.0);
        let short = fx.delay_samples();

        // delay_ctrl = 0.0 maps to 5% of the ring: target = 51 samples.
        assert!(long > 900);
        assert!(short < long);
        assert!(
            short >= 51 && short - 51 < 25,
            "delay should settle just above 51, got {short}"
        );
    }

    /// Fully dry: the block passes through untouched no matter what the
    /// delay and feedback are doing.
    #[test]
    fn test_fully_dry_is_passthrough() {
        let mut fx = DelayEffect::new(256);
        let input: Vec<f32> = (0..BLOCK).map(|i| ((i * 7 % 13) as f32 - 6.0) / 6.0).collect();

        let mut block: Vec<f32> = input.clone();
        for _ in 0..20 {
            block.copy_from_slice(&input);
            fx.process_block(&mut block, 0.7, 0.9, 0.0);
        }

        for (got, want) in block.iter().zip(&input) {
            assert!(
                (got - want).abs() < 1e-6,
                "dry signal should pass through unchanged"
            );
        }
    }

    /// End-to-end: a unit impulse comes back as an echo train at the
    /// settled delay spacing, each repeat at `feedback * (S-1)/S` times the
    /// previous one (the cross-fade weights sum to `(S-1)/S`).
    #[test]
    fn test_impulse_echo_train() {
        let mut fx = DelayEffect::new(256);

        // Settle the delay length and a fully wet mix first.
        run_silence(&mut fx, 300, 1.0, 0.5, 1.0);
        let delay = fx.delay_samples();
        // Target is 255; the truncated EMA stalls within ~25 samples of it.
        assert!(delay >= 229 && delay <= 255, "unexpected settled delay {delay}");

        // One impulse, then silence, collecting the output stream.
        let mut out = Vec::new();
        let mut block = [0.0f32; BLOCK];
        block[0] = 1.0;
        fx.process_block(&mut block, 1.0, 0.5, 1.0);
        out.extend_from_slice(&block);
        for _ in 0..12 {
            block.fill(0.0);
            fx.process_block(&mut block, 1.0, 0.5, 1.0);
            out.extend_from_slice(&block);
        }

        let tap_gain = (BLOCK as f32 - 1.0) / BLOCK as f32; // 63/64

        // First echo: the impulse written at sample 0 re-emerges `delay`
        // samples later, scaled by the cross-fade factor (mix has converged
        // to ~1.0 so the wet path dominates).
        let first = out[delay];
        assert!(
            (first - tap_gain).abs() < 1e-2,
            "first echo should be ~{tap_gain}, got {first}"
        );

        // Second echo: one feedback pass later, one more tap factor.
        let second = out[2 * delay];
        let expected = 0.5 * tap_gain * tap_gain;
        assert!(
            (second - expected).abs() < 1e-2,
            "second echo should be ~{expected}, got {second}"
        );

        // Between echoes the line is silent.
        assert!(out[delay / 2].abs() < 1e-3);
        assert!(out[delay + delay / 2].abs() < 1e-3);

        // The train decays geometrically.
        assert!(second < first * 0.55);
    }

    /// With feedback below 1, the echo train decays below any threshold in
    /// bounded time: silence in, (eventually) silence out.
    #[test]
    fn test_echoes_decay_to_silence() {
        let mut fx = DelayEffect::new(256);
        run_silence(&mut fx, 300, 1.0, 0.5, 1.0);

        let mut block = [0.0f32; BLOCK];
        block[0] = 1.0;
        fx.process_block(&mut block, 1.0, 0.5, 1.0);

        // Each round trip multiplies by ~0.5; after ~100 blocks the tail is
        // far below audibility.
        let mut peak = 0.0f32;
        for i in 0..100 {
            block.fill(0.0);
            fx.process_block(&mut block, 1.0, 0.5, 1.0);
            if i >= 90 {
                peak = block.iter().fold(peak, |p, s| p.max(s.abs()));
            }
        }
        assert!(
            peak < 1e-4,
            "echo tail should have decayed to silence, peak {peak}"
        );
    }

    /// An abrupt delay-control jump must not produce a step in the output.
    /// The cross-fade walks the tap across the block and consecutive blocks
    /// pick up exactly where the previous one left off, so sample-to-sample
    /// differences stay at the order of the input's own slope — not the
    /// hundreds-of-samples tap jump an unsmoothed change would cause.
    #[test]
    fn test_no_discontinuity_on_delay_change() {
        const STEP: f32 = 0.001;
        let mut fx = DelayEffect::new(1024);

        // Feed a slow ramp (feedback off, fully wet) until the delay and
        // mix settle at a short delay.
        let mut g = 0usize;
        let mut block = [0.0f32; BLOCK];
        for _ in 0..400 {
            for s in block.iter_mut() {
                *s = g as f32 * STEP;
                g += 1;
            }
            fx.process_block(&mut block, 0.2, 0.0, 1.0);
        }
        let short_delay = fx.delay_samples();

        // Jump the control to a long delay and keep feeding the ramp,
        // recording the output through the transition.
        let mut out = Vec::new();
        for _ in 0..40 {
            for s in block.iter_mut() {
                *s = g as f32 * STEP;
                g += 1;
            }
            fx.process_block(&mut block, 0.9, 0.0, 1.0);
            out.extend_from_slice(&block);
        }
        let long_delay = fx.delay_samples();
        assert!(
            long_delay > short_delay + 100,
            "test must actually exercise a large tap move"
        );

        // An instantaneous tap jump of D samples on this ramp would step the
        // output by D * STEP (hundreds of times the ramp slope). Require
        // every consecutive difference to stay within a few slopes instead.
        let max_jump = out
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .fold(0.0f32, f32::max);
        assert!(
            max_jump < 10.0 * STEP,
            "output should stay continuous through the transition, max jump {max_jump}"
        );
    }

    /// Reset drops all echoes and smoothing state.
    #[test]
    fn test_reset_clears_state() {
        let mut fx = DelayEffect::new(256);
        run_silence(&mut fx, 100, 0.5, 0.9, 1.0);

        let mut block = [0.0f32; BLOCK];
        block[0] = 1.0;
        fx.process_block(&mut block, 0.5, 0.9, 1.0);

        fx.reset();
        assert_eq!(fx.delay_samples(), 0);
        assert!(fx.mix().abs() < 1e-6);

        // Nothing stale comes back out after the reset.
        for _ in 0..50 {
            block.fill(0.0);
            fx.process_block(&mut block, 0.5, 0.0, 1.0);
            let peak = block.iter().fold(0.0f32, |p, s| p.max(s.abs()));
            assert!(peak < 1e-6, "reset should silence the line, peak {peak}");
        }
    }
}

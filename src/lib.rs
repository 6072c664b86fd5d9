//! # Glasswing Delay — A VST3/CLAP Feedback Delay Plugin
//!
//! A mono feedback delay built with [nih-plug](https://github.com/robbert-vdh/nih-plug),
//! modeled on the classic hardware approach: one big ring buffer, a single
//! read tap whose position glides under block-rate smoothing, and a
//! per-sample cross-fade that keeps delay-time changes click-free.
//!
//! ## Signal Flow
//!
//! ```text
//! Input ──┬──────────────────────────────────── × (1 - mix) ───┐
//!         │                                                    │
//!         │    ┌────────────────────────────────────────┐      │
//!         │    │            FEEDBACK LOOP               │      │
//!         │    │                                        │      │
//!         └──►(+)──► [Ring Buffer / Delay Line]         │      │
//!              ▲      (cross-faded tap, old delay       │      │
//!              │       length → new delay length)       │      │
//!              │                    │                   │      │
//!              │                    ▼                   │      │
//!              │               delayed tap ── × feedback┘      │
//!              │                    │                          │
//!              └────────────────────│                          │
//!                                   └──── × mix ─────────────►(+)──► Output
//! ```
//!
//! All parameter smoothing lives in the DSP core (`dsp::delay`), not in the
//! parameter layer: the delay length and dry/wet mix follow an exponential
//! moving average updated once per block, and the tap itself cross-fades
//! from the old delay length to the new one across each block.

mod dsp;
mod params;

use std::num::NonZeroU32;
use std::sync::Arc;

use dsp::delay::DelayEffect;
use nih_plug::prelude::*;
use params::PluginParams;

/// Capacity of the delay ring in samples: 128 Ki samples, about three
/// seconds at 44.1 kHz. Must be a power of two — the ring buffer wraps its
/// indices with a bitmask — and is deliberately independent of the host's
/// sample rate, so the knob sweeps the same buffer everywhere and no
/// reallocation is ever needed on a configuration change.
const DELAY_BUFFER_SAMPLES: usize = 1024 * 128;

/// The main plugin struct.
///
/// Holds the audio-rate state that persists between calls to `process()`.
/// The parameters (`PluginParams`) are shared with the host via `Arc` and
/// may be read from any thread; the delay effect is owned exclusively by
/// the audio thread and only touched inside `process()`. That split is what
/// makes the design thread-safe without locks.
struct GlasswingDelay {
    /// Shared reference to the plugin parameters.
    params: Arc<PluginParams>,

    /// The delay line and its smoothing state. Allocated once here in
    /// `default()` — the capacity doesn't depend on the audio
    /// configuration, so nothing is ever allocated in `initialize()` or
    /// `process()`.
    effect: DelayEffect,
}

impl Default for GlasswingDelay {
    fn default() -> Self {
        Self {
            params: Arc::new(PluginParams::default()),
            effect: DelayEffect::new(DELAY_BUFFER_SAMPLES),
        }
    }
}

impl Plugin for GlasswingDelay {
    const NAME: &'static str = "Glasswing Delay";
    const VENDOR: &'static str = "Glasswing Audio";
    const URL: &'static str = "";
    const EMAIL: &'static str = "";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // One channel in, one out. The effect is a single mono delay line;
    // hosts put it on mono tracks or handle the up/down-mix themselves.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[AudioIOLayout {
        main_input_channels: NonZeroU32::new(1),
        main_output_channels: NonZeroU32::new(1),
        aux_input_ports: &[],
        aux_output_ports: &[],
        names: PortNames::const_default(),
    }];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;

    // The effect reads each control exactly once per block and runs its own
    // block-rate smoothing from there, so splitting blocks at automation
    // points would change nothing.
    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    /// Called when the plugin is loaded or the audio configuration changes.
    ///
    /// The delay buffer is a fixed size in samples regardless of sample
    /// rate or block size, so there is nothing to (re)allocate here.
    fn initialize(
        &mut self,
        _audio_io_layout: &AudioIOLayout,
        _buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        true
    }

    /// Called when playback stops or the plugin is bypassed. Clears the
    /// delay line and its smoothing state so stale echoes don't bleed into
    /// the next playback.
    fn reset(&mut self) {
        self.effect.reset();
    }

    /// The per-block audio callback.
    ///
    /// Reads the three normalized controls once, then hands the mono
    /// channel to the DSP core, which transforms it in place:
    ///
    /// 1. Glide the smoothed delay length and dry/wet mix toward the
    ///    controls (once per block).
    /// 2. For each sample: read a tap cross-faded between the old and new
    ///    delay lengths, write `feedback * tap + input` back into the ring,
    ///    and output the dry/wet blend.
    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        let delay_ctrl = self.params.delay_time.value();
        let feedback = self.params.feedback.value();
        let mix_ctrl = self.params.mix.value();

        if let Some(channel) = buffer.as_slice().first_mut() {
            self.effect
                .process_block(channel, delay_ctrl, feedback, mix_ctrl);
        }

        // Report how long the effect keeps ringing after the input goes
        // silent, so the host keeps calling process() instead of cutting
        // the echoes off. Each round trip through the loop attenuates the
        // signal by the feedback factor, so it takes
        // N = log(0.001) / log(feedback) repeats to fall below -60 dB.
        let delay_samples = self.effect.delay_samples() as f32;
        if feedback >= 1.0 {
            // Repeats never decay: the tail is unbounded.
            ProcessStatus::KeepAlive
        } else if feedback > 0.001 {
            let repeats = -3.0 / feedback.log10(); // log10(0.001) = -3
            ProcessStatus::Tail((repeats * delay_samples) as u32)
        } else {
            // No feedback: a single echo, one delay period long.
            ProcessStatus::Tail(delay_samples as u32)
        }
    }
}

impl ClapPlugin for GlasswingDelay {
    const CLAP_ID: &'static str = "com.glasswing-audio.glasswing-delay";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("A mono feedback delay with click-free delay-time glides");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Mono,
        ClapFeature::Delay,
    ];
}

impl Vst3Plugin for GlasswingDelay {
    // A 16-byte class ID, globally unique across VST3 plugins.
    const VST3_CLASS_ID: [u8; 16] = *b"GlswngDelay_v001";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Delay];
}

// Export the C entry points the host uses to discover and load the plugin:
// `clap_entry` for CLAP hosts, `GetPluginFactory` for VST3 hosts.
nih_export_clap!(GlasswingDelay);
nih_export_vst3!(GlasswingDelay);

//! # Plugin Parameters
//!
//! Parameters are the knobs the user sees in the DAW. Each one has a
//! **unique string ID** (`#[id = "..."]`) the host uses to save and recall
//! presets (never change these once published), a human-readable name, a
//! range, and a default.
//!
//! All three knobs here are plain normalized `[0, 1]` controls, because
//! that is the contract the DSP core expects: the effect maps the delay
//! knob onto its buffer internally and applies its own block-rate
//! exponential smoothing to the delay length and the mix. For that reason
//! none of these parameters carries a nih-plug smoother — adding one would
//! filter the controls twice and slow the effect's own glide.

use nih_plug::prelude::*;

/// All user-facing parameters for the Glasswing Delay plugin.
///
/// The `#[derive(Params)]` macro generates the code that registers these
/// with the host, serializes them for presets, and maps them to normalized
/// host values.
#[derive(Params)]
pub struct PluginParams {
    /// **Delay** — how far into the past the echo tap reads, as a fraction
    /// of the delay buffer.
    ///
    /// The effect maps this onto 5%–100% of the buffer, so even at zero
    /// the tap never collapses onto the write head. The buffer is about
    /// three seconds at 44.1 kHz, which puts the useful range between
    /// slapback (low values) and long, distinct echoes (high values).
    #[id = "delay"]
    pub delay_time: FloatParam,

    /// **Feedback** — how much of the delayed signal is fed back into the
    /// line, i.e. how many repeats you hear.
    ///
    /// - 0% = a single echo
    /// - 50% = each repeat at half the level of the last
    /// - 100% = repeats never decay; the line self-oscillates
    ///
    /// The top of the range is intentionally left at 100%: endless
    /// self-oscillation is a playable (if hazardous) setting on the
    /// hardware this effect models, not a fault to be capped away.
    #[id = "fdbk"]
    pub feedback: FloatParam,

    /// **Dry/Wet** — balance between the original and delayed signal.
    ///
    /// - 0% = fully dry (delay inaudible)
    /// - 100% = fully wet (delayed signal only)
    ///
    /// As a send effect, set this to 100% and balance at the mixer; as an
    /// insert, 30–50% is typical.
    #[id = "mix"]
    pub mix: FloatParam,
}

impl Default for PluginParams {
    fn default() -> Self {
        Self {
            delay_time: FloatParam::new(
                "Delay",
                0.5,
                FloatRange::Linear { min: 0.0, max: 1.0 },
            )
            .with_unit("%")
            .with_value_to_string(formatters::v2s_f32_percentage(1))
            .with_string_to_value(formatters::s2v_f32_percentage()),

            feedback: FloatParam::new(
                "Feedback",
                0.40,
                FloatRange::Linear { min: 0.0, max: 1.0 },
            )
            .with_unit("%")
            .with_value_to_string(formatters::v2s_f32_percentage(1))
            .with_string_to_value(formatters::s2v_f32_percentage()),

            mix: FloatParam::new(
                "Dry/Wet",
                0.5,
                FloatRange::Linear { min: 0.0, max: 1.0 },
            )
            .with_unit("%")
            .with_value_to_string(formatters::v2s_f32_percentage(1))
            .with_string_to_value(formatters::s2v_f32_percentage()),
        }
    }
}

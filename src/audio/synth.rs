//! Synth - procedural fallback buffers
//!
//! When a sound asset cannot be fetched or decoded, a deterministic
//! substitute is generated here instead so a play request is never silently
//! dropped. Key features:
//! - Sample-rate aware: lengths are exact frame counts for the output rate
//! - Pure functions (no side effects, identical output across calls)
//! - Noise beds use a fixed seed so the "random" bed is reproducible
//!
//! | kind     | duration | waveform                                          |
//! |----------|----------|---------------------------------------------------|
//! | hover    | 0.05 s   | 800 Hz sine, exp decay rate 20                    |
//! | click    | 0.05 s   | 200 Hz sine, exp decay rate 30                    |
//! | success  | 0.4 s    | 440/554/659 Hz arpeggio, exp decay rate 5, amp 0.5 |
//! | ambient  | 2.0 s    | uniform noise in [-1, 1] scaled by 0.1            |

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

use crate::assets::{CueKind, SoundKind};

use super::buffer::{BufferOrigin, SoundBuffer};

/// Duration of the hover and click blips in seconds
pub const BLIP_DURATION_SECS: f32 = 0.05;

/// Duration of the success arpeggio in seconds
pub const SUCCESS_DURATION_SECS: f32 = 0.4;

/// Duration of the looping ambient noise bed in seconds
pub const AMBIENT_BED_DURATION_SECS: f32 = 2.0;

const AMBIENT_BED_AMPLITUDE: f32 = 0.1;
const SUCCESS_AMPLITUDE: f32 = 0.5;
const NOISE_SEED: u64 = 42;

/// Arpeggio steps: (frequency Hz, step end in seconds)
const SUCCESS_NOTES: [(f32, f32); 3] = [(440.0, 0.1), (554.0, 0.2), (659.0, 0.4)];

/// Number of frames for a duration at a sample rate, truncated.
#[inline]
pub fn frames_for(duration_secs: f32, sample_rate: u32) -> usize {
    (sample_rate as f32 * duration_secs) as usize
}

/// Generates the fallback buffer for a sound kind.
///
/// # Arguments
/// * `kind` - Which sound to stand in for
/// * `sample_rate` - Output sample rate in Hz (typically 48000)
///
/// # Returns
/// A synthesized buffer at `sample_rate`
pub fn synthesize(kind: SoundKind, sample_rate: u32) -> SoundBuffer {
    let samples = match kind {
        SoundKind::Cue(CueKind::Hover) => decaying_sine(800.0, 20.0, sample_rate),
        SoundKind::Cue(CueKind::Click) => decaying_sine(200.0, 30.0, sample_rate),
        SoundKind::Cue(CueKind::Success) => success_arpeggio(sample_rate),
        SoundKind::Ambient(_) => noise_bed(sample_rate),
    };
    SoundBuffer::new(samples, sample_rate, BufferOrigin::Synthesized)
}

/// Generates the fallback buffer for a raw name.
///
/// Returns `None` for names outside the category/cue enumeration: there is
/// nothing sensible to synthesize, so the play request is skipped.
pub fn synthesize_named(name: &str, sample_rate: u32) -> Option<SoundBuffer> {
    SoundKind::from_name(name).map(|kind| synthesize(kind, sample_rate))
}

/// 50ms sine blip with exponential decay `e^(-rate * t)`.
fn decaying_sine(frequency: f32, decay_rate: f32, sample_rate: u32) -> Vec<f32> {
    let num_samples = frames_for(BLIP_DURATION_SECS, sample_rate);
    let sr = sample_rate as f32;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sr;
            (TAU * frequency * t).sin() * (-decay_rate * t).exp()
        })
        .collect()
}

/// Three stepped notes under one decay envelope.
fn success_arpeggio(sample_rate: u32) -> Vec<f32> {
    let num_samples = frames_for(SUCCESS_DURATION_SECS, sample_rate);
    let sr = sample_rate as f32;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sr;
            let frequency = SUCCESS_NOTES
                .iter()
                .find(|(_, step_end)| t < *step_end)
                .map(|(f, _)| *f)
                .unwrap_or(SUCCESS_NOTES[SUCCESS_NOTES.len() - 1].0);
            (TAU * frequency * t).sin() * (-5.0 * t).exp() * SUCCESS_AMPLITUDE
        })
        .collect()
}

/// Low-level uniform noise, loopable as a wind-like bed.
fn noise_bed(sample_rate: u32) -> Vec<f32> {
    let num_samples = frames_for(AMBIENT_BED_DURATION_SECS, sample_rate);

    // Use fixed seed for deterministic noise generation
    let mut rng = StdRng::seed_from_u64(NOISE_SEED);

    let mut samples = Vec::with_capacity(num_samples);
    for _ in 0..num_samples {
        samples.push(rng.gen_range(-1.0..=1.0) * AMBIENT_BED_AMPLITUDE);
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AmbientCategory;

    fn peak(samples: &[f32]) -> f32 {
        samples.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()))
    }

    #[test]
    fn test_buffer_lengths_match_table() {
        let sample_rates = [44_100, 48_000, 96_000];

        for &sr in &sample_rates {
            let hover = synthesize(SoundKind::Cue(CueKind::Hover), sr);
            let click = synthesize(SoundKind::Cue(CueKind::Click), sr);
            let success = synthesize(SoundKind::Cue(CueKind::Success), sr);
            let bed = synthesize(SoundKind::Ambient(AmbientCategory::Nature), sr);

            assert_eq!(hover.len(), frames_for(0.05, sr), "hover length at {} Hz", sr);
            assert_eq!(click.len(), frames_for(0.05, sr), "click length at {} Hz", sr);
            assert_eq!(success.len(), frames_for(0.4, sr), "success length at {} Hz", sr);
            assert_eq!(bed.len(), frames_for(2.0, sr), "bed length at {} Hz", sr);
            assert_eq!(bed.sample_rate(), sr);
            assert_eq!(bed.origin(), BufferOrigin::Synthesized);
        }
    }

    #[test]
    fn test_hover_is_800hz_decaying() {
        let sr = 48_000;
        let hover = synthesize(SoundKind::Cue(CueKind::Hover), sr);
        let samples = hover.samples();

        // 800 Hz at 48 kHz: one period is 60 samples, quarter period peak at 15
        let expected = (TAU * 800.0 * 15.0 / 48_000.0).sin() * (-20.0_f32 * 15.0 / 48_000.0).exp();
        assert!((samples[15] - expected).abs() < 1e-5);

        let first_half = peak(&samples[..samples.len() / 2]);
        let second_half = peak(&samples[samples.len() / 2..]);
        assert!(second_half < first_half, "Envelope should decay");
    }

    #[test]
    fn test_click_lower_than_hover() {
        let sr = 48_000;
        let click = synthesize(SoundKind::Cue(CueKind::Click), sr);
        let zero_crossings = click
            .samples()
            .windows(2)
            .filter(|w| w[0] <= 0.0 && w[1] > 0.0)
            .count();
        // 200 Hz over 50ms = 10 periods
        assert!((9..=10).contains(&zero_crossings), "got {}", zero_crossings);
    }

    #[test]
    fn test_success_amplitude_bounded() {
        let success = synthesize(SoundKind::Cue(CueKind::Success), 48_000);
        assert!(peak(success.samples()) <= SUCCESS_AMPLITUDE + 1e-6);
        assert!(peak(success.samples()) > 0.4, "Opening note should be near full amplitude");
    }

    #[test]
    fn test_noise_bed_range_and_determinism() {
        let a = synthesize(SoundKind::Ambient(AmbientCategory::City), 48_000);
        let b = synthesize(SoundKind::Ambient(AmbientCategory::Ancient), 48_000);

        for (i, &sample) in a.samples().iter().enumerate() {
            assert!(
                (-AMBIENT_BED_AMPLITUDE..=AMBIENT_BED_AMPLITUDE).contains(&sample),
                "Sample {} at index {} is out of range",
                sample,
                i
            );
        }
        assert_eq!(a.samples(), b.samples(), "Noise bed should be deterministic");
    }

    #[test]
    fn test_synthesize_named_unknown_yields_nothing() {
        assert!(synthesize_named("hover", 48_000).is_some());
        assert!(synthesize_named("default", 48_000).is_some());
        assert!(synthesize_named("thunder", 48_000).is_none());
    }
}

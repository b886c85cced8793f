//! Procedural ambience synthesis
//!
//! Generates loop-ready blocks for moods that have no recorded asset.
//! Each mood has a constant [`SynthesisProfile`]: a small chord, a loop length
//! and a wave shape. Voices are summed at equal amplitude and the block is
//! wrapped in a linear fade-in/fade-out envelope so the loop point is silent
//! on both sides and wraps without a click.

use crate::buffer::SampleBlock;
use crate::types::MoodType;
use std::f64::consts::PI;

/// Total amplitude shared by all voices of a profile
pub const TOTAL_AMPLITUDE: f64 = 0.15;

/// Length of the fade-in and of the fade-out, in seconds
pub const ENVELOPE_SECONDS: f64 = 0.5;

/// Periodic waveform used for every voice of a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveShape {
    Sine,
    Triangle,
    Square,
    Sawtooth,
}

impl WaveShape {
    /// Value of the unit-amplitude waveform for frequency `freq` at time `t`
    #[inline]
    pub fn sample(self, freq: f64, t: f64) -> f64 {
        let phase = 2.0 * PI * freq * t;
        match self {
            WaveShape::Sine => phase.sin(),
            WaveShape::Triangle => (2.0 / PI) * phase.sin().asin(),
            WaveShape::Square => {
                let s = phase.sin();
                if s > 0.0 {
                    1.0
                } else if s < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            }
            WaveShape::Sawtooth => {
                let cycles = freq * t;
                2.0 * (cycles - cycles.floor()) - 1.0
            }
        }
    }
}

/// Synthesis recipe for one mood
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthesisProfile {
    /// Voice frequencies in Hz
    pub frequencies: &'static [f64],

    /// Loop length in seconds
    pub duration_secs: f64,

    /// Waveform for every voice
    pub wave_shape: WaveShape,
}

const PROFILES: [SynthesisProfile; MoodType::COUNT] = [
    // Calm: C major triad
    SynthesisProfile {
        frequencies: &[261.63, 329.63, 392.00],
        duration_secs: 8.0,
        wave_shape: WaveShape::Sine,
    },
    // Adventure: D major with octave
    SynthesisProfile {
        frequencies: &[293.66, 369.99, 440.00, 587.33],
        duration_secs: 6.0,
        wave_shape: WaveShape::Triangle,
    },
    // Mystery: A minor
    SynthesisProfile {
        frequencies: &[220.00, 261.63, 329.63],
        duration_secs: 10.0,
        wave_shape: WaveShape::Sine,
    },
    // Happy: C major with octave
    SynthesisProfile {
        frequencies: &[261.63, 329.63, 392.00, 523.25],
        duration_secs: 6.0,
        wave_shape: WaveShape::Triangle,
    },
    // Suspense: semitone cluster over a fifth
    SynthesisProfile {
        frequencies: &[146.83, 155.56, 220.00],
        duration_secs: 8.0,
        wave_shape: WaveShape::Square,
    },
    // Dramatic: C minor, low register
    SynthesisProfile {
        frequencies: &[130.81, 196.00, 261.63, 311.13],
        duration_secs: 8.0,
        wave_shape: WaveShape::Sawtooth,
    },
];

/// Constant synthesis profile for a mood
pub fn profile_for(mood: MoodType) -> &'static SynthesisProfile {
    &PROFILES[mood.index()]
}

/// Number of samples a profile produces at `sample_rate`
pub fn block_len(profile: &SynthesisProfile, sample_rate: u32) -> usize {
    (profile.duration_secs * f64::from(sample_rate)).round() as usize
}

/// Synthesize a mono, loop-ready block
///
/// # Panics
/// If `sample_rate` is zero or the profile has no frequencies or a
/// non-positive duration. These are programmer errors.
pub fn synthesize(profile: &SynthesisProfile, sample_rate: u32) -> SampleBlock {
    assert!(sample_rate > 0, "sample rate must be positive");
    assert!(
        !profile.frequencies.is_empty(),
        "synthesis profile needs at least one frequency"
    );
    assert!(
        profile.duration_secs.is_finite() && profile.duration_secs > 0.0,
        "synthesis profile needs a positive duration"
    );

    let rate = f64::from(sample_rate);
    let len = block_len(profile, sample_rate);
    let amplitude = TOTAL_AMPLITUDE / profile.frequencies.len() as f64;
    let fade_len = (ENVELOPE_SECONDS * rate).max(1.0);

    let samples = (0..len)
        .map(|i| {
            let t = i as f64 / rate;
            let mix: f64 = profile
                .frequencies
                .iter()
                .map(|&freq| profile.wave_shape.sample(freq, t) * amplitude)
                .sum();
            (mix * envelope(i, len, fade_len)) as f32
        })
        .collect();

    SampleBlock::mono(samples, sample_rate)
}

/// Synthesize the constant profile for `mood`
pub fn synthesize_mood(mood: MoodType, sample_rate: u32) -> SampleBlock {
    synthesize(profile_for(mood), sample_rate)
}

/// Linear fade-in over the head and fade-out over the tail.
/// When the ramps overlap (blocks under a second) the smaller one wins.
#[inline]
fn envelope(index: usize, len: usize, fade_len: f64) -> f64 {
    let fade_in = index as f64 / fade_len;
    let fade_out = (len - 1 - index) as f64 / fade_len;
    fade_in.min(fade_out).min(1.0)
}

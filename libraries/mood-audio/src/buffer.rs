//! Decoded audio held in memory

use std::time::Duration;

/// Block of decoded or synthesized audio
///
/// Samples are f32 in [-1.0, 1.0], interleaved when stereo.
/// Blocks are immutable once built and shared between the track library and
/// live voices through `Arc`, so replacing a mood's buffer never disturbs a
/// voice that is already playing the old one.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBlock {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl SampleBlock {
    /// Create a block from interleaved samples
    ///
    /// # Panics
    /// If `channels` is not 1 or 2, `sample_rate` is zero, or the sample count
    /// is not a whole number of frames.
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        assert!(
            channels == 1 || channels == 2,
            "SampleBlock supports mono or stereo, got {channels} channels"
        );
        assert!(sample_rate > 0, "sample rate must be positive");
        assert_eq!(
            samples.len() % channels as usize,
            0,
            "sample count must be a whole number of frames"
        );

        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    /// Create a mono block
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(samples, 1, sample_rate)
    }

    /// Raw interleaved samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of channels (1 or 2)
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Whether the block holds no audio
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback length at the block's own sample rate
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate))
    }

    /// Stereo pair for a frame (mono is duplicated)
    #[inline]
    pub fn frame(&self, index: usize) -> (f32, f32) {
        if self.channels == 1 {
            let s = self.samples[index];
            (s, s)
        } else {
            (self.samples[index * 2], self.samples[index * 2 + 1])
        }
    }

    /// Largest absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
    }
}

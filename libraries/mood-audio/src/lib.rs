//! Mood Audio - mood-reactive storybook audio
//!
//! Background music that follows the emotional tone of a story, plus one-shot
//! sound effects.
//!
//! This crate provides:
//! - Six moods, each with a looping music track
//! - Track loading from URLs with automatic fallback to synthesized ambience
//! - Exponential crossfades between moods, scheduled on the audio clock
//! - Named one-shot sound effects on their own bus
//! - Independent music and effects volume (0-100%)
//! - Pause/resume of the whole output
//!
//! # Architecture
//!
//! `mood-audio` has no platform audio dependency. The engine renders into a
//! [`MixGraph`] that a [`DeviceSession`] pulls from; the CPAL session lives in
//! `mood-audio-desktop`, and [`OfflineBackend`] renders on demand for tests
//! and file export.
//!
//! ```text
//! MoodEngine ──► TrackLibrary ──┐
//!            ──► SoundEffectPool ┼──► MixGraph ◄── DeviceSession (pull)
//!            ──► crossfade ──────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use mood_audio::{EngineConfig, MoodEngine, MoodType, OfflineBackend};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> mood_audio::Result<()> {
//! let backend = OfflineBackend::new(22_050, 2);
//! let output = backend.handle();
//!
//! let engine = MoodEngine::new(backend, EngineConfig::default())?;
//! engine.init()?;
//!
//! // No URL: the mood's synthesized ambience is used
//! engine.load_track(MoodType::Calm, None).await;
//! engine.crossfade_to(MoodType::Calm, Duration::from_secs(2));
//!
//! let samples = output.render_for(Duration::from_millis(2100));
//! assert_eq!(samples.len(), 2 * 46_305);
//! assert_eq!(engine.current_mood(), Some(MoodType::Calm));
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod config;
pub mod crossfade;
pub mod decoder;
pub mod device;
pub mod effects;
pub mod engine;
pub mod error;
pub mod events;
pub mod fetch;
pub mod graph;
pub mod library;
pub mod synth;
pub mod types;
pub mod volume;

pub use buffer::SampleBlock;
pub use config::EngineConfig;
pub use device::{
    AudioBackend, DeviceSession, OfflineBackend, OfflineHandle, OfflineSession, SessionState,
};
pub use engine::MoodEngine;
pub use error::{EngineError, Result};
pub use events::EngineEvent;
pub use fetch::{AssetFetcher, HttpAssetFetcher};
pub use graph::{GainParam, MixGraph, Route, SharedGraph, VoiceId, RAMP_FLOOR};
pub use synth::{synthesize, synthesize_mood, SynthesisProfile, WaveShape};
pub use types::{Bus, MoodType, TrackOrigin, TrackStatus};
pub use volume::Volume;

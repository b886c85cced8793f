//! Desktop audio output for Mood Audio using CPAL
//!
//! This crate provides [`CpalBackend`], the [`mood_audio::AudioBackend`] that
//! plays the engine's mix graph on the default output device.
//!
//! # Example
//!
//! ```no_run
//! use mood_audio::{EngineConfig, MoodEngine, MoodType};
//! use mood_audio_desktop::CpalBackend;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = MoodEngine::new(CpalBackend::new(), EngineConfig::default())?;
//! engine.init()?;
//!
//! engine.load_track(MoodType::Adventure, None).await;
//! engine.crossfade_to(MoodType::Adventure, Duration::from_secs(2));
//! # Ok(())
//! # }
//! ```

mod error;
mod output;

pub use error::{CpalError, Result};
pub use output::{CpalBackend, CpalSession};

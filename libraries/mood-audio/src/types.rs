//! Core types shared across the engine

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Emotional category driving background-music selection
///
/// The set is closed: every per-mood table in the engine is indexed by
/// [`MoodType::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodType {
    Calm,
    Adventure,
    Mystery,
    Happy,
    Suspense,
    Dramatic,
}

impl MoodType {
    /// Number of moods
    pub const COUNT: usize = 6;

    /// Every mood, in index order
    pub const ALL: [MoodType; Self::COUNT] = [
        MoodType::Calm,
        MoodType::Adventure,
        MoodType::Mystery,
        MoodType::Happy,
        MoodType::Suspense,
        MoodType::Dramatic,
    ];

    /// Stable index into per-mood tables (0..6)
    #[inline]
    pub fn index(self) -> usize {
        match self {
            MoodType::Calm => 0,
            MoodType::Adventure => 1,
            MoodType::Mystery => 2,
            MoodType::Happy => 3,
            MoodType::Suspense => 4,
            MoodType::Dramatic => 5,
        }
    }

    /// Lowercase name, matching the serde representation
    pub fn as_str(self) -> &'static str {
        match self {
            MoodType::Calm => "calm",
            MoodType::Adventure => "adventure",
            MoodType::Mystery => "mystery",
            MoodType::Happy => "happy",
            MoodType::Suspense => "suspense",
            MoodType::Dramatic => "dramatic",
        }
    }
}

impl fmt::Display for MoodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoodType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        MoodType::ALL
            .into_iter()
            .find(|mood| mood.as_str() == name)
            .ok_or_else(|| EngineError::UnknownMood(s.to_string()))
    }
}

/// Where a loaded track's audio came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackOrigin {
    /// Fetched and decoded from a URL
    Network,

    /// Generated by the waveform synthesizer
    Synthesized,
}

/// Mixing bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bus {
    /// Background music (all per-mood gains feed this)
    Music,

    /// One-shot sound effects
    Effects,
}

/// Snapshot of one mood's track, for UI and diagnostics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackStatus {
    /// Whether a buffer is stored for this mood
    pub loaded: bool,

    /// Source of the stored buffer, if any
    pub origin: Option<TrackOrigin>,

    /// Whether a voice is currently playing this track
    pub playing: bool,

    /// Per-mood gain at the current session time
    pub gain: f32,

    /// Value the per-mood gain's automation is heading to
    pub target_gain: f32,
}

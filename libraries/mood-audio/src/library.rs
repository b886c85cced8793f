//! Per-mood music tracks
//!
//! The library owns one [`MusicTrack`] per mood. A track holds the decoded (or
//! synthesized) buffer used for new voices and, while it plays, the handle of
//! its looping voice. A loaded mood stays loaded until the library is dropped.

use crate::buffer::SampleBlock;
use crate::decoder;
use crate::error::Result;
use crate::fetch::{extension_hint, AssetFetcher};
use crate::graph::{MixGraph, Route, VoiceId};
use crate::synth;
use crate::types::{MoodType, TrackOrigin};
use std::sync::Arc;
use tracing::{debug, warn};

/// Buffer slot of a track
#[derive(Debug, Clone, Default)]
enum TrackBuffer {
    /// Nothing loaded yet
    #[default]
    Unloaded,

    /// Ready to play
    Loaded {
        block: Arc<SampleBlock>,
        origin: TrackOrigin,
    },
}

/// Live voice owned by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackHandle {
    /// Looping voice in the mix graph
    pub voice: VoiceId,

    /// Session frame at which the voice is scheduled to stop
    pub stop_at: Option<u64>,
}

/// Background music for one mood
#[derive(Debug, Clone)]
pub struct MusicTrack {
    mood: MoodType,
    buffer: TrackBuffer,
    playback: Option<PlaybackHandle>,
}

impl MusicTrack {
    fn new(mood: MoodType) -> Self {
        Self {
            mood,
            buffer: TrackBuffer::Unloaded,
            playback: None,
        }
    }

    pub fn mood(&self) -> MoodType {
        self.mood
    }

    /// Stored block, if loaded
    pub fn block(&self) -> Option<&Arc<SampleBlock>> {
        match &self.buffer {
            TrackBuffer::Loaded { block, .. } => Some(block),
            TrackBuffer::Unloaded => None,
        }
    }

    /// Where the stored block came from, if loaded
    pub fn origin(&self) -> Option<TrackOrigin> {
        match &self.buffer {
            TrackBuffer::Loaded { origin, .. } => Some(*origin),
            TrackBuffer::Unloaded => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.buffer, TrackBuffer::Loaded { .. })
    }

    /// A voice is playing this track
    pub fn is_playing(&self) -> bool {
        self.playback.is_some()
    }

    pub fn playback(&self) -> Option<PlaybackHandle> {
        self.playback
    }
}

/// The six mood tracks
#[derive(Debug, Clone)]
pub struct TrackLibrary {
    tracks: [MusicTrack; MoodType::COUNT],
}

impl TrackLibrary {
    pub fn new() -> Self {
        Self {
            tracks: MoodType::ALL.map(MusicTrack::new),
        }
    }

    pub fn track(&self, mood: MoodType) -> &MusicTrack {
        &self.tracks[mood.index()]
    }

    /// Replace the buffer used for future starts of `mood`
    ///
    /// A voice already playing keeps its own reference to the previous block.
    pub fn store(&mut self, mood: MoodType, block: Arc<SampleBlock>, origin: TrackOrigin) {
        self.tracks[mood.index()].buffer = TrackBuffer::Loaded { block, origin };
    }

    /// Start a looping voice for `mood` routed through its gain
    ///
    /// Returns `None` if the mood has no buffer. The caller must make sure the
    /// track is not already playing.
    pub fn start(&mut self, mood: MoodType, graph: &mut MixGraph) -> Option<VoiceId> {
        let track = &mut self.tracks[mood.index()];
        debug_assert!(track.playback.is_none(), "{mood} already has a voice");
        let block = Arc::clone(track.block()?);
        let voice = graph.start_voice(Route::Music(mood), block, true);
        track.playback = Some(PlaybackHandle {
            voice,
            stop_at: None,
        });
        Some(voice)
    }

    /// Schedule the playing voice of `mood` to stop at `frame`
    pub fn schedule_stop(&mut self, mood: MoodType, frame: u64, graph: &mut MixGraph) {
        if let Some(handle) = self.tracks[mood.index()].playback.as_mut() {
            if graph.schedule_stop(handle.voice, frame) {
                handle.stop_at = Some(frame);
            }
        }
    }

    /// Keep the playing voice of `mood` alive past a pending stop
    ///
    /// Returns false if the voice is already gone.
    pub fn cancel_stop(&mut self, mood: MoodType, graph: &mut MixGraph) -> bool {
        let track = &mut self.tracks[mood.index()];
        let Some(handle) = track.playback.as_mut() else {
            return false;
        };
        if handle.stop_at.is_none() {
            return true;
        }
        if graph.cancel_stop(handle.voice) {
            handle.stop_at = None;
            true
        } else {
            track.playback = None;
            false
        }
    }

    /// Clear handles whose voices have ended
    ///
    /// Returns the moods that stopped playing.
    pub fn reap(&mut self, ended: &[VoiceId]) -> Vec<MoodType> {
        let mut stopped = Vec::new();
        for track in &mut self.tracks {
            if let Some(handle) = track.playback {
                if ended.contains(&handle.voice) {
                    track.playback = None;
                    stopped.push(track.mood);
                }
            }
        }
        stopped
    }

    /// Stop every music voice and clear every handle
    pub fn stop_all(&mut self, graph: &mut MixGraph) {
        for track in &mut self.tracks {
            if let Some(handle) = track.playback.take() {
                graph.stop_voice(handle.voice);
            }
        }
    }

    /// Moods with a live voice, in index order
    pub fn playing_moods(&self) -> Vec<MoodType> {
        self.tracks
            .iter()
            .filter(|track| track.is_playing())
            .map(MusicTrack::mood)
            .collect()
    }
}

impl Default for TrackLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch and decode an asset at `sample_rate`
pub async fn load_asset(
    fetcher: &dyn AssetFetcher,
    url: &str,
    sample_rate: u32,
) -> Result<SampleBlock> {
    let bytes = fetcher.fetch(url).await?;
    decoder::decode(bytes, extension_hint(url), sample_rate)
}

/// Produce the buffer for `mood`: the asset behind `url` when it loads,
/// otherwise the mood's synthesized ambience
pub async fn resolve_track(
    fetcher: &dyn AssetFetcher,
    mood: MoodType,
    url: Option<&str>,
    sample_rate: u32,
) -> (Arc<SampleBlock>, TrackOrigin) {
    if let Some(url) = url {
        match load_asset(fetcher, url, sample_rate).await {
            Ok(block) => {
                debug!(mood = %mood, url = %url, frames = block.frames(), "Track decoded");
                return (Arc::new(block), TrackOrigin::Network);
            }
            Err(e) => {
                warn!(mood = %mood, url = %url, error = %e, "Track load failed, using synthesized ambience");
            }
        }
    }

    (
        Arc::new(synth::synthesize_mood(mood, sample_rate)),
        TrackOrigin::Synthesized,
    )
}

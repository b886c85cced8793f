//! Crossfade scheduling between mood tracks
//!
//! A crossfade is pure automation: both ramps are written into the mix graph
//! at the same session frame and the call returns. The renderer plays them
//! out, and the outgoing voice stops itself on a frame scheduled just past the
//! end of its fade.
//!
//! Curves are exponential between [`RAMP_FLOOR`](crate::graph::RAMP_FLOOR)
//! and unity on both sides.

use crate::graph::{MixGraph, RAMP_FLOOR};
use crate::library::TrackLibrary;
use crate::types::MoodType;
use std::time::Duration;
use tracing::debug;

/// Timing of a crossfade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossfadeTiming {
    /// Length of both ramps
    pub duration: Duration,

    /// Extra time the outgoing voice keeps playing after its ramp ends
    pub stop_margin: Duration,
}

impl CrossfadeTiming {
    pub fn new(duration: Duration, stop_margin: Duration) -> Self {
        Self {
            duration,
            stop_margin,
        }
    }
}

/// What [`schedule`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossfadeOutcome {
    /// Ramps were scheduled; `from` is the mood being faded out, if any
    Started { from: Option<MoodType> },

    /// Target is already the current, playing mood
    AlreadyCurrent,

    /// Target has no buffer yet
    NotLoaded,
}

/// Schedule a crossfade from `current` to `target`
///
/// The library must already be reaped against the graph's ended voices so
/// stale handles don't look like playing tracks.
pub fn schedule(
    graph: &mut MixGraph,
    library: &mut TrackLibrary,
    current: Option<MoodType>,
    target: MoodType,
    timing: CrossfadeTiming,
) -> CrossfadeOutcome {
    if !library.track(target).is_loaded() {
        return CrossfadeOutcome::NotLoaded;
    }
    if current == Some(target) && library.track(target).is_playing() {
        return CrossfadeOutcome::AlreadyCurrent;
    }

    let now = graph.current_frame();
    let fade_end = now.saturating_add(graph.frames_for(timing.duration));
    let stop_frame = fade_end.saturating_add(graph.frames_for(timing.stop_margin));

    // Fade out first, both ramps anchored at `now`
    let from = current.filter(|mood| *mood != target && library.track(*mood).is_playing());
    if let Some(outgoing) = from {
        let gain = graph.mood_gain(outgoing).value_at(now);
        graph
            .mood_gain_mut(outgoing)
            .exponential_ramp(gain, RAMP_FLOOR, now, fade_end);
        library.schedule_stop(outgoing, stop_frame, graph);
        debug!(mood = %outgoing, stop_frame, "Fading out");
    }

    // A voice still fading out from an earlier crossfade is re-targeted
    let retained = library.track(target).is_playing() && library.cancel_stop(target, graph);
    if !retained {
        library.start(target, graph);
    }

    graph
        .mood_gain_mut(target)
        .exponential_ramp(RAMP_FLOOR, 1.0, now, fade_end);
    debug!(mood = %target, retained, fade_end, "Fading in");

    CrossfadeOutcome::Started { from }
}

//! Mix graph rendered on the session clock
//!
//! ```text
//!  voice(calm) ──► gain[calm] ──┐
//!  voice(...)  ──► gain[...]  ──┼──► music bus ──┐
//!                               │                ├──► output
//!  effect voices ─────────────────► effects bus ─┘
//! ```
//!
//! The graph is pulled by the device: every `render` call advances the session
//! clock by the number of frames written. Gain automation and scheduled stops
//! are expressed in session frames, so they run at device pace without any
//! caller waiting on them, and they freeze while the device is suspended.

use crate::buffer::SampleBlock;
use crate::types::MoodType;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Lowest gain an exponential ramp can reach (true zero has no logarithm)
pub const RAMP_FLOOR: f32 = 0.01;

/// Graph shared between the engine and the device render callback
pub type SharedGraph = Arc<Mutex<MixGraph>>;

/// Identifier of a playing voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(u64);

/// Where a voice is mixed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Through the mood's gain into the music bus
    Music(MoodType),

    /// Straight into the effects bus
    Effects,
}

/// Exponential ramp between two gains over a frame range
#[derive(Debug, Clone, Copy, PartialEq)]
struct Ramp {
    from: f32,
    to: f32,
    start: u64,
    end: u64,
}

impl Ramp {
    #[inline]
    fn value_at(&self, frame: u64) -> f32 {
        if frame <= self.start {
            return self.from;
        }
        if frame >= self.end {
            return self.to;
        }
        let progress = (frame - self.start) as f64 / (self.end - self.start) as f64;
        let ratio = f64::from(self.to) / f64::from(self.from);
        (f64::from(self.from) * ratio.powf(progress)) as f32
    }
}

/// Automatable gain parameter
#[derive(Debug, Clone, PartialEq)]
pub struct GainParam {
    value: f32,
    ramp: Option<Ramp>,
}

impl GainParam {
    /// Create a parameter holding `value`
    pub fn new(value: f32) -> Self {
        Self { value, ramp: None }
    }

    /// Gain at a session frame
    #[inline]
    pub fn value_at(&self, frame: u64) -> f32 {
        match &self.ramp {
            Some(ramp) => ramp.value_at(frame),
            None => self.value,
        }
    }

    /// Value the parameter settles on once automation completes
    pub fn target(&self) -> f32 {
        self.ramp.map_or(self.value, |ramp| ramp.to)
    }

    /// Whether automation is still scheduled
    pub fn is_ramping(&self) -> bool {
        self.ramp.is_some()
    }

    /// Set the value immediately, dropping any automation
    pub fn set_value(&mut self, value: f32) {
        self.value = value;
        self.ramp = None;
    }

    /// Schedule an exponential ramp from `from` at `start` to `to` at `end`
    ///
    /// Replaces whatever was scheduled. Both endpoints are clamped to
    /// [`RAMP_FLOOR`] because an exponential curve cannot pass through zero.
    /// A zero-length ramp jumps straight to `to`.
    pub fn exponential_ramp(&mut self, from: f32, to: f32, start: u64, end: u64) {
        let from = from.max(RAMP_FLOOR);
        let to = to.max(RAMP_FLOOR);
        if end <= start {
            self.set_value(to);
            return;
        }
        self.value = from;
        self.ramp = Some(Ramp {
            from,
            to,
            start,
            end,
        });
    }

    /// Collapse finished automation into a plain value
    fn settle(&mut self, frame: u64) {
        if let Some(ramp) = self.ramp {
            if frame >= ramp.end {
                self.value = ramp.to;
                self.ramp = None;
            }
        }
    }
}

/// Buffer playback instance
#[derive(Debug, Clone)]
struct Voice {
    id: VoiceId,
    route: Route,
    buffer: Arc<SampleBlock>,
    cursor: usize,
    looping: bool,
    stop_at: Option<u64>,
    finished: bool,
}

/// Snapshot of a voice, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceInfo {
    pub id: VoiceId,
    pub route: Route,
    pub looping: bool,
    pub stop_at: Option<u64>,
}

/// Live mixing graph
#[derive(Debug)]
pub struct MixGraph {
    sample_rate: u32,
    frame: u64,
    music_bus: GainParam,
    effects_bus: GainParam,
    mood_gains: [GainParam; MoodType::COUNT],
    voices: Vec<Voice>,
    next_voice: u64,
    ended: Vec<VoiceId>,
    // Stereo scratch reused across render calls
    mix: Vec<f32>,
}

impl MixGraph {
    /// Create a graph: both buses at unity, every mood gain at zero
    ///
    /// # Panics
    /// If `sample_rate` is zero.
    pub fn new(sample_rate: u32) -> Self {
        assert!(sample_rate > 0, "sample rate must be positive");
        Self {
            sample_rate,
            frame: 0,
            music_bus: GainParam::new(1.0),
            effects_bus: GainParam::new(1.0),
            mood_gains: std::array::from_fn(|_| GainParam::new(0.0)),
            voices: Vec::new(),
            next_voice: 1,
            ended: Vec::new(),
            mix: Vec::new(),
        }
    }

    /// Wrap in the shared handle used by devices
    pub fn into_shared(self) -> SharedGraph {
        Arc::new(Mutex::new(self))
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames rendered so far
    pub fn current_frame(&self) -> u64 {
        self.frame
    }

    /// Session time in seconds
    pub fn current_time(&self) -> f64 {
        self.frame as f64 / f64::from(self.sample_rate)
    }

    /// Convert a duration to session frames
    pub fn frames_for(&self, duration: Duration) -> u64 {
        (duration.as_secs_f64() * f64::from(self.sample_rate)).round() as u64
    }

    /// Music bus gain parameter
    pub fn music_bus(&self) -> &GainParam {
        &self.music_bus
    }

    /// Effects bus gain parameter
    pub fn effects_bus(&self) -> &GainParam {
        &self.effects_bus
    }

    /// Set the music bus gain immediately
    pub fn set_music_bus_gain(&mut self, gain: f32) {
        self.music_bus.set_value(gain);
    }

    /// Set the effects bus gain immediately
    pub fn set_effects_bus_gain(&mut self, gain: f32) {
        self.effects_bus.set_value(gain);
    }

    /// Per-mood gain parameter
    pub fn mood_gain(&self, mood: MoodType) -> &GainParam {
        &self.mood_gains[mood.index()]
    }

    /// Per-mood gain parameter, mutable
    pub fn mood_gain_mut(&mut self, mood: MoodType) -> &mut GainParam {
        &mut self.mood_gains[mood.index()]
    }

    /// Start a voice at the current session frame
    pub fn start_voice(&mut self, route: Route, buffer: Arc<SampleBlock>, looping: bool) -> VoiceId {
        let id = VoiceId(self.next_voice);
        self.next_voice += 1;
        self.voices.push(Voice {
            id,
            route,
            buffer,
            cursor: 0,
            looping,
            stop_at: None,
            finished: false,
        });
        id
    }

    /// Stop a voice right away. Returns false if it was not playing.
    ///
    /// Voices stopped this way are not reported by [`MixGraph::take_ended`];
    /// the caller already knows.
    pub fn stop_voice(&mut self, id: VoiceId) -> bool {
        let before = self.voices.len();
        self.voices.retain(|voice| voice.id != id);
        self.voices.len() != before
    }

    /// Drop every voice
    pub fn stop_all(&mut self) {
        self.voices.clear();
        self.ended.clear();
    }

    /// Schedule a voice to stop at a session frame
    pub fn schedule_stop(&mut self, id: VoiceId, at_frame: u64) -> bool {
        match self.voices.iter_mut().find(|voice| voice.id == id) {
            Some(voice) => {
                voice.stop_at = Some(at_frame);
                true
            }
            None => false,
        }
    }

    /// Cancel a pending stop. Returns false if the voice is gone.
    pub fn cancel_stop(&mut self, id: VoiceId) -> bool {
        match self.voices.iter_mut().find(|voice| voice.id == id) {
            Some(voice) => {
                voice.stop_at = None;
                true
            }
            None => false,
        }
    }

    /// Whether a voice is still playing
    pub fn is_active(&self, id: VoiceId) -> bool {
        self.voices.iter().any(|voice| voice.id == id)
    }

    /// Number of playing voices
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Snapshot of the playing voices
    pub fn voices(&self) -> Vec<VoiceInfo> {
        self.voices
            .iter()
            .map(|voice| VoiceInfo {
                id: voice.id,
                route: voice.route,
                looping: voice.looping,
                stop_at: voice.stop_at,
            })
            .collect()
    }

    /// Drain the ids of voices that ended on their own (buffer end or
    /// scheduled stop) since the last call
    pub fn take_ended(&mut self) -> Vec<VoiceId> {
        std::mem::take(&mut self.ended)
    }

    /// Render interleaved output and advance the session clock
    ///
    /// `output.len()` must be a multiple of `channels`. Mono devices receive
    /// the L/R average; channels past the second are left silent.
    pub fn render(&mut self, output: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let frames = output.len() / channels;
        if frames == 0 {
            return;
        }

        self.mix.clear();
        self.mix.resize(frames * 2, 0.0);

        let start = self.frame;
        for voice in &mut self.voices {
            let len = voice.buffer.frames();
            if len == 0 {
                voice.finished = true;
                continue;
            }

            for f in 0..frames {
                let now = start + f as u64;
                if voice.stop_at.is_some_and(|at| now >= at) {
                    voice.finished = true;
                    break;
                }
                if voice.cursor >= len {
                    if voice.looping {
                        voice.cursor = 0;
                    } else {
                        voice.finished = true;
                        break;
                    }
                }

                let gain = match voice.route {
                    Route::Music(mood) => {
                        self.mood_gains[mood.index()].value_at(now) * self.music_bus.value_at(now)
                    }
                    Route::Effects => self.effects_bus.value_at(now),
                };
                let (left, right) = voice.buffer.frame(voice.cursor);
                self.mix[f * 2] += left * gain;
                self.mix[f * 2 + 1] += right * gain;
                voice.cursor += 1;
            }

            // A one-shot that ran out exactly at the block edge is done too
            if !voice.looping && voice.cursor >= len {
                voice.finished = true;
            }
        }

        let ended = &mut self.ended;
        self.voices.retain(|voice| {
            if voice.finished {
                ended.push(voice.id);
            }
            !voice.finished
        });

        for (f, out_frame) in output.chunks_exact_mut(channels).enumerate() {
            let left = self.mix[f * 2].clamp(-1.0, 1.0);
            let right = self.mix[f * 2 + 1].clamp(-1.0, 1.0);
            if channels == 1 {
                out_frame[0] = (left + right) * 0.5;
            } else {
                out_frame[0] = left;
                out_frame[1] = right;
                out_frame[2..].fill(0.0);
            }
        }

        self.frame += frames as u64;
        let now = self.frame;
        self.music_bus.settle(now);
        self.effects_bus.settle(now);
        for gain in &mut self.mood_gains {
            gain.settle(now);
        }
    }
}

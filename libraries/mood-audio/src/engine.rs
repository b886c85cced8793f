//! Mood engine - host-facing orchestration
//!
//! Coordinates the device session, mix graph, track library and effect pool.
//!
//! Lifecycle: `Uninitialized -> Active (playing | paused) -> TornDown`.
//! Only `init` reports errors; every other command degrades to a logged no-op
//! when it cannot apply (not initialized, torn down, unknown effect, mood not
//! loaded yet).
//!
//! Locking: engine state first, then the mix graph. No lock is held across an
//! `.await`, so commands keep working while a load is in flight.

use crate::config::EngineConfig;
use crate::crossfade::{self, CrossfadeOutcome, CrossfadeTiming};
use crate::device::{AudioBackend, DeviceSession, SessionState};
use crate::effects::SoundEffectPool;
use crate::error::{EngineError, Result};
use crate::events::{EngineEvent, EventBus};
use crate::fetch::{AssetFetcher, HttpAssetFetcher};
use crate::graph::{MixGraph, SharedGraph};
use crate::library::{self, TrackLibrary};
use crate::types::{Bus, MoodType, TrackOrigin, TrackStatus};
use crate::volume::Volume;
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Open device session plus the graph it renders
struct Session {
    device: Box<dyn DeviceSession>,
    graph: SharedGraph,
    sample_rate: u32,
    paused: bool,
}

enum Lifecycle {
    Uninitialized,
    Active(Session),
    TornDown,
}

struct EngineState {
    lifecycle: Lifecycle,
    library: TrackLibrary,
    effects: SoundEffectPool,
    current_mood: Option<MoodType>,
    music_volume: Volume,
    effects_volume: Volume,
}

/// Mood-reactive music and sound-effect engine
///
/// Constructed once by the host and shared (e.g. in an `Arc`); every method
/// takes `&self`. Nothing is audible until [`MoodEngine::init`] succeeds.
pub struct MoodEngine {
    backend: Box<dyn AudioBackend>,
    fetcher: Arc<dyn AssetFetcher>,
    config: EngineConfig,
    state: Mutex<EngineState>,
    events: EventBus,
}

impl MoodEngine {
    /// Create an engine fetching assets over HTTP
    pub fn new(backend: impl AudioBackend + 'static, config: EngineConfig) -> Result<Self> {
        let fetcher = HttpAssetFetcher::new(config.fetch_timeout())?;
        Ok(Self::with_fetcher(backend, Arc::new(fetcher), config))
    }

    /// Create an engine with a custom asset fetcher
    pub fn with_fetcher(
        backend: impl AudioBackend + 'static,
        fetcher: Arc<dyn AssetFetcher>,
        config: EngineConfig,
    ) -> Self {
        let state = EngineState {
            lifecycle: Lifecycle::Uninitialized,
            library: TrackLibrary::new(),
            effects: SoundEffectPool::new(),
            current_mood: None,
            music_volume: Volume::from_percent(i32::from(config.music_volume)),
            effects_volume: Volume::from_percent(i32::from(config.effects_volume)),
        };
        Self {
            backend: Box::new(backend),
            fetcher,
            config,
            state: Mutex::new(state),
            events: EventBus::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Subscribe to engine events
    pub fn subscribe(&self) -> Receiver<EngineEvent> {
        self.events.subscribe()
    }

    // ===== Lifecycle =====

    /// Open the device session and start the mix graph
    ///
    /// Call from a user-gesture handler on hosts with autoplay restrictions.
    /// Idempotent once initialized. On failure the engine stays
    /// uninitialized and `init` may be retried.
    pub fn init(&self) -> Result<()> {
        let mut state = self.state.lock();
        match state.lifecycle {
            Lifecycle::Active(_) => {
                debug!("Engine already initialized");
                return Ok(());
            }
            Lifecycle::TornDown => return Err(EngineError::TornDown),
            Lifecycle::Uninitialized => {}
        }

        let mut device = self.backend.open().map_err(|e| {
            warn!(error = %e, "Failed to open audio device");
            e
        })?;
        let sample_rate = device.sample_rate();
        let channels = device.channels();

        let mut graph = MixGraph::new(sample_rate);
        graph.set_music_bus_gain(state.music_volume.gain());
        graph.set_effects_bus_gain(state.effects_volume.gain());
        let graph = graph.into_shared();

        if let Err(e) = device.connect(Arc::clone(&graph)) {
            warn!(error = %e, "Failed to start audio stream");
            device.close();
            return Err(e);
        }

        state.lifecycle = Lifecycle::Active(Session {
            device,
            graph,
            sample_rate,
            paused: false,
        });

        info!(sample_rate, channels, "Mood audio engine initialized");
        self.events.emit(EngineEvent::Initialized {
            sample_rate,
            channels,
        });
        Ok(())
    }

    /// Suspend output (music and effects alike)
    pub fn pause(&self) {
        let mut state = self.state.lock();
        let Lifecycle::Active(session) = &mut state.lifecycle else {
            debug!("Pause ignored: engine not active");
            return;
        };
        if session.paused {
            return;
        }

        match session.device.suspend() {
            Ok(()) => {
                session.paused = true;
                info!("Audio paused");
                self.events.emit(EngineEvent::Paused);
            }
            Err(e) => warn!(error = %e, "Failed to suspend audio"),
        }
    }

    /// Resume output after [`MoodEngine::pause`]
    pub fn resume(&self) {
        let mut state = self.state.lock();
        let Lifecycle::Active(session) = &mut state.lifecycle else {
            debug!("Resume ignored: engine not active");
            return;
        };
        if !session.paused {
            return;
        }
        self.wake(session);
    }

    /// Stop everything, drop loaded buffers and release the device session
    ///
    /// Idempotent. The engine cannot be initialized again afterwards.
    pub fn cleanup(&self) {
        let mut state = self.state.lock();
        let state = &mut *state;
        match std::mem::replace(&mut state.lifecycle, Lifecycle::TornDown) {
            Lifecycle::Active(mut session) => {
                {
                    let mut graph = session.graph.lock();
                    state.library.stop_all(&mut graph);
                    graph.stop_all();
                }
                session.device.close();
                state.current_mood = None;
                state.library = TrackLibrary::new();
                state.effects = SoundEffectPool::new();

                info!("Mood audio engine torn down");
                self.events.emit(EngineEvent::TornDown);
            }
            Lifecycle::Uninitialized => {
                state.lifecycle = Lifecycle::Uninitialized;
                debug!("Cleanup ignored: engine never initialized");
            }
            Lifecycle::TornDown => {}
        }
    }

    // ===== Loading =====

    /// Make sure `mood` has a playable buffer
    ///
    /// Fetches and decodes `url` when given; any failure (or no URL) falls
    /// back to the mood's synthesized ambience. Returns the origin of the
    /// stored buffer, or `None` if the engine is not active.
    pub async fn load_track(&self, mood: MoodType, url: Option<&str>) -> Option<TrackOrigin> {
        let Some(sample_rate) = self.active_sample_rate() else {
            debug!(mood = %mood, "Track load ignored: engine not active");
            return None;
        };

        let (block, origin) =
            library::resolve_track(self.fetcher.as_ref(), mood, url, sample_rate).await;

        let mut state = self.state.lock();
        if !matches!(state.lifecycle, Lifecycle::Active(_)) {
            debug!(mood = %mood, "Engine torn down during load, dropping track");
            return None;
        }
        state.library.store(mood, block, origin);

        info!(mood = %mood, origin = ?origin, "Track loaded");
        self.events.emit(EngineEvent::TrackLoaded { mood, origin });
        Some(origin)
    }

    /// Fetch and decode a named sound effect
    ///
    /// On failure the name stays absent and playing it is a no-op. Returns
    /// whether the effect is now stored.
    pub async fn load_sound_effect(&self, name: &str, url: &str) -> bool {
        let Some(sample_rate) = self.active_sample_rate() else {
            debug!(name = %name, "Effect load ignored: engine not active");
            return false;
        };

        let block = match library::load_asset(self.fetcher.as_ref(), url, sample_rate).await {
            Ok(block) => block,
            Err(e) => {
                warn!(name = %name, url = %url, error = %e, "Failed to load sound effect");
                return false;
            }
        };

        let mut state = self.state.lock();
        if !matches!(state.lifecycle, Lifecycle::Active(_)) {
            debug!(name = %name, "Engine torn down during load, dropping effect");
            return false;
        }
        state.effects.insert(name, Arc::new(block));

        info!(name = %name, "Sound effect loaded");
        self.events.emit(EngineEvent::EffectLoaded {
            name: name.to_string(),
        });
        true
    }

    // ===== Playback =====

    /// Crossfade background music to `mood`
    ///
    /// Schedules the automation and returns right away. No-op when the mood
    /// is already current and playing, or when it has not been loaded.
    pub fn crossfade_to(&self, mood: MoodType, duration: Duration) {
        let mut state = self.state.lock();
        let state = &mut *state;
        let Lifecycle::Active(session) = &mut state.lifecycle else {
            warn!(mood = %mood, "Crossfade ignored: engine not active");
            return;
        };
        self.wake(session);

        let mut graph = session.graph.lock();
        self.reap(&mut state.library, &mut graph);

        let timing = CrossfadeTiming::new(duration, self.config.stop_margin());
        match crossfade::schedule(&mut graph, &mut state.library, state.current_mood, mood, timing) {
            CrossfadeOutcome::NotLoaded => {
                warn!(mood = %mood, "Crossfade ignored: track not loaded");
            }
            CrossfadeOutcome::AlreadyCurrent => {
                debug!(mood = %mood, "Already playing");
            }
            CrossfadeOutcome::Started { from } => {
                state.current_mood = Some(mood);
                let duration_ms = duration.as_millis() as u64;
                info!(from = ?from, to = %mood, duration_ms, "Crossfade started");
                self.events.emit(EngineEvent::CrossfadeStarted {
                    from,
                    to: mood,
                    duration_ms,
                });
            }
        }
    }

    /// Crossfade with the configured default duration
    pub fn crossfade_to_default(&self, mood: MoodType) {
        self.crossfade_to(mood, self.config.default_crossfade());
    }

    /// Play a loaded sound effect once
    pub fn play_sound_effect(&self, name: &str) {
        let mut state = self.state.lock();
        let state = &mut *state;
        let Lifecycle::Active(session) = &mut state.lifecycle else {
            debug!(name = %name, "Effect ignored: engine not active");
            return;
        };
        self.wake(session);

        let mut graph = session.graph.lock();
        self.reap(&mut state.library, &mut graph);

        match state.effects.trigger(name, &mut graph) {
            Some(_) => {
                debug!(name = %name, "Sound effect started");
                self.events.emit(EngineEvent::EffectPlayed {
                    name: name.to_string(),
                });
            }
            None => debug!(name = %name, "Sound effect not loaded"),
        }
    }

    // ===== Volume =====

    /// Set music volume (0-100, clamped), effective immediately
    pub fn set_music_volume(&self, percent: i32) {
        self.set_bus_volume(Bus::Music, percent);
    }

    /// Set sound-effects volume (0-100, clamped), effective immediately
    pub fn set_sound_effects_volume(&self, percent: i32) {
        self.set_bus_volume(Bus::Effects, percent);
    }

    fn set_bus_volume(&self, bus: Bus, percent: i32) {
        let mut state = self.state.lock();
        let state = &mut *state;
        let Lifecycle::Active(session) = &state.lifecycle else {
            debug!(bus = ?bus, percent, "Volume change ignored: engine not active");
            return;
        };

        let volume = Volume::from_percent(percent);
        let mut graph = session.graph.lock();
        match bus {
            Bus::Music => {
                state.music_volume = volume;
                graph.set_music_bus_gain(volume.gain());
            }
            Bus::Effects => {
                state.effects_volume = volume;
                graph.set_effects_bus_gain(volume.gain());
            }
        }

        debug!(bus = ?bus, level = volume.level(), "Volume changed");
        self.events.emit(EngineEvent::VolumeChanged {
            bus,
            level: volume.level(),
        });
    }

    // ===== Queries =====

    pub fn is_initialized(&self) -> bool {
        matches!(self.state.lock().lifecycle, Lifecycle::Active(_))
    }

    pub fn is_paused(&self) -> bool {
        match &self.state.lock().lifecycle {
            Lifecycle::Active(session) => session.paused,
            _ => false,
        }
    }

    /// Mood most recently crossfaded to
    pub fn current_mood(&self) -> Option<MoodType> {
        self.state.lock().current_mood
    }

    /// Device sample rate, once initialized
    pub fn sample_rate(&self) -> Option<u32> {
        self.active_sample_rate()
    }

    /// Seconds of audio rendered since `init`
    pub fn session_time(&self) -> Option<f64> {
        match &self.state.lock().lifecycle {
            Lifecycle::Active(session) => Some(session.graph.lock().current_time()),
            _ => None,
        }
    }

    /// Load, playback and gain state of one mood
    pub fn track_status(&self, mood: MoodType) -> TrackStatus {
        let mut state = self.state.lock();
        let state = &mut *state;

        let (gain, target_gain) = match &state.lifecycle {
            Lifecycle::Active(session) => {
                let mut graph = session.graph.lock();
                self.reap(&mut state.library, &mut graph);
                let param = graph.mood_gain(mood);
                (param.value_at(graph.current_frame()), param.target())
            }
            _ => (0.0, 0.0),
        };

        let track = state.library.track(mood);
        TrackStatus {
            loaded: track.is_loaded(),
            origin: track.origin(),
            playing: track.is_playing(),
            gain,
            target_gain,
        }
    }

    /// Moods with a live voice
    pub fn playing_moods(&self) -> Vec<MoodType> {
        let mut state = self.state.lock();
        let state = &mut *state;
        if let Lifecycle::Active(session) = &state.lifecycle {
            let mut graph = session.graph.lock();
            self.reap(&mut state.library, &mut graph);
        }
        state.library.playing_moods()
    }

    /// Current music bus gain (0.0-1.0)
    pub fn music_bus_gain(&self) -> f32 {
        let state = self.state.lock();
        match &state.lifecycle {
            Lifecycle::Active(session) => {
                let graph = session.graph.lock();
                graph.music_bus().value_at(graph.current_frame())
            }
            _ => state.music_volume.gain(),
        }
    }

    /// Current effects bus gain (0.0-1.0)
    pub fn effects_bus_gain(&self) -> f32 {
        let state = self.state.lock();
        match &state.lifecycle {
            Lifecycle::Active(session) => {
                let graph = session.graph.lock();
                graph.effects_bus().value_at(graph.current_frame())
            }
            _ => state.effects_volume.gain(),
        }
    }

    pub fn has_sound_effect(&self, name: &str) -> bool {
        self.state.lock().effects.contains(name)
    }

    /// Voices (music and effects) currently in the graph
    pub fn active_voice_count(&self) -> usize {
        match &self.state.lock().lifecycle {
            Lifecycle::Active(session) => session.graph.lock().voice_count(),
            _ => 0,
        }
    }

    // ===== Internals =====

    fn active_sample_rate(&self) -> Option<u32> {
        match &self.state.lock().lifecycle {
            Lifecycle::Active(session) => Some(session.sample_rate),
            _ => None,
        }
    }

    /// Resume a session suspended by `pause` or by the host
    fn wake(&self, session: &mut Session) {
        if !session.paused && session.device.state() != SessionState::Suspended {
            return;
        }

        match session.device.resume() {
            Ok(()) => {
                let was_paused = std::mem::replace(&mut session.paused, false);
                info!(was_paused, "Audio resumed");
                self.events.emit(EngineEvent::Resumed);
            }
            Err(e) => warn!(error = %e, "Failed to resume audio"),
        }
    }

    /// Clear handles of music voices that stopped since the last call
    fn reap(&self, library: &mut TrackLibrary, graph: &mut MixGraph) {
        let ended = graph.take_ended();
        if ended.is_empty() {
            return;
        }
        for mood in library.reap(&ended) {
            debug!(mood = %mood, "Track stopped");
            self.events.emit(EngineEvent::TrackStopped { mood });
        }
    }
}

impl Drop for MoodEngine {
    fn drop(&mut self) {
        self.cleanup();
    }
}

impl std::fmt::Debug for MoodEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoodEngine")
            .field("config", &self.config)
            .field("initialized", &self.is_initialized())
            .field("current_mood", &self.current_mood())
            .finish_non_exhaustive()
    }
}

//! End-to-end tests for MoodEngine on the offline device
//!
//! The offline device only advances the session clock when the test renders,
//! so every fade and scheduled stop below is driven deterministically.

mod common;

use common::{offline_engine, peak, tone_wav, MapFetcher};
use mood_audio::{Bus, EngineEvent, MoodType, SessionState, TrackOrigin};
use std::time::Duration;

const RATE: u32 = 8000;

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

// ============================================================================
// Crossfades
// ============================================================================

#[tokio::test]
async fn calm_reaches_full_gain_after_fade() {
    let (engine, output) = offline_engine(RATE, MapFetcher::new());
    engine.init().unwrap();

    let origin = engine.load_track(MoodType::Calm, None).await;
    assert_eq!(origin, Some(TrackOrigin::Synthesized));

    engine.crossfade_to(MoodType::Calm, secs(2.0));
    output.render_for(secs(2.1));

    let status = engine.track_status(MoodType::Calm);
    assert!(status.playing);
    assert!((status.gain - 1.0).abs() < 1e-3, "gain was {}", status.gain);
    assert_eq!(engine.playing_moods(), vec![MoodType::Calm]);

    let tail = output.render_for(secs(0.5));
    assert!(peak(&tail) > 0.05, "calm ambience should be audible");
}

#[tokio::test]
async fn repeated_crossfade_to_current_mood_is_noop() {
    let (engine, output) = offline_engine(RATE, MapFetcher::new());
    let events = engine.subscribe();
    engine.init().unwrap();
    engine.load_track(MoodType::Mystery, None).await;

    engine.crossfade_to(MoodType::Mystery, secs(2.0));
    output.render_for(secs(2.1));
    engine.crossfade_to(MoodType::Mystery, secs(2.0));

    let crossfades = events
        .try_iter()
        .filter(|e| matches!(e, EngineEvent::CrossfadeStarted { .. }))
        .count();
    assert_eq!(crossfades, 1);

    let status = engine.track_status(MoodType::Mystery);
    assert_eq!(status.gain, 1.0);
    assert_eq!(status.target_gain, 1.0);
    assert_eq!(engine.active_voice_count(), 1);
}

#[tokio::test]
async fn crossfade_switches_moods() {
    let (engine, output) = offline_engine(RATE, MapFetcher::new());
    let events = engine.subscribe();
    engine.init().unwrap();
    engine.load_track(MoodType::Calm, None).await;
    engine.load_track(MoodType::Adventure, None).await;

    engine.crossfade_to(MoodType::Calm, secs(1.0));
    output.render_for(secs(1.2));
    engine.crossfade_to(MoodType::Adventure, secs(1.0));

    // Current mood flips before any audio is rendered
    assert_eq!(engine.current_mood(), Some(MoodType::Adventure));
    let calm = engine.track_status(MoodType::Calm);
    let adventure = engine.track_status(MoodType::Adventure);
    assert!((calm.target_gain - 0.01).abs() < 1e-6);
    assert_eq!(adventure.target_gain, 1.0);
    assert!(calm.playing && adventure.playing);

    // Fade plus stop margin
    output.render_for(secs(1.2));
    assert_eq!(engine.playing_moods(), vec![MoodType::Adventure]);
    assert!(engine.track_status(MoodType::Calm).loaded);

    let stopped: Vec<_> = events
        .try_iter()
        .filter_map(|e| match e {
            EngineEvent::TrackStopped { mood } => Some(mood),
            _ => None,
        })
        .collect();
    assert_eq!(stopped, vec![MoodType::Calm]);
}

#[tokio::test]
async fn rapid_back_and_forth_keeps_first_mood() {
    let (engine, output) = offline_engine(RATE, MapFetcher::new());
    engine.init().unwrap();
    engine.load_track(MoodType::Calm, None).await;
    engine.load_track(MoodType::Suspense, None).await;

    engine.crossfade_to(MoodType::Calm, secs(1.0));
    output.render_for(secs(1.5));

    engine.crossfade_to(MoodType::Suspense, secs(1.0));
    output.render_for(secs(0.3));
    engine.crossfade_to(MoodType::Calm, secs(1.0));

    // Well past every fade and every scheduled stop
    output.render_for(secs(3.0));

    assert_eq!(engine.current_mood(), Some(MoodType::Calm));
    assert_eq!(engine.playing_moods(), vec![MoodType::Calm]);
    let calm = engine.track_status(MoodType::Calm);
    assert!((calm.gain - 1.0).abs() < 1e-3);
    assert!(!engine.track_status(MoodType::Suspense).playing);
}

#[tokio::test]
async fn crossfade_to_unloaded_mood_changes_nothing() {
    let (engine, output) = offline_engine(RATE, MapFetcher::new());
    engine.init().unwrap();
    engine.load_track(MoodType::Happy, None).await;
    engine.crossfade_to(MoodType::Happy, secs(0.5));
    output.render_for(secs(1.0));

    engine.crossfade_to(MoodType::Dramatic, secs(0.5));
    assert_eq!(engine.current_mood(), Some(MoodType::Happy));
    assert_eq!(engine.playing_moods(), vec![MoodType::Happy]);
}

#[tokio::test]
async fn reload_while_playing_keeps_live_voice() {
    let wav = tone_wav(RATE, 1, secs(1.0));
    let fetcher = MapFetcher::new().with("https://cdn.test/calm.wav", wav);
    let (engine, output) = offline_engine(RATE, fetcher);
    engine.init().unwrap();

    engine.load_track(MoodType::Calm, None).await;
    engine.crossfade_to(MoodType::Calm, secs(0.5));
    output.render_for(secs(0.6));

    let origin = engine
        .load_track(MoodType::Calm, Some("https://cdn.test/calm.wav"))
        .await;
    assert_eq!(origin, Some(TrackOrigin::Network));

    let status = engine.track_status(MoodType::Calm);
    assert!(status.playing);
    assert_eq!(status.origin, Some(TrackOrigin::Network));
    assert_eq!(engine.active_voice_count(), 1);
}

#[tokio::test]
async fn default_crossfade_uses_configured_duration() {
    let (engine, _output) = offline_engine(RATE, MapFetcher::new());
    let events = engine.subscribe();
    engine.init().unwrap();
    engine.load_track(MoodType::Adventure, None).await;

    engine.crossfade_to_default(MoodType::Adventure);

    let durations: Vec<_> = events
        .try_iter()
        .filter_map(|e| match e {
            EngineEvent::CrossfadeStarted { duration_ms, .. } => Some(duration_ms),
            _ => None,
        })
        .collect();
    assert_eq!(durations, vec![2000]);
}

// ============================================================================
// Sound effects
// ============================================================================

#[tokio::test]
async fn missing_effect_leaves_music_alone() {
    let (engine, output) = offline_engine(RATE, MapFetcher::new());
    engine.init().unwrap();
    engine.load_track(MoodType::Calm, None).await;
    engine.crossfade_to(MoodType::Calm, secs(1.0));
    output.render_for(secs(1.1));

    engine.play_sound_effect("missing");

    assert_eq!(engine.current_mood(), Some(MoodType::Calm));
    assert_eq!(engine.active_voice_count(), 1);
    assert!(!engine.has_sound_effect("missing"));
}

#[tokio::test]
async fn effects_overlap_and_end_on_their_own() {
    let wav = tone_wav(RATE, 2, secs(0.25));
    let fetcher = MapFetcher::new().with("https://cdn.test/chime.wav", wav);
    let (engine, output) = offline_engine(RATE, fetcher);
    engine.init().unwrap();

    assert!(engine.load_sound_effect("chime", "https://cdn.test/chime.wav").await);
    assert!(engine.has_sound_effect("chime"));

    engine.play_sound_effect("chime");
    engine.play_sound_effect("chime");
    assert_eq!(engine.active_voice_count(), 2);

    let first = output.render_for(secs(0.1));
    assert!(peak(&first) > 0.5);

    output.render_for(secs(0.5));
    assert_eq!(engine.active_voice_count(), 0);
}

#[tokio::test]
async fn failed_effect_load_leaves_name_absent() {
    let (engine, _output) = offline_engine(RATE, MapFetcher::new());
    engine.init().unwrap();

    assert!(!engine.load_sound_effect("door", "https://cdn.test/door.mp3").await);
    assert!(!engine.has_sound_effect("door"));
    engine.play_sound_effect("door");
    assert_eq!(engine.active_voice_count(), 0);
}

#[tokio::test]
async fn muted_effects_bus_is_silent() {
    let wav = tone_wav(RATE, 1, secs(0.5));
    let fetcher = MapFetcher::new().with("https://cdn.test/pop.wav", wav);
    let (engine, output) = offline_engine(RATE, fetcher);
    engine.init().unwrap();
    engine.load_sound_effect("pop", "https://cdn.test/pop.wav").await;

    engine.set_sound_effects_volume(0);
    engine.play_sound_effect("pop");
    assert_eq!(peak(&output.render_for(secs(0.2))), 0.0);
}

// ============================================================================
// Volume
// ============================================================================

#[test]
fn volume_is_clamped() {
    let (engine, _output) = offline_engine(RATE, MapFetcher::new());
    let events = engine.subscribe();
    engine.init().unwrap();

    engine.set_music_volume(150);
    assert_eq!(engine.music_bus_gain(), 1.0);
    engine.set_music_volume(-10);
    assert_eq!(engine.music_bus_gain(), 0.0);
    engine.set_music_volume(80);
    assert!((engine.music_bus_gain() - 0.8).abs() < 1e-6);

    let levels: Vec<_> = events
        .try_iter()
        .filter_map(|e| match e {
            EngineEvent::VolumeChanged { bus: Bus::Music, level } => Some(level),
            _ => None,
        })
        .collect();
    assert_eq!(levels, vec![100, 0, 80]);
}

#[tokio::test]
async fn music_volume_scales_output() {
    let (engine, output) = offline_engine(RATE, MapFetcher::new());
    engine.init().unwrap();
    engine.load_track(MoodType::Dramatic, None).await;
    engine.crossfade_to(MoodType::Dramatic, secs(0.0));
    output.render_for(secs(1.0));

    let full = peak(&output.render_for(secs(1.0)));
    engine.set_music_volume(50);
    let half = peak(&output.render_for(secs(1.0)));
    assert!(full > 0.05);
    // Synthesized voices never sum past 0.15
    assert!(half <= 0.5 * 0.15 + 1e-4, "half-volume peak was {half}");
}

// ============================================================================
// Pause / resume
// ============================================================================

#[tokio::test]
async fn pause_freezes_output_and_resume_restores_it() {
    let (engine, output) = offline_engine(RATE, MapFetcher::new());
    engine.init().unwrap();
    engine.load_track(MoodType::Calm, None).await;
    engine.crossfade_to(MoodType::Calm, secs(0.5));
    output.render_for(secs(1.0));

    engine.pause();
    assert!(engine.is_paused());
    let before = engine.session_time().unwrap();
    assert_eq!(peak(&output.render_for(secs(0.5))), 0.0);
    assert_eq!(engine.session_time().unwrap(), before);

    engine.resume();
    assert!(!engine.is_paused());
    assert_eq!(engine.current_mood(), Some(MoodType::Calm));
    assert!(peak(&output.render_for(secs(0.5))) > 0.05);
}

#[tokio::test]
async fn crossfade_wakes_suspended_session() {
    let (engine, output) = offline_engine(RATE, MapFetcher::new());
    engine.init().unwrap();
    engine.load_track(MoodType::Happy, None).await;

    output.suspend_externally();
    engine.crossfade_to(MoodType::Happy, secs(0.5));
    assert_eq!(output.state(), SessionState::Running);

    engine.pause();
    engine.play_sound_effect("unknown");
    assert!(!engine.is_paused());
    assert_eq!(output.state(), SessionState::Running);
}

// ============================================================================
// Teardown
// ============================================================================

#[tokio::test]
async fn cleanup_releases_loaded_effects() {
    let wav = tone_wav(RATE, 1, secs(0.1));
    let fetcher = MapFetcher::new().with("https://cdn.test/bell.wav", wav);
    let (engine, _output) = offline_engine(RATE, fetcher);
    engine.init().unwrap();
    assert!(engine.load_sound_effect("bell", "https://cdn.test/bell.wav").await);
    engine.load_track(MoodType::Calm, None).await;

    engine.cleanup();
    assert!(!engine.has_sound_effect("bell"));
    assert!(!engine.track_status(MoodType::Calm).loaded);
}

#[tokio::test]
async fn every_command_after_cleanup_is_safe() {
    let (engine, output) = offline_engine(RATE, MapFetcher::new());
    engine.init().unwrap();
    engine.load_track(MoodType::Calm, None).await;
    engine.crossfade_to(MoodType::Calm, secs(1.0));

    engine.cleanup();
    engine.cleanup();
    assert!(!engine.is_initialized());
    assert_eq!(engine.current_mood(), None);
    assert_eq!(output.state(), SessionState::Closed);

    assert_eq!(engine.load_track(MoodType::Happy, None).await, None);
    assert!(!engine.load_sound_effect("x", "https://cdn.test/x.wav").await);
    engine.crossfade_to(MoodType::Calm, secs(1.0));
    engine.play_sound_effect("x");
    engine.set_music_volume(10);
    engine.set_sound_effects_volume(10);
    engine.pause();
    engine.resume();

    assert_eq!(engine.current_mood(), None);
    assert!(engine.playing_moods().is_empty());
    assert_eq!(engine.active_voice_count(), 0);
    assert!(engine.init().is_err());
}

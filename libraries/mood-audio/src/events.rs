//! Engine events
//!
//! Hosts subscribe to follow what the engine did without polling: lifecycle
//! changes, finished loads, crossfades, volume changes. Events are informative
//! only; no command depends on anyone listening.

use crate::types::{Bus, MoodType, TrackOrigin};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Events emitted by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Device session opened and the mix graph is running
    Initialized { sample_rate: u32, channels: u16 },

    /// A mood's buffer was stored
    TrackLoaded { mood: MoodType, origin: TrackOrigin },

    /// An effect buffer was stored
    EffectLoaded { name: String },

    /// Crossfade automation was scheduled
    CrossfadeStarted {
        /// Mood faded out, if one was playing
        from: Option<MoodType>,
        to: MoodType,
        duration_ms: u64,
    },

    /// A mood's voice ended after its fade-out
    TrackStopped { mood: MoodType },

    /// An effect voice was started
    EffectPlayed { name: String },

    /// Bus volume changed (0-100)
    VolumeChanged { bus: Bus, level: u8 },

    Paused,

    Resumed,

    /// Engine released its device session for good
    TornDown,
}

/// Fan-out of events to any number of subscribers
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<EngineEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> Receiver<EngineEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber, dropping closed ones
    pub fn emit(&self, event: EngineEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_receives() {
        let bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.emit(EngineEvent::Paused);
        assert_eq!(a.try_recv().unwrap(), EngineEvent::Paused);
        assert_eq!(b.try_recv().unwrap(), EngineEvent::Paused);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let bus = EventBus::new();
        let keep = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(EngineEvent::Resumed);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(keep.try_recv().unwrap(), EngineEvent::Resumed);
    }

    #[test]
    fn emit_without_subscribers() {
        EventBus::new().emit(EngineEvent::TornDown);
    }

    #[test]
    fn events_serialize() {
        let event = EngineEvent::TrackLoaded {
            mood: MoodType::Happy,
            origin: TrackOrigin::Network,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("happy"));
        assert_eq!(serde_json::from_str::<EngineEvent>(&json).unwrap(), event);
    }
}

//! Audio device session abstraction
//!
//! The engine never talks to hardware directly. A backend opens a
//! [`DeviceSession`], the engine connects its mix graph to it, and the session
//! pulls audio from the graph at its own pace. Platform-specific sessions live
//! in other crates (CPAL on desktop); [`OfflineBackend`] renders on demand and
//! is used for tests and file rendering.

use crate::error::{EngineError, Result};
use crate::graph::SharedGraph;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Device session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Pulling audio from the graph
    Running,

    /// Suspended by the engine or by the host; the session clock is frozen
    Suspended,

    /// Released; cannot be resumed
    Closed,
}

/// Live connection to an audio output
pub trait DeviceSession: Send {
    /// Native sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Number of output channels
    fn channels(&self) -> u16;

    /// Start pulling audio from `graph`
    fn connect(&mut self, graph: SharedGraph) -> Result<()>;

    /// Current state (may change outside the engine's control)
    fn state(&self) -> SessionState;

    /// Suspend output
    fn suspend(&mut self) -> Result<()>;

    /// Resume output
    fn resume(&mut self) -> Result<()>;

    /// Release the session. Idempotent.
    fn close(&mut self);
}

/// Factory for device sessions
pub trait AudioBackend: Send + Sync {
    /// Open a session on the output device
    fn open(&self) -> Result<Box<dyn DeviceSession>>;
}

#[derive(Debug)]
struct OfflineInner {
    graph: Option<SharedGraph>,
    state: SessionState,
}

/// Host-side controls of an offline session
///
/// Cloned handles share the same session.
#[derive(Debug, Clone)]
pub struct OfflineHandle {
    sample_rate: u32,
    channels: u16,
    inner: Arc<Mutex<OfflineInner>>,
}

impl OfflineHandle {
    /// Render `frames` frames of interleaved output
    ///
    /// Returns silence without advancing the session clock unless the
    /// session is running and connected.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut output = vec![0.0; frames * self.channels as usize];
        let graph = {
            let inner = self.inner.lock();
            if inner.state != SessionState::Running {
                return output;
            }
            match &inner.graph {
                Some(graph) => Arc::clone(graph),
                None => return output,
            }
        };
        graph.lock().render(&mut output, self.channels as usize);
        output
    }

    /// Render a duration worth of output
    pub fn render_for(&self, duration: Duration) -> Vec<f32> {
        let frames = (duration.as_secs_f64() * f64::from(self.sample_rate)).round() as usize;
        self.render(frames)
    }

    /// Suspend the session from the host side, bypassing the engine
    pub fn suspend_externally(&self) {
        let mut inner = self.inner.lock();
        if inner.state == SessionState::Running {
            inner.state = SessionState::Suspended;
        }
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// Whether a graph is connected
    pub fn is_connected(&self) -> bool {
        self.inner.lock().graph.is_some()
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of output channels
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

/// Backend that renders only when asked
///
/// One session per backend: `open` hands out a session sharing the backend's
/// [`OfflineHandle`].
#[derive(Debug, Clone)]
pub struct OfflineBackend {
    handle: OfflineHandle,
    available: bool,
}

impl OfflineBackend {
    /// Create an offline backend
    ///
    /// # Panics
    /// If `sample_rate` or `channels` is zero.
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        assert!(sample_rate > 0, "sample rate must be positive");
        assert!(channels > 0, "channel count must be positive");
        Self {
            handle: OfflineHandle {
                sample_rate,
                channels,
                inner: Arc::new(Mutex::new(OfflineInner {
                    graph: None,
                    state: SessionState::Suspended,
                })),
            },
            available: true,
        }
    }

    /// Backend whose device can never be opened
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(44_100, 2)
        }
    }

    /// Host-side controls
    pub fn handle(&self) -> OfflineHandle {
        self.handle.clone()
    }
}

impl AudioBackend for OfflineBackend {
    fn open(&self) -> Result<Box<dyn DeviceSession>> {
        if !self.available {
            return Err(EngineError::DeviceUnavailable(
                "offline device marked unavailable".to_string(),
            ));
        }
        Ok(Box::new(OfflineSession {
            handle: self.handle.clone(),
        }))
    }
}

/// Session half of [`OfflineBackend`]
#[derive(Debug)]
pub struct OfflineSession {
    handle: OfflineHandle,
}

impl DeviceSession for OfflineSession {
    fn sample_rate(&self) -> u32 {
        self.handle.sample_rate
    }

    fn channels(&self) -> u16 {
        self.handle.channels
    }

    fn connect(&mut self, graph: SharedGraph) -> Result<()> {
        let mut inner = self.handle.inner.lock();
        if inner.state == SessionState::Closed {
            return Err(EngineError::Stream("offline session is closed".to_string()));
        }
        inner.graph = Some(graph);
        inner.state = SessionState::Running;
        Ok(())
    }

    fn state(&self) -> SessionState {
        self.handle.state()
    }

    fn suspend(&mut self) -> Result<()> {
        let mut inner = self.handle.inner.lock();
        match inner.state {
            SessionState::Closed => Err(EngineError::Stream("offline session is closed".to_string())),
            _ => {
                inner.state = SessionState::Suspended;
                Ok(())
            }
        }
    }

    fn resume(&mut self) -> Result<()> {
        let mut inner = self.handle.inner.lock();
        match inner.state {
            SessionState::Closed => Err(EngineError::Stream("offline session is closed".to_string())),
            _ if inner.graph.is_none() => {
                Err(EngineError::Stream("offline session has no graph".to_string()))
            }
            _ => {
                inner.state = SessionState::Running;
                Ok(())
            }
        }
    }

    fn close(&mut self) {
        let mut inner = self.handle.inner.lock();
        inner.graph = None;
        inner.state = SessionState::Closed;
    }
}

/// CPAL device session (dedicated audio thread)
use crate::error::{CpalError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};
use mood_audio::{AudioBackend, DeviceSession, SessionState, SharedGraph};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

const RUNNING: u8 = 0;
const SUSPENDED: u8 = 1;
const CLOSED: u8 = 2;

/// Commands sent to the audio thread
enum AudioCommand {
    /// Build the output stream rendering `graph` and start it
    Connect {
        graph: SharedGraph,
        reply: Sender<Result<()>>,
    },
    /// Start or restart the stream
    Play { reply: Sender<Result<()>> },
    /// Pause the stream
    Pause { reply: Sender<Result<()>> },
    /// Drop the stream and exit the thread
    Shutdown,
}

/// Backend opening sessions on the default output device
#[derive(Debug, Clone, Copy, Default)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }
}

impl AudioBackend for CpalBackend {
    fn open(&self) -> mood_audio::Result<Box<dyn DeviceSession>> {
        let session = CpalSession::open_default()?;
        Ok(Box::new(session))
    }
}

/// Output session on a CPAL device
///
/// **Architecture**: a dedicated audio thread owns the CPAL `Stream`, which is
/// not `Send` on every platform. The session talks to it over a channel and
/// waits for each reply, so errors from play/pause surface synchronously.
/// Stream errors reported by the host (device unplugged, server restart)
/// flip the session to [`SessionState::Suspended`].
pub struct CpalSession {
    /// Channel to send commands to the audio thread
    command_tx: Sender<AudioCommand>,
    sample_rate: u32,
    channels: u16,
    state: Arc<AtomicU8>,
    audio_thread: Option<JoinHandle<()>>,
}

impl CpalSession {
    /// Open the default output device with its default configuration
    pub fn open_default() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(CpalError::DeviceNotFound)?;

        let supported = device.default_output_config()?;
        let sample_rate = supported.sample_rate();
        let sample_format = supported.sample_format();
        let config = supported.config();
        let channels = config.channels;

        info!(sample_rate, channels, format = ?sample_format, "Opened default output device");

        let state = Arc::new(AtomicU8::new(SUSPENDED));
        let (command_tx, command_rx) = bounded::<AudioCommand>(32);

        let thread_state = Arc::clone(&state);
        let audio_thread = thread::Builder::new()
            .name("mood-audio-output".to_string())
            .spawn(move || audio_thread_run(device, config, thread_state, command_rx))
            .map_err(|_| CpalError::AudioThread)?;

        Ok(Self {
            command_tx,
            sample_rate,
            channels,
            state,
            audio_thread: Some(audio_thread),
        })
    }

    /// Send a command and wait for the audio thread's answer
    fn request(&self, command: impl FnOnce(Sender<Result<()>>) -> AudioCommand) -> Result<()> {
        let (reply_tx, reply_rx) = bounded(1);
        self.command_tx
            .send(command(reply_tx))
            .map_err(|_| CpalError::AudioThread)?;
        reply_rx.recv().map_err(|_| CpalError::AudioThread)?
    }
}

impl DeviceSession for CpalSession {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn connect(&mut self, graph: SharedGraph) -> mood_audio::Result<()> {
        self.request(|reply| AudioCommand::Connect { graph, reply })?;
        Ok(())
    }

    fn state(&self) -> SessionState {
        match self.state.load(Ordering::Acquire) {
            RUNNING => SessionState::Running,
            SUSPENDED => SessionState::Suspended,
            _ => SessionState::Closed,
        }
    }

    fn suspend(&mut self) -> mood_audio::Result<()> {
        self.request(|reply| AudioCommand::Pause { reply })?;
        Ok(())
    }

    fn resume(&mut self) -> mood_audio::Result<()> {
        self.request(|reply| AudioCommand::Play { reply })?;
        Ok(())
    }

    fn close(&mut self) {
        if let Some(handle) = self.audio_thread.take() {
            let _ = self.command_tx.send(AudioCommand::Shutdown);
            if handle.join().is_err() {
                warn!("Audio thread panicked");
            }
            debug!("Output session closed");
        }
        self.state.store(CLOSED, Ordering::Release);
    }
}

impl Drop for CpalSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Audio thread main loop
///
/// Runs in a dedicated thread and owns the CPAL stream.
fn audio_thread_run(
    device: Device,
    config: StreamConfig,
    state: Arc<AtomicU8>,
    command_rx: Receiver<AudioCommand>,
) {
    let mut stream: Option<Stream> = None;

    while let Ok(cmd) = command_rx.recv() {
        match cmd {
            AudioCommand::Connect { graph, reply } => {
                // Replace any previous stream
                stream = None;
                let result = build_stream(&device, &config, graph, &state).and_then(|s| {
                    s.play()?;
                    Ok(s)
                });
                let result = result.map(|s| {
                    stream = Some(s);
                    state.store(RUNNING, Ordering::Release);
                });
                let _ = reply.send(result);
            }
            AudioCommand::Play { reply } => {
                let result = match &stream {
                    Some(s) => s.play().map_err(CpalError::from).map(|()| {
                        state.store(RUNNING, Ordering::Release);
                    }),
                    None => Err(CpalError::NotConnected),
                };
                let _ = reply.send(result);
            }
            AudioCommand::Pause { reply } => {
                let result = match &stream {
                    Some(s) => s.pause().map_err(CpalError::from),
                    None => Ok(()),
                };
                if result.is_ok() {
                    state.store(SUSPENDED, Ordering::Release);
                }
                let _ = reply.send(result);
            }
            AudioCommand::Shutdown => break,
        }
    }

    drop(stream);
    state.store(CLOSED, Ordering::Release);
}

/// Build an f32 output stream pulling from `graph`
fn build_stream(
    device: &Device,
    config: &StreamConfig,
    graph: SharedGraph,
    state: &Arc<AtomicU8>,
) -> Result<Stream> {
    let channels = config.channels as usize;
    let error_state = Arc::clone(state);

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            graph.lock().render(data, channels);
        },
        move |err| {
            warn!(error = %err, "Audio stream error");
            // Host-side interruption; the engine resumes on its next command
            let _ = error_state.compare_exchange(
                RUNNING,
                SUSPENDED,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        },
        None,
    )?;

    Ok(stream)
}

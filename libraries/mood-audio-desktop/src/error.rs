/// CPAL output errors
use mood_audio::EngineError;
use thiserror::Error;

/// Result type for CPAL output operations
pub type Result<T> = std::result::Result<T, CpalError>;

/// CPAL output errors
#[derive(Debug, Error)]
pub enum CpalError {
    /// No default output device
    #[error("Audio device not found")]
    DeviceNotFound,

    /// Device configuration could not be queried
    #[error("Device configuration error: {0}")]
    Config(String),

    /// Failed to build output stream
    #[error("Failed to build output stream: {0}")]
    StreamBuild(String),

    /// Failed to play stream
    #[error("Failed to play stream: {0}")]
    Play(String),

    /// Failed to pause stream
    #[error("Failed to pause stream: {0}")]
    Pause(String),

    /// Play/pause requested before a graph was connected
    #[error("No stream: graph not connected")]
    NotConnected,

    /// The audio thread is gone
    #[error("Audio thread stopped")]
    AudioThread,
}

impl From<cpal::BuildStreamError> for CpalError {
    fn from(err: cpal::BuildStreamError) -> Self {
        CpalError::StreamBuild(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for CpalError {
    fn from(err: cpal::PlayStreamError) -> Self {
        CpalError::Play(err.to_string())
    }
}

impl From<cpal::PauseStreamError> for CpalError {
    fn from(err: cpal::PauseStreamError) -> Self {
        CpalError::Pause(err.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for CpalError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        CpalError::Config(err.to_string())
    }
}

impl From<CpalError> for EngineError {
    fn from(err: CpalError) -> Self {
        match err {
            CpalError::DeviceNotFound | CpalError::Config(_) => {
                EngineError::DeviceUnavailable(err.to_string())
            }
            _ => EngineError::Stream(err.to_string()),
        }
    }
}

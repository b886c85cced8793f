//! Error types for the mood audio engine

use thiserror::Error;

/// Engine errors
///
/// Only `init` surfaces these to the host. Everything else is absorbed by the
/// engine and logged (fallback to synthesis, silent skip).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The audio device session could not be created
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The output stream failed to build, start, pause or resume
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// The engine was cleaned up and cannot be initialized again
    #[error("Engine has been torn down")]
    TornDown,

    /// HTTP request for an asset failed
    #[error("Asset request failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// Asset server answered with a non-success status
    #[error("Asset server returned {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// Asset bytes could not be decoded into audio
    #[error("Decode error: {0}")]
    Decode(String),

    /// Sample rate conversion failed
    #[error("Resample error: {0}")]
    Resample(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Mood name not recognised
    #[error("Unknown mood: {0}")]
    UnknownMood(String),
}

impl From<symphonia::core::errors::Error> for EngineError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        EngineError::Decode(err.to_string())
    }
}

impl From<config::ConfigError> for EngineError {
    fn from(err: config::ConfigError) -> Self {
        EngineError::Config(err.to_string())
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

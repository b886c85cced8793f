//! Engine configuration
//!
//! Every field has a default, so an empty source is a valid configuration.
//! Sources are layered: optional TOML file, then `MOOD_AUDIO_*` environment
//! variables (`MOOD_AUDIO_DEFAULT_CROSSFADE_SECS=3.5`).

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const ENV_PREFIX: &str = "MOOD_AUDIO";

/// Longest accepted default crossfade (one hour)
pub const MAX_CROSSFADE_SECS: f64 = 3600.0;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Crossfade length used by `crossfade_to_default`
    #[serde(default = "default_crossfade_secs")]
    pub default_crossfade_secs: f64,

    /// How long an outgoing track keeps playing after its fade ends
    #[serde(default = "default_stop_margin_ms")]
    pub stop_margin_ms: u64,

    /// HTTP timeout for asset fetches
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Initial music bus volume (0-100)
    #[serde(default = "default_volume")]
    pub music_volume: u8,

    /// Initial effects bus volume (0-100)
    #[serde(default = "default_volume")]
    pub effects_volume: u8,
}

impl EngineConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            settings = settings.add_source(config::File::from(path));
        }

        settings = settings.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document, without consulting the environment
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=MAX_CROSSFADE_SECS).contains(&self.default_crossfade_secs) {
            return Err(EngineError::Config(format!(
                "default_crossfade_secs must be between 0 and {MAX_CROSSFADE_SECS}, got {}",
                self.default_crossfade_secs
            )));
        }

        if self.fetch_timeout_secs == 0 {
            return Err(EngineError::Config(
                "fetch_timeout_secs must be positive".to_string(),
            ));
        }

        for (name, volume) in [
            ("music_volume", self.music_volume),
            ("effects_volume", self.effects_volume),
        ] {
            if volume > 100 {
                return Err(EngineError::Config(format!(
                    "{name} must be between 0 and 100, got {volume}"
                )));
            }
        }

        Ok(())
    }

    /// Default crossfade length, clamped to `0..=MAX_CROSSFADE_SECS`
    ///
    /// Also holds for configs built in code that never went through
    /// [`EngineConfig::validate`]; NaN maps to zero.
    pub fn default_crossfade(&self) -> Duration {
        Duration::try_from_secs_f64(self.default_crossfade_secs.clamp(0.0, MAX_CROSSFADE_SECS))
            .unwrap_or_default()
    }

    pub fn stop_margin(&self) -> Duration {
        Duration::from_millis(self.stop_margin_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_crossfade_secs: default_crossfade_secs(),
            stop_margin_ms: default_stop_margin_ms(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            music_volume: default_volume(),
            effects_volume: default_volume(),
        }
    }
}

// Default values
fn default_crossfade_secs() -> f64 {
    2.0
}

fn default_stop_margin_ms() -> u64 {
    100
}

fn default_fetch_timeout_secs() -> u64 {
    15
}

fn default_volume() -> u8 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.default_crossfade(), Duration::from_secs(2));
        assert_eq!(config.stop_margin(), Duration::from_millis(100));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(15));
        assert_eq!(config.music_volume, 100);
        assert_eq!(config.effects_volume, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_document_uses_defaults() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn partial_document_overrides() {
        let config = EngineConfig::from_toml_str(
            "default_crossfade_secs = 3.5\nmusic_volume = 40\n",
        )
        .unwrap();
        assert_eq!(config.default_crossfade(), Duration::from_millis(3500));
        assert_eq!(config.music_volume, 40);
        assert_eq!(config.effects_volume, 100);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            EngineConfig::from_toml_str("default_crossfade_secs = -1.0"),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("default_crossfade_secs = 1e20"),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("default_crossfade_secs = 3600.5"),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("default_crossfade_secs = nan"),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("effects_volume = 120"),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("fetch_timeout_secs = 0"),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn unvalidated_crossfade_is_clamped() {
        let huge = EngineConfig {
            default_crossfade_secs: 1e20,
            ..EngineConfig::default()
        };
        assert_eq!(huge.default_crossfade(), Duration::from_secs(3600));

        let nan = EngineConfig {
            default_crossfade_secs: f64::NAN,
            ..EngineConfig::default()
        };
        assert_eq!(nan.default_crossfade(), Duration::ZERO);

        let negative = EngineConfig {
            default_crossfade_secs: -4.0,
            ..EngineConfig::default()
        };
        assert_eq!(negative.default_crossfade(), Duration::ZERO);
    }

    #[test]
    fn accepts_longest_crossfade() {
        let config = EngineConfig::from_toml_str("default_crossfade_secs = 3600.0").unwrap();
        assert_eq!(config.default_crossfade(), Duration::from_secs(3600));
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(matches!(
            EngineConfig::from_toml_str("music_volume = \"loud\""),
            Err(EngineError::Config(_))
        ));
    }
}

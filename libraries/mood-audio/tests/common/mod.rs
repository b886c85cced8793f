//! Shared test infrastructure

#![allow(dead_code)]

use async_trait::async_trait;
use mood_audio::{AssetFetcher, EngineConfig, EngineError, MoodEngine, OfflineBackend, OfflineHandle, Result};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Once};
use std::time::Duration;

static TRACING: Once = Once::new();

/// Route engine logs to the test harness output (`RUST_LOG=mood_audio=debug`)
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Fetcher serving canned bodies; unknown URLs answer 404
#[derive(Default)]
pub struct MapFetcher {
    assets: HashMap<String, Vec<u8>>,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: Vec<u8>) -> Self {
        self.assets.insert(url.to_string(), body);
        self
    }
}

#[async_trait]
impl AssetFetcher for MapFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.assets.get(url).cloned().ok_or_else(|| EngineError::HttpStatus {
            status: 404,
            url: url.to_string(),
        })
    }
}

/// 16-bit WAV holding a 440 Hz tone at half scale
pub fn tone_wav(sample_rate: u32, channels: u16, duration: Duration) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let frames = (duration.as_secs_f64() * f64::from(sample_rate)) as usize;

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            let value = (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5;
            for _ in 0..channels {
                writer.write_sample((value * f32::from(i16::MAX)) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Engine on an offline device plus the handle that drives its clock
pub fn offline_engine(sample_rate: u32, fetcher: MapFetcher) -> (MoodEngine, OfflineHandle) {
    init_tracing();
    let backend = OfflineBackend::new(sample_rate, 2);
    let handle = backend.handle();
    let engine = MoodEngine::with_fetcher(backend, Arc::new(fetcher), EngineConfig::default());
    (engine, handle)
}

/// Largest absolute sample
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |max, s| max.max(s.abs()))
}

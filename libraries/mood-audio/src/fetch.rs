//! Asset retrieval over HTTP

use crate::error::{EngineError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Retrieves raw asset bytes for a URL
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Fetch the complete body behind `url`
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetcher backed by a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpAssetFetcher {
    http: reqwest::Client,
}

impl HttpAssetFetcher {
    /// Create a fetcher whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url = %url, "Fetching audio asset");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        debug!(url = %url, size = bytes.len(), "Audio asset fetched");
        Ok(bytes.to_vec())
    }
}

/// File extension of a URL's path, used as a decoder hint
///
/// Query strings and fragments are ignored: `https://cdn/a/calm.ogg?v=2`
/// yields `ogg`.
pub fn extension_hint(url: &str) -> Option<&str> {
    let path = url.split(|c: char| c == '?' || c == '#').next().unwrap_or(url);
    let file = path.rsplit('/').next()?;
    let (stem, ext) = file.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext)
}

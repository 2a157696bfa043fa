//! Remote raster asset fetching.

use async_trait::async_trait;
use bytes::Bytes;

use imagery_common::ImageryConfig;

/// Byte-level access to raster assets. Trait seam so tests can feed
/// in-memory assets instead of hitting the network.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, uri: &str) -> Result<Bytes, FetchError>;
}

#[async_trait]
impl<T: AssetFetcher + ?Sized> AssetFetcher for std::sync::Arc<T> {
    async fn fetch(&self, uri: &str) -> Result<Bytes, FetchError> {
        (**self).fetch(uri).await
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to fetch {uri}: {message}")]
pub struct FetchError {
    pub uri: String,
    pub message: String,
}

/// HTTP fetcher with a bounded timeout sized for large remote COGs.
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &ImageryConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.raster_timeout_secs))
            .build()
            .map_err(|e| FetchError {
                uri: String::new(),
                message: format!("HTTP client init failed: {}", e),
            })?;
        Ok(Self { http })
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, uri: &str) -> Result<Bytes, FetchError> {
        let response = self
            .http
            .get(uri)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError {
                uri: uri.to_string(),
                message: e.to_string(),
            })?;

        response.bytes().await.map_err(|e| FetchError {
            uri: uri.to_string(),
            message: e.to_string(),
        })
    }
}

//! Application state and shared resources.

use anyhow::Result;
use std::sync::Arc;

use capture::{CaptureResolver, CatalogSearch};
use catalog_client::StacSearchClient;
use compositor::{AssetFetcher, Compositor, HttpFetcher};
use imagery_common::ImageryConfig;

/// Shared application state.
///
/// The resolver and compositor are stateless between requests; the
/// only process-wide resources are their HTTP connection pools.
pub struct AppState {
    pub config: ImageryConfig,
    pub resolver: CaptureResolver<Arc<dyn CatalogSearch>>,
    pub compositor: Compositor<Arc<dyn AssetFetcher>>,
}

impl AppState {
    /// Wire up the real catalog client and HTTP asset fetcher.
    pub fn new(config: ImageryConfig) -> Result<Self> {
        let catalog: Arc<dyn CatalogSearch> = Arc::new(StacSearchClient::new(&config)?);
        let fetcher: Arc<dyn AssetFetcher> = Arc::new(HttpFetcher::new(&config)?);
        Ok(Self::with_components(config, catalog, fetcher))
    }

    /// Assemble from explicit components; tests substitute stubs here.
    pub fn with_components(
        config: ImageryConfig,
        catalog: Arc<dyn CatalogSearch>,
        fetcher: Arc<dyn AssetFetcher>,
    ) -> Self {
        let resolver = CaptureResolver::new(catalog, config.clone());
        let compositor = Compositor::new(fetcher, &config);
        Self {
            config,
            resolver,
            compositor,
        }
    }
}

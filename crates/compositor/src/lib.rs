//! Raster compositing: fetch a resolved capture's assets, crop to the
//! requested tile or bbox, optionally pan-sharpen, rescale to 8-bit,
//! and encode.

pub mod encode;
pub mod fetch;
pub mod pansharpen;
pub mod raster;
pub mod rescale;

use thiserror::Error;
use tracing::{debug, instrument};

use imagery_common::{CaptureRecord, ImageryConfig, ImageryError, RenderGeometry};

pub use encode::OutputFormat;
pub use fetch::{AssetFetcher, FetchError, HttpFetcher};
pub use pansharpen::BROVEY_WEIGHT;
pub use rescale::RescalePolicy;

use raster::{Gray16Image, Rgb16Image};

/// Everything needed to turn a resolved capture into image bytes.
#[derive(Debug, Clone)]
pub struct RasterRenderRequest {
    pub capture: CaptureRecord,
    pub geometry: RenderGeometry,
    /// `None` uses the per-geometry convention: WEBP for tiles, PNG
    /// for bbox crops.
    pub format: Option<OutputFormat>,
    /// `None` uses the per-bit-depth default policy.
    pub rescale: Option<RescalePolicy>,
}

/// A fully rendered image plus the metadata the persistence layer
/// stores alongside it.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub width: u32,
    pub height: u32,
    pub cloud_cover: f32,
    pub source_uri: String,
}

/// Raster compositing failures. The distinction between causes is kept
/// for logging; HTTP callers only see a generic render failure.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to decode asset {uri}: {message}")]
    Decode { uri: String, message: String },

    #[error("requested window has no overlap with asset coverage")]
    EmptyWindow,

    #[error("pan/multispectral dimension mismatch: {rgb_width}x{rgb_height} vs {pan_width}x{pan_height}")]
    DimensionMismatch {
        rgb_width: u32,
        rgb_height: u32,
        pan_width: u32,
        pan_height: u32,
    },

    #[error("image encoding failed: {0}")]
    Encode(String),
}

impl From<RenderError> for ImageryError {
    fn from(err: RenderError) -> Self {
        ImageryError::Render(err.to_string())
    }
}

/// Renders resolved captures. Stateless between requests apart from
/// the fetcher's connection pool.
pub struct Compositor<F: AssetFetcher> {
    fetcher: F,
    tile_size: u32,
}

impl<F: AssetFetcher> Compositor<F> {
    pub fn new(fetcher: F, config: &ImageryConfig) -> Self {
        Self {
            fetcher,
            tile_size: config.tile_size,
        }
    }

    /// Produce an encoded image for the request.
    ///
    /// Either fully succeeds or fails; no partial output is returned.
    #[instrument(skip(self, request), fields(uri = %request.capture.uri))]
    pub async fn render(&self, request: &RasterRenderRequest) -> Result<RenderedImage, RenderError> {
        let capture = &request.capture;

        let source = self.fetch_rgb16(&capture.uri).await?;

        let (crop, default_format) = match request.geometry {
            RenderGeometry::Tile(tile) => (
                raster::extract_tile(&source, &capture.bbox, tile, self.tile_size)?,
                OutputFormat::Webp,
            ),
            RenderGeometry::Bbox(bbox) => (
                raster::extract_bbox(&source, &capture.bbox, &bbox, None)?,
                OutputFormat::Png,
            ),
        };

        // Sharpen whenever the capture carries a matched pan asset.
        let crop = match &capture.pan_uri {
            Some(pan_uri) => {
                let pan = self.fetch_gray16(pan_uri).await?;
                let pan_crop = self.extract_pan(&pan, capture, request, crop.dimensions())?;
                pansharpen::brovey_sharpen(&crop, &pan_crop, BROVEY_WEIGHT)?
            }
            None => crop,
        };

        let policy = request
            .rescale
            .unwrap_or_else(|| RescalePolicy::default_for_bits(capture.bits_per_pixel));
        let ranges = rescale::band_ranges(policy, &source, capture.bits_per_pixel);
        let rgb8 = rescale::rescale_to_8bit(&crop, ranges);

        let format = request.format.unwrap_or(default_format);
        let bytes = encode::encode_image(&rgb8, format)?;

        debug!(
            width = rgb8.width(),
            height = rgb8.height(),
            bytes = bytes.len(),
            "render complete"
        );

        Ok(RenderedImage {
            bytes,
            content_type: format.content_type(),
            width: rgb8.width(),
            height: rgb8.height(),
            cloud_cover: capture.cloud_cover,
            source_uri: capture.uri.clone(),
        })
    }

    /// Crop the pan band to exactly the multispectral crop's pixel
    /// dimensions so the Brovey inputs line up.
    fn extract_pan(
        &self,
        pan: &Gray16Image,
        capture: &CaptureRecord,
        request: &RasterRenderRequest,
        dimensions: (u32, u32),
    ) -> Result<Gray16Image, RenderError> {
        match request.geometry {
            RenderGeometry::Tile(tile) => {
                raster::extract_tile(pan, &capture.bbox, tile, self.tile_size)
            }
            RenderGeometry::Bbox(bbox) => {
                raster::extract_bbox(pan, &capture.bbox, &bbox, Some(dimensions))
            }
        }
    }

    async fn fetch_rgb16(&self, uri: &str) -> Result<Rgb16Image, RenderError> {
        let bytes = self.fetcher.fetch(uri).await?;
        let decoded = image::load_from_memory(&bytes).map_err(|e| RenderError::Decode {
            uri: uri.to_string(),
            message: e.to_string(),
        })?;
        Ok(raster::to_rgb16_preserving(&decoded))
    }

    async fn fetch_gray16(&self, uri: &str) -> Result<Gray16Image, RenderError> {
        let bytes = self.fetcher.fetch(uri).await?;
        let decoded = image::load_from_memory(&bytes).map_err(|e| RenderError::Decode {
            uri: uri.to_string(),
            message: e.to_string(),
        })?;
        Ok(raster::to_gray16_preserving(&decoded))
    }
}

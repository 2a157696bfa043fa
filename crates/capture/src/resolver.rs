//! Temporally-closest capture selection.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, instrument};

use catalog_client::worldview::WorldViewRecord;
use catalog_client::StacSearchClient;
use imagery_common::{
    BoundingBox, CaptureRecord, Constellation, ImageryConfig, ImageryError, ImageryResult,
    ResolutionQuery, ResolvedCapture,
};

use crate::pairing::pair_worldview;

/// Catalog search seam. The resolver is a pure selection function over
/// whatever implementation sits behind this trait.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    async fn search(
        &self,
        constellation: Constellation,
        timestamp: DateTime<Utc>,
        bbox: BoundingBox,
        time_buffer: Option<Duration>,
    ) -> ImageryResult<Vec<CaptureRecord>>;

    async fn search_worldview_raw(
        &self,
        timestamp: DateTime<Utc>,
        bbox: BoundingBox,
        time_buffer: Option<Duration>,
    ) -> ImageryResult<Vec<WorldViewRecord>>;
}

#[async_trait]
impl<T: CatalogSearch + ?Sized> CatalogSearch for std::sync::Arc<T> {
    async fn search(
        &self,
        constellation: Constellation,
        timestamp: DateTime<Utc>,
        bbox: BoundingBox,
        time_buffer: Option<Duration>,
    ) -> ImageryResult<Vec<CaptureRecord>> {
        (**self).search(constellation, timestamp, bbox, time_buffer).await
    }

    async fn search_worldview_raw(
        &self,
        timestamp: DateTime<Utc>,
        bbox: BoundingBox,
        time_buffer: Option<Duration>,
    ) -> ImageryResult<Vec<WorldViewRecord>> {
        (**self).search_worldview_raw(timestamp, bbox, time_buffer).await
    }
}

#[async_trait]
impl CatalogSearch for StacSearchClient {
    async fn search(
        &self,
        constellation: Constellation,
        timestamp: DateTime<Utc>,
        bbox: BoundingBox,
        time_buffer: Option<Duration>,
    ) -> ImageryResult<Vec<CaptureRecord>> {
        StacSearchClient::search(self, constellation, timestamp, bbox, time_buffer).await
    }

    async fn search_worldview_raw(
        &self,
        timestamp: DateTime<Utc>,
        bbox: BoundingBox,
        time_buffer: Option<Duration>,
    ) -> ImageryResult<Vec<WorldViewRecord>> {
        StacSearchClient::search_worldview_raw(self, timestamp, bbox, time_buffer).await
    }
}

/// Resolves a query to the single best-matching capture.
pub struct CaptureResolver<C: CatalogSearch> {
    catalog: C,
    config: ImageryConfig,
}

impl<C: CatalogSearch> CaptureResolver<C> {
    pub fn new(catalog: C, config: ImageryConfig) -> Self {
        Self { catalog, config }
    }

    /// Find the capture whose timestamp is closest to the query target.
    ///
    /// Returns [`ImageryError::NotFound`] when no candidate survives
    /// filtering; the endpoint maps that to a 404.
    #[instrument(skip(self, query), fields(constellation = %query.constellation))]
    pub async fn resolve(&self, query: &ResolutionQuery) -> ImageryResult<ResolvedCapture> {
        let buffer = self.search_buffer(query)?;

        let mut candidates = match query.constellation {
            Constellation::WorldView => {
                let raw = self
                    .catalog
                    .search_worldview_raw(query.timestamp, query.bbox, Some(buffer))
                    .await?;
                pair_worldview(
                    raw,
                    self.config.pan_pairing_window,
                    self.config.dedup_window,
                    query.require_pan,
                )
            }
            constellation => {
                self.catalog
                    .search(constellation, query.timestamp, query.bbox, Some(buffer))
                    .await?
            }
        };

        candidates.retain(|c| self.matches_filters(query, c));

        if candidates.is_empty() {
            return Err(ImageryError::NotFound);
        }

        // Stable boolean sort: tileable captures first. The minimum
        // scan below returns the first of equally-close timestamps, so
        // this sort is the tie-break.
        candidates.sort_by_key(|c| !c.tileable);

        let capture = candidates
            .into_iter()
            .min_by_key(|c| (c.timestamp - query.timestamp).abs())
            .expect("non-empty candidate list");

        debug!(
            uri = %capture.uri,
            capture_time = %capture.timestamp,
            target = %query.timestamp,
            "capture resolved"
        );

        Ok(ResolvedCapture {
            capture,
            target: query.timestamp,
        })
    }

    /// Catalog search window derived from the query's day range.
    ///
    /// `day_range = -1` disables candidate filtering and searches the
    /// widest configured window; absent, the default buffer applies.
    fn search_buffer(&self, query: &ResolutionQuery) -> ImageryResult<Duration> {
        match query.day_range {
            None => Ok(self.config.default_time_buffer),
            Some(-1) => Ok(self.config.max_time_buffer),
            // try_days: a caller-supplied count can overflow Duration
            Some(d) if d > 0 => Duration::try_days(d).ok_or(ImageryError::InvalidParameter {
                param: "day_range".to_string(),
                message: format!("out of range: {}", d),
            }),
            Some(d) => Err(ImageryError::InvalidParameter {
                param: "day_range".to_string(),
                message: format!("must be positive or -1, got {}", d),
            }),
        }
    }

    fn matches_filters(&self, query: &ResolutionQuery, capture: &CaptureRecord) -> bool {
        if let Some(level) = query.level {
            if capture.level != Some(level) {
                return false;
            }
        }

        // WorldView captures are whole paired images, not per-band
        // assets; the spectrum filter only applies elsewhere.
        if query.constellation != Constellation::WorldView {
            let wanted = query.spectrum.as_deref().unwrap_or("visual");
            if capture.spectrum.as_deref() != Some(wanted) {
                return false;
            }
        }

        if let Some(days) = query.day_range {
            // Validated by search_buffer before candidates exist
            if let Some(window) = Duration::try_days(days.max(0)) {
                if days > 0 && (capture.timestamp - query.timestamp).abs() > window {
                    return false;
                }
            }
        }

        true
    }
}

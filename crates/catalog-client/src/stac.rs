//! HTTP client for a STAC-compatible search endpoint.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

use imagery_common::{
    format_timestamp, parse_timestamp, BoundingBox, CaptureRecord, Constellation, ImageryConfig,
    ImageryError, ImageryResult,
};

use crate::collections::{
    collections_for, default_bits_per_pixel, is_known_spectrum, level_for_collection,
};
use crate::worldview::{self, WorldViewRecord};

/// Search client for the external imagery catalog.
pub struct StacSearchClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    search_limit: u32,
    default_time_buffer: Duration,
}

impl StacSearchClient {
    /// Build a client from configuration. The underlying connection
    /// pool is shared across requests.
    pub fn new(config: &ImageryConfig) -> ImageryResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.catalog_timeout_secs))
            .build()
            .map_err(|e| ImageryError::Internal(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.catalog_url.trim_end_matches('/').to_string(),
            api_key: config.catalog_api_key.clone(),
            search_limit: config.search_limit,
            default_time_buffer: config.default_time_buffer,
        })
    }

    /// Search the catalog for captures of a constellation inside the
    /// symmetric window `[timestamp - buffer, timestamp + buffer]`
    /// intersecting `bbox`.
    ///
    /// WorldView is searched through [`Self::search_worldview_raw`]
    /// because its raw records need pairing before they become
    /// captures.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        constellation: Constellation,
        timestamp: DateTime<Utc>,
        bbox: BoundingBox,
        time_buffer: Option<Duration>,
    ) -> ImageryResult<Vec<CaptureRecord>> {
        if constellation == Constellation::WorldView {
            return Err(ImageryError::InvalidParameter {
                param: "constellation".to_string(),
                message: "WorldView captures are resolved from raw records".to_string(),
            });
        }

        let features = self
            .search_features(collections_for(constellation), timestamp, bbox, time_buffer)
            .await?;

        let mut records = Vec::new();
        for feature in &features {
            records.extend(normalize_feature(constellation, feature));
        }

        debug!(
            constellation = %constellation,
            features = features.len(),
            records = records.len(),
            "catalog search normalized"
        );
        Ok(records)
    }

    /// Search the WorldView catalog and return raw per-instrument
    /// records for the pairing engine.
    #[instrument(skip(self))]
    pub async fn search_worldview_raw(
        &self,
        timestamp: DateTime<Utc>,
        bbox: BoundingBox,
        time_buffer: Option<Duration>,
    ) -> ImageryResult<Vec<WorldViewRecord>> {
        let features = self
            .search_features(
                collections_for(Constellation::WorldView),
                timestamp,
                bbox,
                time_buffer,
            )
            .await?;

        Ok(features
            .iter()
            .filter_map(worldview::record_from_feature)
            .collect())
    }

    async fn search_features(
        &self,
        collections: &[&str],
        timestamp: DateTime<Utc>,
        bbox: BoundingBox,
        time_buffer: Option<Duration>,
    ) -> ImageryResult<Vec<StacFeature>> {
        let buffer = time_buffer.unwrap_or(self.default_time_buffer);
        let body = SearchBody {
            bbox: bbox.to_stac_array(),
            datetime: format!(
                "{}/{}",
                format_timestamp(&(timestamp - buffer)),
                format_timestamp(&(timestamp + buffer))
            ),
            collections,
            limit: self.search_limit,
        };

        let url = format!("{}/search", self.base_url);
        let mut request = self.http.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        // Single attempt per request; retry policy belongs to the caller.
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ImageryError::Timeout
            } else {
                ImageryError::UpstreamCatalog(e.to_string())
            }
        })?;

        let response = response
            .error_for_status()
            .map_err(|e| ImageryError::UpstreamCatalog(e.to_string()))?;

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ImageryError::UpstreamCatalog(format!("bad search response: {}", e)))?;

        Ok(parsed.features)
    }
}

#[derive(Debug, Serialize)]
struct SearchBody<'a> {
    bbox: [f64; 4],
    datetime: String,
    collections: &'a [&'a str],
    limit: u32,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    features: Vec<StacFeature>,
}

/// One feature of a STAC FeatureCollection, with every field the
/// catalog might omit modelled as optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StacFeature {
    pub id: Option<String>,
    pub collection: Option<String>,
    pub bbox: Option<Vec<f64>>,
    #[serde(default)]
    pub properties: StacProperties,
    #[serde(default)]
    pub assets: HashMap<String, StacAsset>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StacProperties {
    pub datetime: Option<String>,
    #[serde(rename = "eo:cloud_cover")]
    pub cloud_cover: Option<f64>,
    #[serde(default)]
    pub instruments: Vec<String>,
    pub mission: Option<String>,
    #[serde(rename = "nitf:compression")]
    pub nitf_compression: Option<String>,
    #[serde(rename = "nitf:image_representation")]
    pub nitf_image_representation: Option<String>,
    #[serde(rename = "nitf:bits_per_pixel")]
    pub nitf_bits_per_pixel: Option<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StacAsset {
    pub href: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
}

impl StacAsset {
    /// Directly-tileable raster formats are cheaper to serve; the
    /// resolver prefers them on timestamp ties.
    pub fn is_tileable(&self) -> bool {
        match &self.media_type {
            Some(t) => t.contains("tiff"),
            None => self
                .href
                .as_deref()
                .map(|h| h.ends_with(".tif") || h.ends_with(".tiff"))
                .unwrap_or(false),
        }
    }
}

/// Normalize one catalog feature into capture records, one per known
/// spectral asset. A feature missing any required field is logged and
/// skipped; it never aborts the batch.
pub fn normalize_feature(
    constellation: Constellation,
    feature: &StacFeature,
) -> Vec<CaptureRecord> {
    let id = feature.id.as_deref().unwrap_or("<no id>");

    let Some(collection) = feature.collection.as_deref() else {
        warn!(feature = id, "skipping feature without collection");
        return Vec::new();
    };

    let Some(level) = level_for_collection(collection) else {
        warn!(feature = id, collection, "skipping feature from unknown collection");
        return Vec::new();
    };

    let Some(bbox) = feature
        .bbox
        .as_deref()
        .and_then(BoundingBox::from_stac_array)
    else {
        warn!(feature = id, "skipping feature without usable bbox");
        return Vec::new();
    };

    let Some(timestamp) = feature
        .properties
        .datetime
        .as_deref()
        .and_then(|s| parse_timestamp(s).ok())
    else {
        warn!(feature = id, "skipping feature without usable datetime");
        return Vec::new();
    };

    if feature.assets.is_empty() {
        warn!(feature = id, "skipping feature without assets");
        return Vec::new();
    }

    let cloud_cover = feature.properties.cloud_cover.unwrap_or(0.0) as f32;
    let bits_per_pixel = feature
        .properties
        .nitf_bits_per_pixel
        .unwrap_or_else(|| default_bits_per_pixel(constellation));

    let mut records = Vec::new();
    for (key, asset) in &feature.assets {
        if !is_known_spectrum(key) {
            continue;
        }
        let Some(href) = asset.href.as_deref() else {
            warn!(feature = id, asset = %key, "skipping asset without href");
            continue;
        };

        records.push(CaptureRecord {
            constellation,
            timestamp,
            bbox,
            uri: href.to_string(),
            pan_uri: None,
            bits_per_pixel,
            cloud_cover,
            collection: collection.to_string(),
            level: Some(level),
            spectrum: Some(key.clone()),
            tileable: asset.is_tileable(),
        });
    }
    records
}

//! Core value types for capture resolution and rendering.

use crate::{BoundingBox, TileCoord};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Satellite constellations served by the capture pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Constellation {
    Landsat8,
    Sentinel2,
    Planet,
    WorldView,
}

impl Constellation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Constellation::Landsat8 => "L8",
            Constellation::Sentinel2 => "S2",
            Constellation::Planet => "PL",
            Constellation::WorldView => "WV",
        }
    }
}

impl FromStr for Constellation {
    type Err = ConstellationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "L8" | "LANDSAT" | "LANDSAT8" => Ok(Constellation::Landsat8),
            "S2" | "SENTINEL2" | "SENTINEL-2" => Ok(Constellation::Sentinel2),
            "PL" | "PLANET" => Ok(Constellation::Planet),
            "WV" | "WORLDVIEW" => Ok(Constellation::WorldView),
            _ => Err(ConstellationParseError(s.to_string())),
        }
    }
}

impl fmt::Display for Constellation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unsupported constellation: {0}")]
pub struct ConstellationParseError(pub String);

/// Processing level of a catalog collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessingLevel {
    /// Top-of-atmosphere / level 1
    L1,
    /// Surface reflectance / level 2
    L2,
}

impl FromStr for ProcessingLevel {
    type Err = LevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "1" | "L1" => Ok(ProcessingLevel::L1),
            "2" | "L2" => Ok(ProcessingLevel::L2),
            _ => Err(LevelParseError(s.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown processing level: {0}")]
pub struct LevelParseError(pub String);

/// One source image asset resolved from a catalog.
///
/// Immutable once constructed. `uri` always locates exactly one single-
/// or multi-band raster; `pan_uri`, when present, covers an intersecting
/// footprint captured within the pan pairing window of `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub constellation: Constellation,
    pub timestamp: DateTime<Utc>,
    pub bbox: BoundingBox,
    /// Locator for the main raster asset
    pub uri: String,
    /// Matched panchromatic asset (WorldView only)
    pub pan_uri: Option<String>,
    pub bits_per_pixel: u8,
    /// Percent cloud cover, 0 when the catalog does not report it
    pub cloud_cover: f32,
    /// Catalog collection identifier the record came from
    pub collection: String,
    pub level: Option<ProcessingLevel>,
    /// Spectral band name of the selected asset ("visual", "B04", ...)
    pub spectrum: Option<String>,
    /// Whether the primary asset is a directly-tileable raster format
    pub tileable: bool,
}

/// Everything needed to pick one capture out of the catalogs.
#[derive(Debug, Clone)]
pub struct ResolutionQuery {
    pub bbox: BoundingBox,
    pub timestamp: DateTime<Utc>,
    pub constellation: Constellation,
    pub level: Option<ProcessingLevel>,
    pub spectrum: Option<String>,
    /// Candidate window in days around `timestamp`. `Some(-1)` widens
    /// the search to the maximum window with no post-filtering; `None`
    /// uses the configured default buffer.
    pub day_range: Option<i64>,
    /// Only accept captures with a panchromatic pairing (WorldView)
    pub require_pan: bool,
}

/// The chosen capture plus the originally requested timestamp.
///
/// The endpoint compares the two to decide redirect-vs-serve.
#[derive(Debug, Clone)]
pub struct ResolvedCapture {
    pub capture: CaptureRecord,
    pub target: DateTime<Utc>,
}

impl ResolvedCapture {
    /// True when the capture's timestamp matches the request exactly.
    ///
    /// Compared at second granularity, the precision of the canonical
    /// timestamp form. A finer comparison would send a sub-second
    /// capture into a redirect whose target can never match.
    pub fn is_exact(&self) -> bool {
        self.capture.timestamp.trunc_subsecs(0) == self.target.trunc_subsecs(0)
    }
}

/// Output geometry for a render: a slippy-map tile or an explicit bbox.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderGeometry {
    Tile(TileCoord),
    Bbox(BoundingBox),
}

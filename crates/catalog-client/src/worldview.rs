//! Raw WorldView catalog records.
//!
//! WorldView search results arrive as individual single-instrument
//! images; the pairing engine in the `capture` crate reassembles them
//! into sharpenable captures. This module only extracts and types the
//! raw records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use imagery_common::{parse_timestamp, BoundingBox};

use crate::stac::StacFeature;

/// Instrument tag on a raw WorldView image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instrument {
    VisMulti,
    Panchromatic,
}

/// WorldView/GeoEye missions, best sensor first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mission {
    WV04,
    WV03,
    WV02,
    GE01,
    WV01,
}

/// Quality ordering used by the dedup binning pass.
pub const MISSION_PREFERENCE: [Mission; 5] = [
    Mission::WV04,
    Mission::WV03,
    Mission::WV02,
    Mission::GE01,
    Mission::WV01,
];

impl Mission {
    pub fn from_tag(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "WV04" | "WORLDVIEW-4" => Some(Mission::WV04),
            "WV03" | "WORLDVIEW-3" => Some(Mission::WV03),
            "WV02" | "WORLDVIEW-2" => Some(Mission::WV02),
            "GE01" | "GEOEYE-1" => Some(Mission::GE01),
            "WV01" | "WORLDVIEW-1" => Some(Mission::WV01),
            _ => None,
        }
    }
}

/// NITF image representation of the multispectral payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Representation {
    Rgb,
    Multi,
}

/// One raw WorldView image straight out of the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldViewRecord {
    pub timestamp: DateTime<Utc>,
    pub bbox: BoundingBox,
    pub uri: String,
    pub instrument: Instrument,
    pub mission: Mission,
    pub representation: Representation,
    /// NITF compression tag; `None`/"NC" means uncompressed
    pub compression: Option<String>,
    pub bits_per_pixel: u8,
    pub cloud_cover: f32,
}

impl WorldViewRecord {
    /// Only unprocessed/no-compression encodings are usable for
    /// compositing; everything else is discarded before pairing.
    pub fn is_uncompressed(&self) -> bool {
        matches!(self.compression.as_deref(), None | Some("NC"))
    }
}

/// Extract a raw record from a catalog feature, or skip it (logged)
/// when a required field is missing or unrecognized.
pub fn record_from_feature(feature: &StacFeature) -> Option<WorldViewRecord> {
    let id = feature.id.as_deref().unwrap_or("<no id>");

    let bbox = match feature.bbox.as_deref().and_then(BoundingBox::from_stac_array) {
        Some(b) => b,
        None => {
            warn!(feature = id, "skipping WorldView feature without usable bbox");
            return None;
        }
    };

    let timestamp = match feature
        .properties
        .datetime
        .as_deref()
        .and_then(|s| parse_timestamp(s).ok())
    {
        Some(t) => t,
        None => {
            warn!(feature = id, "skipping WorldView feature without usable datetime");
            return None;
        }
    };

    let instrument = match feature.properties.instruments.first().map(String::as_str) {
        Some("vis-multi") => Instrument::VisMulti,
        Some("panchromatic") => Instrument::Panchromatic,
        other => {
            warn!(feature = id, instrument = ?other, "skipping WorldView feature with unknown instrument");
            return None;
        }
    };

    let mission = match feature.properties.mission.as_deref().and_then(Mission::from_tag) {
        Some(m) => m,
        None => {
            warn!(feature = id, "skipping WorldView feature with unknown mission");
            return None;
        }
    };

    let representation = match feature
        .properties
        .nitf_image_representation
        .as_deref()
        .map(str::to_uppercase)
        .as_deref()
    {
        Some("RGB") => Representation::Rgb,
        // Panchromatic images carry MONO; fold it in with MULTI since
        // representation only ranks vis-multi captures.
        Some("MULTI") | Some("MONO") | None => Representation::Multi,
        Some(other) => {
            warn!(feature = id, representation = other, "skipping WorldView feature with unknown representation");
            return None;
        }
    };

    let uri = match feature.assets.get("data").and_then(|a| a.href.clone()) {
        Some(u) => u,
        None => {
            warn!(feature = id, "skipping WorldView feature without data asset");
            return None;
        }
    };

    Some(WorldViewRecord {
        timestamp,
        bbox,
        uri,
        instrument,
        mission,
        representation,
        compression: feature.properties.nitf_compression.clone(),
        bits_per_pixel: feature.properties.nitf_bits_per_pixel.unwrap_or(16),
        cloud_cover: feature.properties.cloud_cover.unwrap_or(0.0) as f32,
    })
}

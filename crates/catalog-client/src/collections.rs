//! Static catalog collection tables.
//!
//! Maps constellations to the catalog collections searched for them,
//! and collections back to their processing level. Unknown collections
//! are skipped during normalization rather than failing a search.

use imagery_common::{Constellation, ProcessingLevel};

/// Catalog collections searched for each constellation.
pub fn collections_for(constellation: Constellation) -> &'static [&'static str] {
    match constellation {
        Constellation::Landsat8 => &["landsat-c2l1", "landsat-c2l2-sr"],
        Constellation::Sentinel2 => &["sentinel-2-l1c", "sentinel-2-l2a"],
        Constellation::Planet => &["planet-dove", "planet-dove-sr"],
        Constellation::WorldView => &["worldview-nitf"],
    }
}

/// Processing level associated with a catalog collection.
pub fn level_for_collection(collection: &str) -> Option<ProcessingLevel> {
    match collection {
        "landsat-c2l1" | "sentinel-2-l1c" | "planet-dove" | "worldview-nitf" => {
            Some(ProcessingLevel::L1)
        }
        "landsat-c2l2-sr" | "sentinel-2-l2a" | "planet-dove-sr" => Some(ProcessingLevel::L2),
        _ => None,
    }
}

/// Native bit depth assumed for a constellation when the catalog does
/// not report one.
pub fn default_bits_per_pixel(constellation: Constellation) -> u8 {
    match constellation {
        Constellation::Planet => 8,
        Constellation::Landsat8 | Constellation::Sentinel2 | Constellation::WorldView => 16,
    }
}

/// Whether an asset key names a spectrum we serve.
///
/// The "visual" composite counts as its own spectrum regardless of how
/// many bands the asset actually carries.
pub fn is_known_spectrum(key: &str) -> bool {
    if key == "visual" || key == "pan" {
        return true;
    }
    if matches!(key, "red" | "green" | "blue" | "nir" | "swir16" | "swir22") {
        return true;
    }
    // Sentinel/Landsat style band codes: B01..B12, B8A
    let mut chars = key.chars();
    chars.next() == Some('B') && key.len() >= 2 && chars.all(|c| c.is_ascii_alphanumeric())
}

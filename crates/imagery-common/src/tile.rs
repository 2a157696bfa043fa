//! Slippy-map (XYZ) tile addressing in Web Mercator.

use crate::BoundingBox;
use serde::{Deserialize, Serialize};

/// Canonical output tile size in pixels.
pub const TILE_SIZE: u32 = 512;

/// Half the extent of the Web Mercator projection plane in meters.
pub const MERCATOR_EXTENT: f64 = 20037508.342789244;

/// A tile coordinate (z/x/y) in the WebMercatorQuad scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y), counted from the north
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Whether x/y fall inside the matrix for this zoom level.
    pub fn is_valid(&self) -> bool {
        let n = 1u64 << self.z.min(31);
        (self.x as u64) < n && (self.y as u64) < n
    }

    /// Bounding box of this tile in Web Mercator meters (EPSG:3857).
    pub fn bbox_3857(&self) -> BoundingBox {
        let n = (1u64 << self.z) as f64;
        let span = 2.0 * MERCATOR_EXTENT / n;

        let min_x = -MERCATOR_EXTENT + self.x as f64 * span;
        let max_y = MERCATOR_EXTENT - self.y as f64 * span;

        BoundingBox::new(min_x, max_y - span, min_x + span, max_y)
    }

    /// Bounding box of this tile in geographic lon/lat degrees (EPSG:4326).
    pub fn bbox_4326(&self) -> BoundingBox {
        let m = self.bbox_3857();
        let (min_lon, min_lat) = mercator_to_lonlat(m.min_x, m.min_y);
        let (max_lon, max_lat) = mercator_to_lonlat(m.max_x, m.max_y);
        BoundingBox::new(min_lon, min_lat, max_lon, max_lat)
    }
}

/// Convert Web Mercator meters to lon/lat degrees.
pub fn mercator_to_lonlat(x: f64, y: f64) -> (f64, f64) {
    let lon = x / MERCATOR_EXTENT * 180.0;
    let lat = (y / MERCATOR_EXTENT * std::f64::consts::PI)
        .exp()
        .atan()
        .to_degrees()
        * 2.0
        - 90.0;
    (lon, lat)
}

/// Convert lon/lat degrees to Web Mercator meters.
pub fn lonlat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let x = lon / 180.0 * MERCATOR_EXTENT;
    let lat_rad = lat.to_radians();
    let y = ((std::f64::consts::FRAC_PI_4 + lat_rad / 2.0).tan()).ln() / std::f64::consts::PI
        * MERCATOR_EXTENT;
    (x, y)
}

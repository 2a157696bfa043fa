//! Common types and utilities shared across all capture-tiles services.

pub mod bbox;
pub mod config;
pub mod error;
pub mod time;
pub mod tile;
pub mod types;

pub use bbox::BoundingBox;
pub use config::ImageryConfig;
pub use error::{ImageryError, ImageryResult};
pub use tile::{TileCoord, TILE_SIZE};
pub use time::{format_timestamp, parse_timestamp};
pub use types::{
    CaptureRecord, Constellation, ProcessingLevel, RenderGeometry, ResolutionQuery,
    ResolvedCapture,
};

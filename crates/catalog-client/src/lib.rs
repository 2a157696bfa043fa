//! STAC catalog search client and response normalization.
//!
//! Queries an external STAC-compatible search endpoint over HTTP and
//! turns its loosely-structured feature JSON into typed
//! [`CaptureRecord`]s, skipping malformed features instead of failing
//! the whole batch.

pub mod collections;
pub mod stac;
pub mod worldview;

pub use stac::{StacFeature, StacSearchClient};
pub use worldview::{Instrument, Mission, Representation, WorldViewRecord, MISSION_PREFERENCE};

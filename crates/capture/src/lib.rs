//! Capture selection: WorldView pair reconstruction and the
//! temporally-closest capture resolver.

pub mod pairing;
pub mod resolver;

pub use pairing::pair_worldview;
pub use resolver::{CaptureResolver, CatalogSearch};

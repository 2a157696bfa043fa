//! Tile/bbox API service library.
//!
//! Exposes the router and internal modules for testing.

pub mod handlers;
pub mod metrics;
pub mod state;

use axum::{extract::Extension, routing::get, Router};
use std::sync::Arc;

use state::AppState;

/// Build the API router. Observability layers and the Prometheus
/// endpoint are added by the binary's main.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/tiles/:z/:x/:y", get(handlers::tile_handler))
        .route("/bbox", get(handlers::bbox_handler))
        .route("/health", get(handlers::health_handler))
        .layer(Extension(state))
}

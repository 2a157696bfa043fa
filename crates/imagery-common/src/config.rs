//! Runtime configuration for the capture pipeline.
//!
//! Collects the knobs that would otherwise be scattered through call
//! signatures (buffer durations, windows, rescale constants) into one
//! struct passed down the resolver/compositor chain.

use chrono::Duration;
use std::env;

/// Configuration shared by the catalog client, resolver, and compositor.
#[derive(Debug, Clone)]
pub struct ImageryConfig {
    /// STAC search endpoint base URL (no trailing slash)
    pub catalog_url: String,
    /// API key sent as `x-api-key` when present
    pub catalog_api_key: Option<String>,
    /// Timeout for catalog search requests, seconds
    pub catalog_timeout_secs: u64,
    /// Timeout for remote raster asset reads, seconds
    pub raster_timeout_secs: u64,
    /// Symmetric search window when the caller gives no day range
    pub default_time_buffer: Duration,
    /// Widest search window, used when the caller disables filtering
    pub max_time_buffer: Duration,
    /// Max distance between a vis-multi image and its panchromatic match
    pub pan_pairing_window: Duration,
    /// Near-duplicate suppression window for WorldView binning
    pub dedup_window: Duration,
    /// Output tile edge length in pixels
    pub tile_size: u32,
    /// Cache lifetime for exact-timestamp responses, seconds
    pub exact_cache_ttl_secs: u64,
    /// Maximum number of features requested per catalog search
    pub search_limit: u32,
}

impl Default for ImageryConfig {
    fn default() -> Self {
        Self {
            catalog_url: "http://stac:8081".to_string(),
            catalog_api_key: None,
            catalog_timeout_secs: 5,
            raster_timeout_secs: 30,
            default_time_buffer: Duration::hours(1),
            max_time_buffer: Duration::days(30),
            pan_pairing_window: Duration::hours(1),
            dedup_window: Duration::days(1),
            tile_size: crate::TILE_SIZE,
            exact_cache_ttl_secs: 365 * 24 * 3600,
            search_limit: 100,
        }
    }
}

impl ImageryConfig {
    /// Build configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            catalog_url: env::var("CATALOG_URL").unwrap_or(defaults.catalog_url),
            catalog_api_key: env::var("CATALOG_API_KEY").ok().filter(|k| !k.is_empty()),
            catalog_timeout_secs: env_u64("CATALOG_TIMEOUT_SECS", defaults.catalog_timeout_secs),
            raster_timeout_secs: env_u64("RASTER_TIMEOUT_SECS", defaults.raster_timeout_secs),
            default_time_buffer: Duration::hours(env_u64("DEFAULT_TIME_BUFFER_HOURS", 1) as i64),
            max_time_buffer: Duration::days(env_u64("MAX_TIME_BUFFER_DAYS", 30) as i64),
            pan_pairing_window: Duration::hours(env_u64("PAN_PAIRING_WINDOW_HOURS", 1) as i64),
            dedup_window: Duration::days(env_u64("DEDUP_WINDOW_DAYS", 1) as i64),
            tile_size: env_u64("TILE_SIZE", crate::TILE_SIZE as u64) as u32,
            exact_cache_ttl_secs: env_u64("EXACT_CACHE_TTL_SECS", defaults.exact_cache_ttl_secs),
            search_limit: env_u64("CATALOG_SEARCH_LIMIT", defaults.search_limit as u64) as u32,
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

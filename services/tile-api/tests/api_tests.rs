//! Endpoint tests against an in-memory catalog and asset store.

use async_trait::async_trait;
use axum::body::to_bytes;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use chrono::{DateTime, Duration, TimeZone, Utc};
use image::{DynamicImage, ImageBuffer, Rgb};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use tower::ServiceExt;

use capture::CatalogSearch;
use catalog_client::worldview::WorldViewRecord;
use compositor::{AssetFetcher, FetchError};
use imagery_common::{
    BoundingBox, CaptureRecord, Constellation, ImageryConfig, ImageryResult, ProcessingLevel,
};
use tile_api::state::AppState;

/// Catalog stub applying the same bbox/time filtering a real STAC
/// backend would.
struct StubCatalog {
    captures: Vec<CaptureRecord>,
}

#[async_trait]
impl CatalogSearch for StubCatalog {
    async fn search(
        &self,
        constellation: Constellation,
        timestamp: DateTime<Utc>,
        bbox: BoundingBox,
        time_buffer: Option<Duration>,
    ) -> ImageryResult<Vec<CaptureRecord>> {
        let buffer = time_buffer.unwrap_or_else(|| Duration::hours(1));
        Ok(self
            .captures
            .iter()
            .filter(|c| c.constellation == constellation)
            .filter(|c| c.bbox.intersects(&bbox))
            .filter(|c| (c.timestamp - timestamp).abs() <= buffer)
            .cloned()
            .collect())
    }

    async fn search_worldview_raw(
        &self,
        _timestamp: DateTime<Utc>,
        _bbox: BoundingBox,
        _time_buffer: Option<Duration>,
    ) -> ImageryResult<Vec<WorldViewRecord>> {
        Ok(Vec::new())
    }
}

struct MemoryFetcher {
    assets: HashMap<String, Bytes>,
}

#[async_trait]
impl AssetFetcher for MemoryFetcher {
    async fn fetch(&self, uri: &str) -> Result<Bytes, FetchError> {
        self.assets.get(uri).cloned().ok_or_else(|| FetchError {
            uri: uri.to_string(),
            message: "connection refused".to_string(),
        })
    }
}

fn gradient_png(w: u32, h: u32) -> Bytes {
    let img: ImageBuffer<Rgb<u16>, Vec<u16>> = ImageBuffer::from_fn(w, h, |x, y| {
        let v = ((x + y) * 400) as u16;
        Rgb([v, v / 2 + 100, v / 4 + 50])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb16(img)
        .write_to(&mut buf, image::ImageOutputFormat::Png)
        .unwrap();
    Bytes::from(buf.into_inner())
}

/// The canonical Sentinel-2 capture: 2024-03-04T10:00:00Z over a
/// footprint straddling the equator.
fn s2_capture() -> CaptureRecord {
    CaptureRecord {
        constellation: Constellation::Sentinel2,
        timestamp: Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap(),
        bbox: BoundingBox::new(-20.0, -20.0, 20.0, 20.0),
        uri: "mem://s2.png".to_string(),
        pan_uri: None,
        bits_per_pixel: 16,
        cloud_cover: 4.5,
        collection: "sentinel-2-l2a".to_string(),
        level: Some(ProcessingLevel::L2),
        spectrum: Some("visual".to_string()),
        tileable: true,
    }
}

fn app() -> axum::Router {
    let mut config = ImageryConfig::default();
    config.tile_size = 64; // keep test renders small

    let catalog = Arc::new(StubCatalog {
        captures: vec![s2_capture()],
    });
    let fetcher = Arc::new(MemoryFetcher {
        assets: HashMap::from([("mem://s2.png".to_string(), gradient_png(64, 64))]),
    });

    tile_api::router(Arc::new(AppState::with_components(config, catalog, fetcher)))
}

async fn get(app: axum::Router, uri: &str) -> axum::http::Response<axum::body::Body> {
    app.oneshot(Request::get(uri).body(axum::body::Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_exact_timestamp_serves_tile_bytes() {
    let response = get(
        app(),
        "/tiles/0/0/0?constellation=S2&timestamp=2024-03-04T10:00:00Z",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/webp");
    let cache = response.headers()["cache-control"].to_str().unwrap();
    assert!(cache.contains("max-age=31536000"), "got {}", cache);
    assert_eq!(response.headers()["x-cloud-cover"], "4.5");

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..4], b"RIFF");
}

#[tokio::test]
async fn test_subsecond_capture_serves_on_exact_second_request() {
    // A catalog timestamp carrying fractional seconds must still be
    // servable through its canonical second-granular URL instead of
    // redirecting to itself.
    let mut config = ImageryConfig::default();
    config.tile_size = 64;

    let mut capture = s2_capture();
    capture.timestamp = capture.timestamp + Duration::milliseconds(500);
    let catalog = Arc::new(StubCatalog {
        captures: vec![capture],
    });
    let fetcher = Arc::new(MemoryFetcher {
        assets: HashMap::from([("mem://s2.png".to_string(), gradient_png(64, 64))]),
    });
    let app = tile_api::router(Arc::new(AppState::with_components(config, catalog, fetcher)));

    let response = get(
        app,
        "/tiles/0/0/0?constellation=S2&timestamp=2024-03-04T10:00:00Z",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/webp");
}

#[tokio::test]
async fn test_imprecise_timestamp_redirects_to_exact() {
    // Three days off; only the unbounded window finds the capture.
    let response = get(
        app(),
        "/tiles/0/0/0?constellation=S2&timestamp=2024-03-01T10:00:00Z&day_range=-1",
    )
    .await;

    assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
    let location = response.headers()["location"].to_str().unwrap();
    assert!(location.starts_with("/tiles/0/0/0?"), "got {}", location);
    assert!(
        location.contains("timestamp=2024-03-04T10:00:00Z"),
        "got {}",
        location
    );
    assert!(location.contains("day_range=-1"), "got {}", location);
}

#[tokio::test]
async fn test_imprecise_timestamp_outside_default_window_is_404() {
    // Without day_range only the default one-hour buffer is searched.
    let response = get(
        app(),
        "/tiles/0/0/0?constellation=S2&timestamp=2024-03-01T10:00:00Z",
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_uncovered_area_is_404() {
    // z=4 tile well away from the capture footprint.
    let response = get(
        app(),
        "/tiles/4/15/4?constellation=S2&timestamp=2024-03-04T10:00:00Z",
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_constellation_is_400() {
    let response = get(app(), "/tiles/0/0/0?timestamp=2024-03-04T10:00:00Z").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("constellation"));
}

#[tokio::test]
async fn test_tile_outside_matrix_is_400() {
    let response = get(
        app(),
        "/tiles/1/5/0?constellation=S2&timestamp=2024-03-04T10:00:00Z",
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bbox_endpoint_serves_png() {
    let response = get(
        app(),
        "/bbox?constellation=S2&timestamp=2024-03-04T10:00:00Z&bbox=-10,-10,10,10",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[1..4], b"PNG");
}

#[tokio::test]
async fn test_bbox_redirect_preserves_bbox_parameter() {
    let response = get(
        app(),
        "/bbox?constellation=S2&timestamp=2024-03-03T00:00:00Z&bbox=-10,-10,10,10&day_range=5",
    )
    .await;

    assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
    let location = response.headers()["location"].to_str().unwrap();
    assert!(location.starts_with("/bbox?"), "got {}", location);
    assert!(location.contains("bbox=-10,-10,10,10"), "got {}", location);
    assert!(
        location.contains("timestamp=2024-03-04T10:00:00Z"),
        "got {}",
        location
    );
}

#[tokio::test]
async fn test_malformed_bbox_is_400() {
    let response = get(
        app(),
        "/bbox?constellation=S2&timestamp=2024-03-04T10:00:00Z&bbox=-10,-10,10",
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_bbox_is_400() {
    let response = get(app(), "/bbox?constellation=S2&timestamp=2024-03-04T10:00:00Z").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_rescale_is_400() {
    let response = get(
        app(),
        "/tiles/0/0/0?constellation=S2&timestamp=2024-03-04T10:00:00Z&rescale=bogus",
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_format_override_on_tile() {
    let response = get(
        app(),
        "/tiles/0/0/0?constellation=S2&timestamp=2024-03-04T10:00:00Z&format=png",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");
}

#[tokio::test]
async fn test_health() {
    let response = get(app(), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
}

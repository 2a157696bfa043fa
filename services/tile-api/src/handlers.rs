//! HTTP request handlers for the tile and bbox endpoints.

use axum::{
    body::Body,
    extract::{Extension, Path, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};

use compositor::{OutputFormat, RasterRenderRequest, RescalePolicy};
use imagery_common::{
    format_timestamp, parse_timestamp, BoundingBox, ImageryError, RenderGeometry, ResolutionQuery,
    ResolvedCapture, TileCoord,
};

use crate::metrics;
use crate::state::AppState;

/// Query parameters shared by both endpoints. `bbox` is only
/// meaningful on `/bbox`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaptureQueryParams {
    pub constellation: Option<String>,
    pub timestamp: Option<String>,
    pub level: Option<String>,
    pub spectrum: Option<String>,
    pub day_range: Option<i64>,
    pub rescale: Option<String>,
    pub format: Option<String>,
    pub bbox: Option<String>,
}

/// Fully validated request pieces.
struct ParsedRequest {
    query: ResolutionQuery,
    rescale: Option<RescalePolicy>,
    format: Option<OutputFormat>,
}

#[instrument(skip(state, params))]
pub async fn tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((z, x, y)): Path<(u32, u32, u32)>,
    Query(params): Query<CaptureQueryParams>,
) -> Response {
    metrics::record_request("tile");

    let tile = TileCoord::new(z, x, y);
    if !tile.is_valid() {
        return error_response(&ImageryError::InvalidParameter {
            param: "z/x/y".to_string(),
            message: format!("tile {}/{}/{} outside matrix", z, x, y),
        });
    }

    let parsed = match parse_request(&params, tile.bbox_4326()) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };

    let resolved = match state.resolver.resolve(&parsed.query).await {
        Ok(r) => r,
        Err(e) => return error_response(&e),
    };

    if !resolved.is_exact() {
        let exact = format_timestamp(&resolved.capture.timestamp);
        let location = format!("/tiles/{}/{}/{}?{}", z, x, y, redirect_query(&params, &exact));
        return redirect_response(location);
    }

    render_response(&state, resolved, RenderGeometry::Tile(tile), &parsed).await
}

#[instrument(skip(state, params))]
pub async fn bbox_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<CaptureQueryParams>,
) -> Response {
    metrics::record_request("bbox");

    let bbox = match &params.bbox {
        Some(raw) => match BoundingBox::from_query_string(raw) {
            Ok(b) => b,
            Err(e) => return error_response(&ImageryError::from(e)),
        },
        None => return error_response(&ImageryError::MissingParameter("bbox".to_string())),
    };

    let parsed = match parse_request(&params, bbox) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };

    let resolved = match state.resolver.resolve(&parsed.query).await {
        Ok(r) => r,
        Err(e) => return error_response(&e),
    };

    if !resolved.is_exact() {
        let exact = format_timestamp(&resolved.capture.timestamp);
        let location = format!("/bbox?{}", redirect_query(&params, &exact));
        return redirect_response(location);
    }

    render_response(&state, resolved, RenderGeometry::Bbox(bbox), &parsed).await
}

pub async fn health_handler() -> Response {
    Json(serde_json::json!({ "status": "ok" })).into_response()
}

/// Validate the common query parameters into a resolution query.
fn parse_request(
    params: &CaptureQueryParams,
    bbox: BoundingBox,
) -> Result<ParsedRequest, ImageryError> {
    let constellation = params
        .constellation
        .as_deref()
        .ok_or_else(|| ImageryError::MissingParameter("constellation".to_string()))?
        .parse()?;

    let timestamp = parse_timestamp(
        params
            .timestamp
            .as_deref()
            .ok_or_else(|| ImageryError::MissingParameter("timestamp".to_string()))?,
    )?;

    let level = params.level.as_deref().map(str::parse).transpose()?;

    let rescale = params
        .rescale
        .as_deref()
        .map(parse_rescale)
        .transpose()?;

    let format = params
        .format
        .as_deref()
        .map(|f| {
            f.parse::<OutputFormat>()
                .map_err(|e| ImageryError::UnsupportedFormat(e.0))
        })
        .transpose()?;

    Ok(ParsedRequest {
        query: ResolutionQuery {
            bbox,
            timestamp,
            constellation,
            level,
            spectrum: params.spectrum.clone(),
            day_range: params.day_range,
            require_pan: false,
        },
        rescale,
        format,
    })
}

/// Rescale parameter: "fixed", "percentile", or an explicit "low,high".
fn parse_rescale(raw: &str) -> Result<RescalePolicy, ImageryError> {
    match raw.to_lowercase().as_str() {
        "fixed" => return Ok(RescalePolicy::FixedRange),
        "percentile" => return Ok(RescalePolicy::PercentileStretch),
        _ => {}
    }

    let invalid = || ImageryError::InvalidParameter {
        param: "rescale".to_string(),
        message: format!("expected 'fixed', 'percentile', or 'low,high', got '{}'", raw),
    };

    let (low, high) = raw.split_once(',').ok_or_else(invalid)?;
    let low: u16 = low.trim().parse().map_err(|_| invalid())?;
    let high: u16 = high.trim().parse().map_err(|_| invalid())?;
    if low >= high {
        return Err(invalid());
    }
    Ok(RescalePolicy::Range(low, high))
}

async fn render_response(
    state: &AppState,
    resolved: ResolvedCapture,
    geometry: RenderGeometry,
    parsed: &ParsedRequest,
) -> Response {
    let timer = Instant::now();

    info!(
        uri = %resolved.capture.uri,
        timestamp = %resolved.capture.timestamp,
        "rendering capture"
    );

    let request = RasterRenderRequest {
        capture: resolved.capture,
        geometry,
        format: parsed.format,
        rescale: parsed.rescale,
    };

    match state.compositor.render(&request).await {
        Ok(rendered) => {
            metrics::record_render(timer.elapsed(), true);
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, rendered.content_type)
                .header(
                    header::CACHE_CONTROL,
                    format!(
                        "public, max-age={}, immutable",
                        state.config.exact_cache_ttl_secs
                    ),
                )
                // Metadata the persistence layer stores with the bytes
                .header("x-cloud-cover", rendered.cloud_cover.to_string())
                .header("x-source-uri", rendered.source_uri)
                .body(rendered.bytes.into())
                .unwrap()
        }
        Err(e) => {
            metrics::record_render(timer.elapsed(), false);
            error!(error = %e, "rendering failed");
            error_response(&ImageryError::from(e))
        }
    }
}

/// Rebuild the original query string with the timestamp replaced by
/// the capture's exact timestamp. Exact-timestamp URLs are cacheable
/// indefinitely downstream; imprecise requests always re-resolve.
fn redirect_query(params: &CaptureQueryParams, exact_timestamp: &str) -> String {
    let mut pairs: Vec<String> = Vec::new();

    if let Some(c) = &params.constellation {
        pairs.push(format!("constellation={}", c));
    }
    pairs.push(format!("timestamp={}", exact_timestamp));
    if let Some(b) = &params.bbox {
        pairs.push(format!("bbox={}", b));
    }
    if let Some(l) = &params.level {
        pairs.push(format!("level={}", l));
    }
    if let Some(s) = &params.spectrum {
        // Spectrum is the only echoed value that never went through a
        // validating parser, so it can carry reserved characters.
        pairs.push(format!("spectrum={}", urlencoding::encode(s)));
    }
    if let Some(d) = params.day_range {
        pairs.push(format!("day_range={}", d));
    }
    if let Some(r) = &params.rescale {
        pairs.push(format!("rescale={}", r));
    }
    if let Some(f) = &params.format {
        pairs.push(format!("format={}", f));
    }

    pairs.join("&")
}

fn redirect_response(location: String) -> Response {
    metrics::record_redirect();
    Response::builder()
        .status(StatusCode::PERMANENT_REDIRECT)
        .header(header::LOCATION, location)
        .body(Body::empty())
        .unwrap()
}

fn error_response(err: &ImageryError) -> Response {
    let status = StatusCode::from_u16(err.http_status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rescale_named() {
        assert_eq!(parse_rescale("fixed").unwrap(), RescalePolicy::FixedRange);
        assert_eq!(
            parse_rescale("percentile").unwrap(),
            RescalePolicy::PercentileStretch
        );
    }

    #[test]
    fn test_parse_rescale_range() {
        assert_eq!(parse_rescale("0,4000").unwrap(), RescalePolicy::Range(0, 4000));
        assert!(parse_rescale("4000,0").is_err());
        assert!(parse_rescale("a,b").is_err());
        assert!(parse_rescale("linear").is_err());
    }

    #[test]
    fn test_redirect_query_escapes_spectrum() {
        let params = CaptureQueryParams {
            constellation: Some("S2".to_string()),
            timestamp: Some("2024-03-01".to_string()),
            spectrum: Some("near&far=1".to_string()),
            ..Default::default()
        };
        let qs = redirect_query(&params, "2024-03-04T10:00:00Z");
        assert_eq!(
            qs,
            "constellation=S2&timestamp=2024-03-04T10:00:00Z&spectrum=near%26far%3D1"
        );
    }

    #[test]
    fn test_redirect_query_replaces_timestamp_only() {
        let params = CaptureQueryParams {
            constellation: Some("S2".to_string()),
            timestamp: Some("2024-03-01".to_string()),
            level: Some("2".to_string()),
            day_range: Some(-1),
            ..Default::default()
        };
        let qs = redirect_query(&params, "2024-03-04T10:00:00Z");
        assert_eq!(
            qs,
            "constellation=S2&timestamp=2024-03-04T10:00:00Z&level=2&day_range=-1"
        );
    }
}

//! Window extraction from decoded rasters.
//!
//! Sources are georeferenced only by their footprint bbox: pixel (0,0)
//! is the north-west corner and rows/columns are linear in lon/lat.
//! Tile extraction additionally undoes the Web Mercator row spacing so
//! output tiles line up with standard slippy-map basemaps.

use image::{DynamicImage, ImageBuffer, Luma, Pixel, Rgb};

use imagery_common::tile::mercator_to_lonlat;
use imagery_common::{BoundingBox, TileCoord};

use crate::RenderError;

pub type Rgb16Image = ImageBuffer<Rgb<u16>, Vec<u16>>;
pub type Gray16Image = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Largest edge length produced for a bbox render at native resolution.
const MAX_BBOX_EDGE: u32 = 4096;

/// Widen a decoded asset to 16-bit RGB without changing raw values.
///
/// `DynamicImage::to_rgb16` rescales 8-bit samples to the full 16-bit
/// range, which would break fixed-range rescaling; 8-bit sources keep
/// their raw digital numbers here.
pub fn to_rgb16_preserving(img: &DynamicImage) -> Rgb16Image {
    match img {
        DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_)
        | DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_) => {
            let rgb = img.to_rgb8();
            ImageBuffer::from_fn(rgb.width(), rgb.height(), |x, y| {
                let p = rgb.get_pixel(x, y);
                Rgb([p[0] as u16, p[1] as u16, p[2] as u16])
            })
        }
        other => other.to_rgb16(),
    }
}

/// Same widening for single-band (panchromatic) assets.
pub fn to_gray16_preserving(img: &DynamicImage) -> Gray16Image {
    match img {
        DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_)
        | DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_) => {
            let gray = img.to_luma8();
            ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
                Luma([gray.get_pixel(x, y)[0] as u16])
            })
        }
        other => other.to_luma16(),
    }
}

/// Extract a Web Mercator tile from a geographically-referenced source.
///
/// Pixels outside the source footprint render black; a tile with no
/// source coverage at all is an error, not an empty success.
pub fn extract_tile<P>(
    src: &ImageBuffer<P, Vec<u16>>,
    src_bbox: &BoundingBox,
    tile: TileCoord,
    size: u32,
) -> Result<ImageBuffer<P, Vec<u16>>, RenderError>
where
    P: Pixel<Subpixel = u16> + 'static,
{
    let mbox = tile.bbox_3857();
    let mut out = ImageBuffer::new(size, size);
    let mut covered = 0usize;

    for py in 0..size {
        let my = mbox.max_y - (py as f64 + 0.5) / size as f64 * mbox.height();
        for px in 0..size {
            let mx = mbox.min_x + (px as f64 + 0.5) / size as f64 * mbox.width();
            let (lon, lat) = mercator_to_lonlat(mx, my);
            if let Some(p) = sample_geo(src, src_bbox, lon, lat) {
                out.put_pixel(px, py, p);
                covered += 1;
            }
        }
    }

    if covered == 0 {
        return Err(RenderError::EmptyWindow);
    }
    Ok(out)
}

/// Extract exactly the requested geographic window.
///
/// Output dimensions default to the source's native resolution over
/// the window (capped); pass explicit dimensions to resample, e.g. to
/// match a panchromatic crop to its multispectral counterpart.
pub fn extract_bbox<P>(
    src: &ImageBuffer<P, Vec<u16>>,
    src_bbox: &BoundingBox,
    window: &BoundingBox,
    dimensions: Option<(u32, u32)>,
) -> Result<ImageBuffer<P, Vec<u16>>, RenderError>
where
    P: Pixel<Subpixel = u16> + 'static,
{
    if window.width() <= 0.0 || window.height() <= 0.0 {
        return Err(RenderError::EmptyWindow);
    }
    if !src_bbox.intersects(window) {
        return Err(RenderError::EmptyWindow);
    }

    let (out_w, out_h) = match dimensions {
        Some(d) => d,
        None => native_dimensions(src.width(), src.height(), src_bbox, window),
    };

    let mut out = ImageBuffer::new(out_w, out_h);
    let mut covered = 0usize;

    for py in 0..out_h {
        let lat = window.max_y - (py as f64 + 0.5) / out_h as f64 * window.height();
        for px in 0..out_w {
            let lon = window.min_x + (px as f64 + 0.5) / out_w as f64 * window.width();
            if let Some(p) = sample_geo(src, src_bbox, lon, lat) {
                out.put_pixel(px, py, p);
                covered += 1;
            }
        }
    }

    if covered == 0 {
        return Err(RenderError::EmptyWindow);
    }
    Ok(out)
}

/// Output size matching the source's pixel density over the window.
fn native_dimensions(
    src_w: u32,
    src_h: u32,
    src_bbox: &BoundingBox,
    window: &BoundingBox,
) -> (u32, u32) {
    let px_per_deg_x = src_w as f64 / src_bbox.width();
    let px_per_deg_y = src_h as f64 / src_bbox.height();

    let w = (window.width() * px_per_deg_x).round() as i64;
    let h = (window.height() * px_per_deg_y).round() as i64;

    (
        w.clamp(1, MAX_BBOX_EDGE as i64) as u32,
        h.clamp(1, MAX_BBOX_EDGE as i64) as u32,
    )
}

/// Bilinear sample at a geographic coordinate, `None` outside the
/// source footprint.
fn sample_geo<P>(
    src: &ImageBuffer<P, Vec<u16>>,
    src_bbox: &BoundingBox,
    lon: f64,
    lat: f64,
) -> Option<P>
where
    P: Pixel<Subpixel = u16> + 'static,
{
    if !src_bbox.contains_point(lon, lat) {
        return None;
    }

    let (w, h) = src.dimensions();
    let x = (lon - src_bbox.min_x) / src_bbox.width() * (w.saturating_sub(1)) as f64;
    let y = (src_bbox.max_y - lat) / src_bbox.height() * (h.saturating_sub(1)) as f64;

    sample_bilinear(src, x, y)
}

fn sample_bilinear<P>(src: &ImageBuffer<P, Vec<u16>>, x: f64, y: f64) -> Option<P>
where
    P: Pixel<Subpixel = u16> + 'static,
{
    let (w, h) = src.dimensions();
    if w == 0 || h == 0 {
        return None;
    }
    if x < 0.0 || y < 0.0 || x > (w - 1) as f64 || y > (h - 1) as f64 {
        return None;
    }

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = src.get_pixel(x0, y0).channels();
    let p10 = src.get_pixel(x1, y0).channels();
    let p01 = src.get_pixel(x0, y1).channels();
    let p11 = src.get_pixel(x1, y1).channels();

    let channels = P::CHANNEL_COUNT as usize;
    let mut blended = [0u16; 4];
    for c in 0..channels {
        let top = p00[c] as f64 * (1.0 - fx) + p10[c] as f64 * fx;
        let bottom = p01[c] as f64 * (1.0 - fx) + p11[c] as f64 * fx;
        blended[c] = (top * (1.0 - fy) + bottom * fy).round() as u16;
    }

    Some(*P::from_slice(&blended[..channels]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(w: u32, h: u32, value: u16) -> Rgb16Image {
        ImageBuffer::from_pixel(w, h, Rgb([value, value, value]))
    }

    #[test]
    fn test_bbox_outside_coverage_is_an_error() {
        let src = uniform(16, 16, 1000);
        let src_bbox = BoundingBox::new(10.0, 45.0, 11.0, 46.0);
        let window = BoundingBox::new(50.0, 0.0, 51.0, 1.0);

        let result = extract_bbox(&src, &src_bbox, &window, None);
        assert!(matches!(result, Err(RenderError::EmptyWindow)));
    }

    #[test]
    fn test_degenerate_window_is_an_error() {
        let src = uniform(16, 16, 1000);
        let src_bbox = BoundingBox::new(10.0, 45.0, 11.0, 46.0);
        let window = BoundingBox::new(10.5, 45.5, 10.5, 45.5);

        let result = extract_bbox(&src, &src_bbox, &window, None);
        assert!(matches!(result, Err(RenderError::EmptyWindow)));
    }

    #[test]
    fn test_interior_window_keeps_values() {
        let src = uniform(16, 16, 1234);
        let src_bbox = BoundingBox::new(10.0, 45.0, 11.0, 46.0);
        let window = BoundingBox::new(10.25, 45.25, 10.75, 45.75);

        let out = extract_bbox(&src, &src_bbox, &window, Some((8, 8))).unwrap();
        assert_eq!(out.dimensions(), (8, 8));
        assert!(out.pixels().all(|p| p[0] == 1234));
    }

    #[test]
    fn test_explicit_dimensions_are_honored() {
        let src = uniform(32, 32, 7);
        let src_bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let window = BoundingBox::new(0.1, 0.1, 0.9, 0.9);

        let out = extract_bbox(&src, &src_bbox, &window, Some((21, 13))).unwrap();
        assert_eq!(out.dimensions(), (21, 13));
    }

    #[test]
    fn test_tile_with_no_coverage_is_an_error() {
        let src = uniform(16, 16, 1000);
        // Source sits near the equator; request a tile over Scandinavia.
        let src_bbox = BoundingBox::new(-1.0, -1.0, 1.0, 1.0);
        let tile = TileCoord::new(6, 35, 18);

        let result = extract_tile(&src, &src_bbox, tile, 64);
        assert!(matches!(result, Err(RenderError::EmptyWindow)));
    }

    #[test]
    fn test_world_tile_sees_equator_source() {
        let src = uniform(16, 16, 555);
        let src_bbox = BoundingBox::new(-10.0, -10.0, 10.0, 10.0);

        let out = extract_tile(&src, &src_bbox, TileCoord::new(0, 0, 0), 64).unwrap();
        assert_eq!(out.dimensions(), (64, 64));
        // Center pixels map inside the source, corners are black fill.
        assert_eq!(out.get_pixel(32, 32)[0], 555);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
    }
}

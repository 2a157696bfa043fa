//! Pixel value rescaling to the 8-bit output range.

use image::{ImageBuffer, Rgb, RgbImage};
use tracing::debug;

use crate::raster::Rgb16Image;

/// Reflectance interval used by fixed-range rescaling of multispectral
/// surface reflectance products.
pub const FIXED_REFLECTANCE_RANGE: (u16, u16) = (0, 10_000);

/// Percentiles used by the stretch policy.
const LOW_PERCENTILE: f64 = 0.02;
const HIGH_PERCENTILE: f64 = 0.98;

/// Edge length of the reduced-resolution sampling grid for statistics.
const STATS_SAMPLE_EDGE: u32 = 256;

/// How source pixel values map to the 8-bit output range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RescalePolicy {
    /// Rescale the fixed reflectance interval [0, 10000].
    FixedRange,
    /// Per-band 2nd/98th percentile stretch from source statistics.
    PercentileStretch,
    /// Explicit [low, high] supplied by the caller.
    Range(u16, u16),
}

impl RescalePolicy {
    /// Policy used when the request does not name one: 16-bit native
    /// sources get a percentile stretch, 8-bit sources pass through.
    pub fn default_for_bits(bits_per_pixel: u8) -> Self {
        if bits_per_pixel > 8 {
            RescalePolicy::PercentileStretch
        } else {
            RescalePolicy::Range(0, 255)
        }
    }
}

/// Resolve a policy into concrete per-band [low, high] intervals.
///
/// Percentile statistics are computed from the source raster sampled
/// at reduced resolution; if the statistics pass yields nothing usable
/// the bound falls back to the full representable range of the source
/// bit depth.
pub fn band_ranges(
    policy: RescalePolicy,
    source: &Rgb16Image,
    bits_per_pixel: u8,
) -> [(u16, u16); 3] {
    match policy {
        RescalePolicy::FixedRange => [FIXED_REFLECTANCE_RANGE; 3],
        RescalePolicy::Range(low, high) => [(low, high); 3],
        RescalePolicy::PercentileStretch => percentile_ranges(source).unwrap_or_else(|| {
            let max = max_for_bits(bits_per_pixel);
            debug!(bits_per_pixel, "percentile statistics unavailable, using bit-depth range");
            [(0, max); 3]
        }),
    }
}

/// Maximum representable value for a bit depth, saturating at u16.
pub fn max_for_bits(bits_per_pixel: u8) -> u16 {
    if bits_per_pixel >= 16 {
        u16::MAX
    } else {
        ((1u32 << bits_per_pixel) - 1) as u16
    }
}

fn percentile_ranges(source: &Rgb16Image) -> Option<[(u16, u16); 3]> {
    let (w, h) = source.dimensions();
    if w == 0 || h == 0 {
        return None;
    }

    let step_x = (w / STATS_SAMPLE_EDGE).max(1);
    let step_y = (h / STATS_SAMPLE_EDGE).max(1);

    let mut bands: [Vec<u16>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    let mut y = 0;
    while y < h {
        let mut x = 0;
        while x < w {
            let p = source.get_pixel(x, y);
            for c in 0..3 {
                bands[c].push(p[c]);
            }
            x += step_x;
        }
        y += step_y;
    }

    let mut ranges = [(0u16, 0u16); 3];
    for (c, band) in bands.iter_mut().enumerate() {
        if band.is_empty() {
            return None;
        }
        band.sort_unstable();
        let low = band[percentile_index(band.len(), LOW_PERCENTILE)];
        let high = band[percentile_index(band.len(), HIGH_PERCENTILE)];
        if low >= high {
            return None;
        }
        ranges[c] = (low, high);
    }
    Some(ranges)
}

fn percentile_index(len: usize, p: f64) -> usize {
    (((len - 1) as f64) * p).round() as usize
}

/// Linearly map each band's [low, high] interval onto 0..=255.
pub fn rescale_to_8bit(source: &Rgb16Image, ranges: [(u16, u16); 3]) -> RgbImage {
    ImageBuffer::from_fn(source.width(), source.height(), |x, y| {
        let p = source.get_pixel(x, y);
        let mut out = [0u8; 3];
        for c in 0..3 {
            let (low, high) = ranges[c];
            let span = (high.max(low + 1) - low) as f64;
            let scaled = (p[c].saturating_sub(low)) as f64 / span * 255.0;
            out[c] = scaled.round().clamp(0.0, 255.0) as u8;
        }
        Rgb(out)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_image(w: u32, h: u32) -> Rgb16Image {
        ImageBuffer::from_fn(w, h, |x, y| {
            let v = (x + y * w) as u16 * 16;
            Rgb([v, v, v])
        })
    }

    #[test]
    fn test_fixed_range() {
        let img = gradient_image(8, 8);
        assert_eq!(
            band_ranges(RescalePolicy::FixedRange, &img, 16),
            [(0, 10_000); 3]
        );
    }

    #[test]
    fn test_caller_range_is_used_verbatim() {
        let img = gradient_image(8, 8);
        assert_eq!(
            band_ranges(RescalePolicy::Range(100, 900), &img, 16),
            [(100, 900); 3]
        );
    }

    #[test]
    fn test_percentile_stretch_covers_data() {
        let img = gradient_image(64, 64);
        let ranges = band_ranges(RescalePolicy::PercentileStretch, &img, 16);
        for (low, high) in ranges {
            assert!(low < high);
            // 2nd/98th percentiles sit strictly inside the data extremes
            assert!(low > 0);
            assert!(high < 65520);
        }
    }

    #[test]
    fn test_flat_image_falls_back_to_bit_depth() {
        let img: Rgb16Image = ImageBuffer::from_pixel(8, 8, Rgb([500, 500, 500]));
        let ranges = band_ranges(RescalePolicy::PercentileStretch, &img, 11);
        assert_eq!(ranges, [(0, 2047); 3]);
    }

    #[test]
    fn test_max_for_bits() {
        assert_eq!(max_for_bits(8), 255);
        assert_eq!(max_for_bits(11), 2047);
        assert_eq!(max_for_bits(16), u16::MAX);
    }

    #[test]
    fn test_rescale_maps_interval_to_full_range() {
        let img: Rgb16Image = ImageBuffer::from_fn(3, 1, |x, _| {
            let v = [100u16, 550, 1000][x as usize];
            Rgb([v, v, v])
        });
        let out = rescale_to_8bit(&img, [(100, 1000); 3]);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(1, 0)[0], 128);
        assert_eq!(out.get_pixel(2, 0)[0], 255);
    }

    #[test]
    fn test_rescale_clamps_outside_interval() {
        let img: Rgb16Image = ImageBuffer::from_fn(2, 1, |x, _| {
            let v = [50u16, 2000][x as usize];
            Rgb([v, v, v])
        });
        let out = rescale_to_8bit(&img, [(100, 1000); 3]);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(1, 0)[0], 255);
    }

    #[test]
    fn test_raising_upper_bound_never_brightens() {
        let img = gradient_image(16, 16);
        let narrow = rescale_to_8bit(&img, [(0, 2000); 3]);
        let wide = rescale_to_8bit(&img, [(0, 4000); 3]);

        for (n, w) in narrow.pixels().zip(wide.pixels()) {
            for c in 0..3 {
                assert!(w[c] <= n[c]);
            }
        }
    }

    #[test]
    fn test_caller_range_rescale_is_deterministic() {
        let img = gradient_image(16, 16);
        let a = rescale_to_8bit(&img, [(0, 4000); 3]);
        let b = rescale_to_8bit(&img, [(0, 4000); 3]);
        assert_eq!(a.as_raw(), b.as_raw());
    }
}

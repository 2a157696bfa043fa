//! Brovey pan-sharpening.
//!
//! Injects panchromatic detail into a lower-resolution multispectral
//! crop. Operates in 16-bit intermediate precision and is applied
//! before rescaling.

use image::ImageBuffer;

use crate::raster::{Gray16Image, Rgb16Image};
use crate::RenderError;

/// Fixed weight applied to the blue band in the Brovey ratio.
pub const BROVEY_WEIGHT: f32 = 0.2;

/// Apply the Brovey transform.
///
/// The multispectral and panchromatic crops must already share pixel
/// dimensions; a mismatch is a caller bug surfaced as an error rather
/// than silently resampling here.
pub fn brovey_sharpen(
    rgb: &Rgb16Image,
    pan: &Gray16Image,
    weight: f32,
) -> Result<Rgb16Image, RenderError> {
    if rgb.dimensions() != pan.dimensions() {
        return Err(RenderError::DimensionMismatch {
            rgb_width: rgb.width(),
            rgb_height: rgb.height(),
            pan_width: pan.width(),
            pan_height: pan.height(),
        });
    }

    let out = ImageBuffer::from_fn(rgb.width(), rgb.height(), |x, y| {
        let p = rgb.get_pixel(x, y);
        let pan_value = pan.get_pixel(x, y)[0] as f32;

        let (r, g, b) = (p[0] as f32, p[1] as f32, p[2] as f32);
        let pseudo_pan = (r + g + b * weight) / (2.0 + weight);
        let ratio = if pseudo_pan > 0.0 {
            pan_value / pseudo_pan
        } else {
            0.0
        };

        image::Rgb([
            (r * ratio).round().clamp(0.0, u16::MAX as f32) as u16,
            (g * ratio).round().clamp(0.0, u16::MAX as f32) as u16,
            (b * ratio).round().clamp(0.0, u16::MAX as f32) as u16,
        ])
    });

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let rgb: Rgb16Image = ImageBuffer::from_pixel(8, 8, Rgb([100, 100, 100]));
        let pan: Gray16Image = ImageBuffer::from_pixel(4, 8, Luma([100]));

        let err = brovey_sharpen(&rgb, &pan, BROVEY_WEIGHT).unwrap_err();
        assert!(matches!(err, RenderError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_identity_when_pan_equals_pseudo_pan() {
        // With r = g = b = v, the pseudo-pan is also v, so a pan band
        // equal to v leaves the image unchanged.
        let rgb: Rgb16Image = ImageBuffer::from_pixel(4, 4, Rgb([800, 800, 800]));
        let pan: Gray16Image = ImageBuffer::from_pixel(4, 4, Luma([800]));

        let out = brovey_sharpen(&rgb, &pan, BROVEY_WEIGHT).unwrap();
        assert!(out.pixels().all(|p| p.0 == [800, 800, 800]));
    }

    #[test]
    fn test_brighter_pan_brightens_output() {
        let rgb: Rgb16Image = ImageBuffer::from_pixel(4, 4, Rgb([400, 800, 1200]));
        let pan: Gray16Image = ImageBuffer::from_pixel(4, 4, Luma([1600]));

        let out = brovey_sharpen(&rgb, &pan, BROVEY_WEIGHT).unwrap();
        let p = out.get_pixel(0, 0);
        assert!(p[0] > 400);
        assert!(p[1] > 800);
        assert!(p[2] > 1200);
        // Band ratios are preserved by the multiplicative transform
        assert!((p[1] as f32 / p[0] as f32 - 2.0).abs() < 0.01);
    }

    #[test]
    fn test_zero_multispectral_stays_zero() {
        let rgb: Rgb16Image = ImageBuffer::from_pixel(2, 2, Rgb([0, 0, 0]));
        let pan: Gray16Image = ImageBuffer::from_pixel(2, 2, Luma([5000]));

        let out = brovey_sharpen(&rgb, &pan, BROVEY_WEIGHT).unwrap();
        assert!(out.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_saturation_clamps_at_u16_max() {
        let rgb: Rgb16Image = ImageBuffer::from_pixel(2, 2, Rgb([60000, 60000, 60000]));
        let pan: Gray16Image = ImageBuffer::from_pixel(2, 2, Luma([65535]));

        let out = brovey_sharpen(&rgb, &pan, BROVEY_WEIGHT).unwrap();
        assert!(out.pixels().all(|p| p.0.iter().all(|&v| v <= u16::MAX)));
    }
}

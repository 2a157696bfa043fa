//! Output image encoding.

use image::RgbImage;
use std::io::Cursor;
use std::str::FromStr;

use crate::RenderError;

/// Lossy WEBP quality for tile output.
const WEBP_QUALITY: f32 = 90.0;

/// Supported output encodings. Tiles default to WEBP, bbox crops to
/// PNG; the caller may override either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Webp,
}

impl OutputFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "png" | "image/png" => Ok(OutputFormat::Png),
            "webp" | "image/webp" => Ok(OutputFormat::Webp),
            _ => Err(FormatParseError(s.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unsupported output format: {0}")]
pub struct FormatParseError(pub String);

/// Encode an 8-bit RGB image into the requested format.
pub fn encode_image(img: &RgbImage, format: OutputFormat) -> Result<Vec<u8>, RenderError> {
    match format {
        OutputFormat::Webp => {
            let encoder = webp::Encoder::from_rgb(img.as_raw(), img.width(), img.height());
            Ok(encoder.encode(WEBP_QUALITY).to_vec())
        }
        OutputFormat::Png => {
            let mut buf = Cursor::new(Vec::new());
            image::DynamicImage::ImageRgb8(img.clone())
                .write_to(&mut buf, image::ImageOutputFormat::Png)
                .map_err(|e| RenderError::Encode(e.to_string()))?;
            Ok(buf.into_inner())
        }
    }
}

//! Error types for capture-tiles services.

use thiserror::Error;

/// Result type alias using ImageryError.
pub type ImageryResult<T> = Result<T, ImageryError>;

/// Primary error type for capture resolution and rendering operations.
#[derive(Debug, Error)]
pub enum ImageryError {
    // === Request Errors ===
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Invalid bbox: {0}")]
    InvalidBbox(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTime(String),

    #[error("Unsupported constellation: {0}")]
    InvalidConstellation(String),

    #[error("Requested format not supported: {0}")]
    UnsupportedFormat(String),

    // === Resolution Errors ===
    #[error("No capture found for query")]
    NotFound,

    #[error("Catalog search failed: {0}")]
    UpstreamCatalog(String),

    // === Rendering Errors ===
    #[error("Rendering failed: {0}")]
    Render(String),

    // === Infrastructure Errors ===
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Request timeout")]
    Timeout,
}

impl ImageryError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            ImageryError::MissingParameter(_)
            | ImageryError::InvalidParameter { .. }
            | ImageryError::InvalidBbox(_)
            | ImageryError::InvalidTime(_)
            | ImageryError::InvalidConstellation(_)
            | ImageryError::UnsupportedFormat(_) => 400,

            ImageryError::NotFound => 404,

            ImageryError::UpstreamCatalog(_) => 502,
            ImageryError::Timeout => 504,

            _ => 500,
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for ImageryError {
    fn from(err: std::io::Error) -> Self {
        ImageryError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for ImageryError {
    fn from(err: serde_json::Error) -> Self {
        ImageryError::Internal(format!("JSON error: {}", err))
    }
}

impl From<crate::bbox::BboxParseError> for ImageryError {
    fn from(err: crate::bbox::BboxParseError) -> Self {
        ImageryError::InvalidBbox(err.to_string())
    }
}

impl From<crate::time::TimeParseError> for ImageryError {
    fn from(err: crate::time::TimeParseError) -> Self {
        ImageryError::InvalidTime(err.to_string())
    }
}

impl From<crate::types::ConstellationParseError> for ImageryError {
    fn from(err: crate::types::ConstellationParseError) -> Self {
        ImageryError::InvalidConstellation(err.0)
    }
}

impl From<crate::types::LevelParseError> for ImageryError {
    fn from(err: crate::types::LevelParseError) -> Self {
        ImageryError::InvalidParameter {
            param: "level".to_string(),
            message: err.to_string(),
        }
    }
}

//! Error types for the mockup engine.
//!
//! Geometry and input problems never surface here: positions and scales are
//! clamped instead. What remains are catalogue, asset, collaborator and
//! export failures, all of which leave the composition in its previous state.

use thiserror::Error;

/// Main error type for mockup operations.
#[derive(Debug, Error)]
pub enum MockupError {
    /// No catalogue entry exists for the requested product id.
    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    /// A product definition or engine configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Export was requested without a mounted render surface.
    #[error("Render surface is not available")]
    SurfaceUnavailable,

    /// An export is already running for this composition.
    #[error("An export is already in progress")]
    ExportInProgress,

    /// Rasterizing the render surface failed.
    #[error("Capture failed: {0}")]
    Capture(String),

    /// Encoding the captured bitmap into the output format failed.
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// An image could not be fetched or decoded.
    #[error("Image error: {0}")]
    ImageLoad(String),

    /// HTTP transport failure talking to a remote collaborator.
    #[error("Network error: {0}")]
    Network(String),

    /// The background-removal collaborator reported a failure.
    #[error("Background removal failed: {0}")]
    BackgroundRemoval(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error wrapper
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(feature = "native")]
impl From<reqwest::Error> for MockupError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<image::ImageError> for MockupError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageLoad(err.to_string())
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, MockupError>;

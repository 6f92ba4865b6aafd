//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration:
//!
//! ```
//! use mockup_renderer::EngineConfig;
//!
//! let config = EngineConfig::from_json(r#"{ "pixelDensity": 3.0 }"#).unwrap();
//! assert_eq!(config.pixel_density, 3.0);
//! assert_eq!(config.surface_width, 600);
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MockupError, Result};

/// Top-level configuration of the rendering and export engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct EngineConfig {
    /// Logical width of the render surface in CSS pixels. The height follows
    /// from the product aspect ratio.
    pub surface_width: u32,
    /// Pixel density used for export capture.
    pub pixel_density: f32,
    pub export: ExportSettings,
    pub network: NetworkSettings,
    pub fonts: FontSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            surface_width: 600,
            pixel_density: 2.0,
            export: ExportSettings::default(),
            network: NetworkSettings::default(),
            fonts: FontSettings::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        log::debug!("loaded engine config from {}", path.display());
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.surface_width == 0 {
            return Err(MockupError::InvalidConfig(
                "surfaceWidth must be positive".into(),
            ));
        }
        if !(self.pixel_density.is_finite() && self.pixel_density > 0.0) {
            return Err(MockupError::InvalidConfig(format!(
                "pixelDensity must be positive, got {}",
                self.pixel_density
            )));
        }
        if !(0.0..=1.0).contains(&self.export.jpeg_quality) {
            return Err(MockupError::InvalidConfig(format!(
                "export.jpegQuality must be within 0..=1, got {}",
                self.export.jpeg_quality
            )));
        }
        let (width, height) = self.export.page.size_pt();
        if self.export.pdf_margin_pt < 0.0
            || self.export.pdf_margin_pt * 2.0 >= width.min(height)
        {
            return Err(MockupError::InvalidConfig(format!(
                "export.pdfMarginPt {} does not fit the page",
                self.export.pdf_margin_pt
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Sections
// ============================================================================

/// PDF page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub enum PageSize {
    #[default]
    A4,
    Letter,
}

impl PageSize {
    /// Portrait page size in PDF points.
    pub fn size_pt(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::Letter => (612.0, 792.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct ExportSettings {
    /// Directory used by [`DirectoryDelivery`](crate::DirectoryDelivery).
    pub output_dir: PathBuf,
    /// Fixed margin around the image on the PDF page.
    pub pdf_margin_pt: f32,
    /// Quality of the JPEG embedded in PDF output, 0..=1.
    pub jpeg_quality: f32,
    pub page: PageSize,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            pdf_margin_pt: 36.0,
            jpeg_quality: 0.95,
            page: PageSize::A4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct NetworkSettings {
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Endpoint of the background-removal service, if one is available.
    pub background_removal_url: Option<String>,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            user_agent: concat!("mockup-renderer/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
            background_removal_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct FontSettings {
    pub load_system_fonts: bool,
    /// Extra directories scanned for font files.
    pub font_dirs: Vec<PathBuf>,
}

impl Default for FontSettings {
    fn default() -> Self {
        Self {
            load_system_fonts: true,
            font_dirs: Vec::new(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Export pipeline: capture the render surface and write an image file.
//!
//! # Stages
//!
//! 1. **Preload** - images referenced by the current state are loaded into
//!    the surface; failures fall back as in the preview
//! 2. **Freeze** - the page backdrop is hidden for the capture only
//! 3. **Capture** - the surface is rendered at the pixel density, without
//!    editor overlays
//! 4. **Encode** - PNG, SVG wrapping the PNG, or PDF with a JPEG on a page
//! 5. **Deliver** - the file goes to a [`Delivery`]
//!
//! At most one export runs per composition, whichever pipeline starts it.
//! Every failure is returned as a [`MockupError`] and leaves the backdrop
//! restored.

mod delivery;
pub mod encode;
pub mod pdf;

pub use delivery::Delivery;
#[cfg(feature = "native")]
pub use delivery::DirectoryDelivery;

use std::rc::Rc;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::assets::ImageFetcher;
use crate::config::ExportSettings;
use crate::error::{MockupError, Result};
use crate::render::RenderSurface;
use crate::session::CompositionSession;
use crate::state::CompositionState;

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ExportFormat {
    #[default]
    Png,
    Svg,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Svg => "svg",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Svg => "image/svg+xml",
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

/// `{product_id}-{brand-slug}.{ext}`
pub fn file_name(product_id: &str, brand_name: &str, format: ExportFormat) -> String {
    let mut slug = String::new();
    for c in brand_name.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    let slug = if slug.is_empty() { "mockup" } else { slug };
    format!("{product_id}-{slug}.{}", format.extension())
}

/// A completed export.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub format: ExportFormat,
    pub file_name: String,
    /// Where the delivery put the file.
    pub location: String,
    pub byte_len: usize,
    /// Pixel size of the captured bitmap.
    pub width: u32,
    pub height: u32,
    /// The composition as it was captured.
    pub snapshot: Rc<CompositionState>,
}

/// Exports compositions through one fetcher and delivery.
pub struct ExportPipeline {
    settings: ExportSettings,
    pixel_density: f32,
    fetcher: Arc<dyn ImageFetcher>,
    delivery: Arc<dyn Delivery>,
}

impl ExportPipeline {
    pub fn new(
        settings: ExportSettings,
        pixel_density: f32,
        fetcher: Arc<dyn ImageFetcher>,
        delivery: Arc<dyn Delivery>,
    ) -> Self {
        Self {
            settings,
            pixel_density,
            fetcher,
            delivery,
        }
    }

    /// Builds a pipeline writing into the configured output directory.
    #[cfg(feature = "native")]
    pub fn from_config(config: &crate::config::EngineConfig, fetcher: Arc<dyn ImageFetcher>) -> Self {
        let delivery = Arc::new(DirectoryDelivery::new(config.export.output_dir.clone()));
        Self::new(config.export.clone(), config.pixel_density, fetcher, delivery)
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Exports the session's current composition.
    ///
    /// Fails with [`MockupError::SurfaceUnavailable`] before doing any work
    /// when no surface is mounted, and with [`MockupError::ExportInProgress`]
    /// while another export of the same session is running.
    pub async fn export(
        &self,
        session: &CompositionSession,
        surface: Option<&RenderSurface>,
        format: ExportFormat,
    ) -> Result<ExportOutcome> {
        let Some(surface) = surface else {
            log::error!("export requested without a render surface");
            return Err(MockupError::SurfaceUnavailable);
        };
        let Some(_claim) = session.begin_export() else {
            log::debug!("export already running, dropping request");
            return Err(MockupError::ExportInProgress);
        };

        let result = self.run(session, surface, format).await;
        match &result {
            Ok(outcome) => log::info!(
                "exported {} ({}x{}, {} bytes) to {}",
                outcome.file_name,
                outcome.width,
                outcome.height,
                outcome.byte_len,
                outcome.location
            ),
            Err(e) => log::error!("{} export failed: {e}", format.extension()),
        }
        result
    }

    async fn run(
        &self,
        session: &CompositionSession,
        surface: &RenderSurface,
        format: ExportFormat,
    ) -> Result<ExportOutcome> {
        let snapshot = self.preload(session, surface).await;
        let config = session.config();

        let captured = {
            let _frozen = surface.freeze_backdrop();
            surface.capture(config, &snapshot, self.pixel_density)?
        };
        let (width, height) = captured.dimensions();

        let bytes = match format {
            ExportFormat::Png => encode::png(&captured)?,
            ExportFormat::Svg => encode::svg(&captured, surface.width(), surface.height_for(config))?,
            ExportFormat::Pdf => encode::pdf(&captured, &self.settings)?,
        };
        let file_name = file_name(&config.id, &snapshot.brand.text.content, format);
        let byte_len = bytes.len();
        let location = self
            .delivery
            .deliver(&file_name, format.mime_type(), bytes)
            .await?;

        Ok(ExportOutcome {
            format,
            file_name,
            location,
            byte_len,
            width,
            height,
            snapshot,
        })
    }

    /// Loads every image the composition references and returns the
    /// snapshot to capture.
    ///
    /// The state may change while images load (a background removal can
    /// land); the latest snapshot wins, with one extra pass to load its
    /// images.
    async fn preload(&self, session: &CompositionSession, surface: &RenderSurface) -> Rc<CompositionState> {
        let mut snapshot = session.state();
        for _ in 0..2 {
            session.load_product_photo(surface, self.fetcher.as_ref()).await;
            if let Some(url) = session.state().effective_logo_url() {
                // Failures are logged by the surface and the layer is skipped
                let _ = surface.preload(url, self.fetcher.as_ref()).await;
            }

            let latest = session.state();
            let settled = latest.effective_logo_url() == snapshot.effective_logo_url()
                && latest.effective_photo_url(session.config())
                    == snapshot.effective_photo_url(session.config());
            snapshot = latest;
            if settled {
                break;
            }
            log::debug!("composition changed while preloading, loading new images");
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_slugged() {
        assert_eq!(file_name("tshirt", "Acme & Co.", ExportFormat::Png), "tshirt-acme-co.png");
        assert_eq!(file_name("mug", "  Café  Olé ", ExportFormat::Pdf), "mug-café-olé.pdf");
        assert_eq!(file_name("cap", "!!!", ExportFormat::Svg), "cap-mockup.svg");
    }

    #[test]
    fn formats_describe_themselves() {
        assert_eq!(ExportFormat::Svg.mime_type(), "image/svg+xml");
        assert_eq!(ExportFormat::Pdf.extension(), "pdf");
        let parsed: ExportFormat = serde_json::from_str("\"png\"").unwrap();
        assert_eq!(parsed, ExportFormat::Png);
    }
}

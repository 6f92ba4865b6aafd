//! The render surface: composites one composition into an RGBA bitmap.
//!
//! # Layer order
//!
//! 1. **Backdrop** - opaque page color behind the product, hidden while frozen
//! 2. **Silhouette** - tinted vector art, or the product photo when available
//! 3. **Logo** - blended by the swatch's contrast class
//! 4. **Text** - brand text, then text items in order
//! 5. **Overlays** - grid, rulers, print-area guides and resize handles
//!    (preview only)
//!
//! Images are never fetched while rendering. They are loaded into the
//! surface's [`ImageStore`] beforehand (see [`RenderSurface::preload`]);
//! anything missing is skipped.

pub mod layout;
pub mod raster;
pub mod scene;
pub mod silhouette;

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use resvg::usvg::{Options, fontdb};

use crate::assets::{self, ImageFetcher, ImageStore};
use crate::color::{self, Contrast};
use crate::config::{EngineConfig, FontSettings};
use crate::error::{MockupError, Result};
use crate::product::ProductConfig;
use crate::state::CompositionState;

use self::layout::{LayoutMode, SurfaceLayout};
use self::raster::BlendMode;
use self::scene::Overlays;

/// Page color drawn behind the product in the interactive preview.
pub const BACKDROP_COLOR: Rgba<u8> = Rgba([0xf3, 0xf4, 0xf6, 0xff]);

// ============================================================================
// Backdrop
// ============================================================================

/// Visibility of the opaque page backdrop.
#[derive(Debug)]
struct Backdrop {
    frozen: Cell<bool>,
    freezes: Cell<u32>,
    restores: Cell<u32>,
}

/// Keeps the backdrop hidden until dropped.
#[must_use = "the backdrop is restored as soon as the guard is dropped"]
pub struct BackdropGuard<'a> {
    backdrop: &'a Backdrop,
}

impl Drop for BackdropGuard<'_> {
    fn drop(&mut self) {
        self.backdrop.frozen.set(false);
        self.backdrop.restores.set(self.backdrop.restores.get() + 1);
        log::debug!("backdrop restored");
    }
}

// ============================================================================
// RenderSurface
// ============================================================================

/// A mounted render surface.
///
/// The surface is logically `width` CSS pixels wide; its height follows from
/// the product aspect ratio. Interior mutability lets gesture handlers,
/// preloads and the export pipeline share one surface on a single thread.
pub struct RenderSurface {
    width: u32,
    svg_opts: Options<'static>,
    images: RefCell<ImageStore>,
    backdrop: Backdrop,
}

impl RenderSurface {
    /// Creates a surface, loading fonts as configured.
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_fonts(config.surface_width, load_fonts(&config.fonts))
    }

    /// Creates a surface with an explicit font database.
    pub fn with_fonts(width: u32, fonts: fontdb::Database) -> Self {
        Self {
            width: width.max(1),
            svg_opts: raster::svg_options(&Arc::new(fonts)),
            images: RefCell::new(ImageStore::new()),
            backdrop: Backdrop {
                frozen: Cell::new(false),
                freezes: Cell::new(0),
                restores: Cell::new(0),
            },
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Logical height for a product.
    pub fn height_for(&self, config: &ProductConfig) -> u32 {
        ((self.width as f32 / config.aspect_ratio).round() as u32).max(1)
    }

    // ---- Images ----

    /// Loads an image into the store unless it is already present.
    ///
    /// Failures are remembered so the render falls back instead of retrying
    /// on every frame; [`ImageStore::evict`] clears them.
    pub async fn preload(&self, url: &str, fetcher: &dyn ImageFetcher) -> Result<Arc<RgbaImage>> {
        if let Some(image) = self.images.borrow().get(url) {
            log::debug!("image cache hit for {}", short_url(url));
            return Ok(image);
        }

        let decoded = match assets::load_bytes(url, fetcher).await {
            Ok(bytes) => assets::decode_image(&bytes, &self.svg_opts),
            Err(e) => Err(e),
        };

        match decoded {
            Ok(image) => Ok(self.images.borrow_mut().insert(url, image)),
            Err(e) => {
                log::warn!("failed to load image {}: {e}", short_url(url));
                self.images.borrow_mut().mark_failed(url);
                Err(e)
            }
        }
    }

    /// Decodes an in-memory image and stores it under `url`.
    pub fn insert_image(&self, url: &str, bytes: &[u8]) -> Result<()> {
        let image = assets::decode_image(bytes, &self.svg_opts)?;
        self.images.borrow_mut().insert(url, image);
        Ok(())
    }

    pub fn image(&self, url: &str) -> Option<Arc<RgbaImage>> {
        self.images.borrow().get(url)
    }

    pub fn image_failed(&self, url: &str) -> bool {
        self.images.borrow().has_failed(url)
    }

    pub fn evict_image(&self, url: &str) {
        self.images.borrow_mut().evict(url);
    }

    // ---- Backdrop ----

    /// Hides the backdrop until the returned guard is dropped.
    pub fn freeze_backdrop(&self) -> BackdropGuard<'_> {
        self.backdrop.frozen.set(true);
        self.backdrop.freezes.set(self.backdrop.freezes.get() + 1);
        log::debug!("backdrop frozen");
        BackdropGuard {
            backdrop: &self.backdrop,
        }
    }

    pub fn backdrop_frozen(&self) -> bool {
        self.backdrop.frozen.get()
    }

    /// How often the backdrop has been frozen and restored.
    pub fn backdrop_cycles(&self) -> (u32, u32) {
        (self.backdrop.freezes.get(), self.backdrop.restores.get())
    }

    // ---- Rendering ----

    /// Lays out the composition against the currently loaded logo.
    pub fn layout(&self, config: &ProductConfig, state: &CompositionState, mode: LayoutMode) -> SurfaceLayout {
        let logo_aspect = state
            .effective_logo_url()
            .and_then(|url| self.image(url))
            .map(|img| img.width() as f32 / img.height().max(1) as f32);
        SurfaceLayout::compute(config, state, logo_aspect, mode)
    }

    /// Renders the interactive preview, scaled by the canvas zoom.
    pub fn render_preview(
        &self,
        config: &ProductConfig,
        state: &CompositionState,
        dragging: bool,
    ) -> Result<RgbaImage> {
        let layout = self.layout(config, state, LayoutMode::Preview);
        self.render(
            config,
            state,
            &layout,
            Overlays::preview(state, dragging),
            state.canvas.zoom,
        )
    }

    /// Captures the surface for export at the given pixel density.
    ///
    /// Zoom is ignored and no editor overlay is drawn.
    pub fn capture(
        &self,
        config: &ProductConfig,
        state: &CompositionState,
        pixel_density: f32,
    ) -> Result<RgbaImage> {
        let layout = self.layout(config, state, LayoutMode::Capture);
        self.render(config, state, &layout, Overlays::none(), pixel_density)
    }

    fn render(
        &self,
        config: &ProductConfig,
        state: &CompositionState,
        layout: &SurfaceLayout,
        overlays: Overlays,
        density: f32,
    ) -> Result<RgbaImage> {
        if !(density.is_finite() && density > 0.0) {
            return Err(MockupError::Capture(format!("invalid pixel density {density}")));
        }
        let logical_w = self.width as f32;
        let logical_h = self.height_for(config) as f32;
        let px_w = (logical_w * density).round() as u32;
        let px_h = (logical_h * density).round() as u32;
        if px_w == 0 || px_h == 0 {
            return Err(MockupError::Capture(format!(
                "surface of {px_w}x{px_h} pixels has no area"
            )));
        }

        let mut canvas = if self.backdrop_frozen() {
            RgbaImage::new(px_w, px_h)
        } else {
            RgbaImage::from_pixel(px_w, px_h, BACKDROP_COLOR)
        };

        let swatch = config.color(&state.color_id).or_else(|| config.default_color());

        // Silhouette or photo
        let photo = state
            .effective_photo_url(config)
            .filter(|_| !state.ui.photo_load_failed)
            .and_then(|url| self.image(&url));
        match photo {
            Some(photo) => {
                let fitted = raster::cover(&photo, px_w, px_h);
                raster::composite(&mut canvas, &fitted, 0, 0, BlendMode::Normal);
            }
            None => {
                let hex = swatch
                    .map(|c| color::normalize_hex(&c.hex, palette::Srgb::new(255, 255, 255)))
                    .unwrap_or_else(|| "#ffffff".to_string());
                let svg = silhouette::tinted(&config.id, state.canvas.view, &hex);
                let body = raster::render_svg_exact(&svg, px_w, px_h, &self.svg_opts)?;
                raster::composite(&mut canvas, &body, 0, 0, BlendMode::Normal);
            }
        }

        // Logo
        if let (Some(rect), Some(url)) = (layout.logo, state.effective_logo_url()) {
            match self.image(url) {
                Some(logo) => {
                    let box_w = (rect.width / 100.0 * px_w as f32).round() as u32;
                    let box_h = (rect.height / 100.0 * px_h as f32).round() as u32;
                    let fitted = raster::fit_within(&logo, box_w, box_h);
                    let cx = state.logo.position.x / 100.0 * px_w as f32;
                    let cy = state.logo.position.y / 100.0 * px_h as f32;
                    let x = (cx - fitted.width() as f32 / 2.0).round() as i32;
                    let y = (cy - fitted.height() as f32 / 2.0).round() as i32;
                    let mode = match swatch.map(|c| c.contrast()) {
                        Some(Contrast::Dark) => BlendMode::Screen,
                        _ => BlendMode::Multiply,
                    };
                    raster::composite(&mut canvas, &fitted, x, y, mode);
                }
                None => log::debug!("logo {} not loaded, skipping layer", short_url(url)),
            }
        }

        // Text
        if let Some(svg) = scene::text_layer(state, layout, logical_w, logical_h) {
            let text = raster::render_svg_exact(&svg, px_w, px_h, &self.svg_opts)?;
            raster::composite(&mut canvas, &text, 0, 0, BlendMode::Normal);
        }

        // Editor overlays
        if let Some(svg) = scene::overlay_layer(config, layout, overlays, logical_w, logical_h) {
            let overlay = raster::render_svg_exact(&svg, px_w, px_h, &self.svg_opts)?;
            raster::composite(&mut canvas, &overlay, 0, 0, BlendMode::Normal);
        }

        Ok(canvas)
    }
}

/// Builds the font database described by the settings.
pub fn load_fonts(settings: &FontSettings) -> fontdb::Database {
    let mut db = fontdb::Database::new();
    if settings.load_system_fonts {
        db.load_system_fonts();
    }
    for dir in &settings.font_dirs {
        db.load_fonts_dir(dir);
    }
    log::debug!("loaded {} font faces", db.len());
    db
}

/// Data URLs are shortened for logging.
pub(crate) fn short_url(url: &str) -> &str {
    if url.starts_with("data:") {
        url.split(',').next().unwrap_or("data:")
    } else {
        url
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::tests::test_product;
    use crate::state::{Action, transition};

    fn surface() -> RenderSurface {
        RenderSurface::with_fonts(100, fontdb::Database::new())
    }

    fn solid_png(color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(10, 10, Rgba(color));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn preview_scales_with_zoom_capture_with_density() {
        let config = test_product();
        let state = CompositionState::new(&config, "");
        let state = transition(&config, &state, Action::SetZoom(1.5));
        let surface = surface();

        assert_eq!(surface.render_preview(&config, &state, false).unwrap().dimensions(), (150, 150));
        assert_eq!(surface.capture(&config, &state, 2.0).unwrap().dimensions(), (200, 200));
    }

    #[test]
    fn frozen_backdrop_is_transparent() {
        let config = test_product();
        let state = CompositionState::new(&config, "");
        let surface = surface();

        let live = surface.capture(&config, &state, 1.0).unwrap();
        assert_eq!(*live.get_pixel(0, 0), BACKDROP_COLOR);

        let frozen = {
            let _guard = surface.freeze_backdrop();
            assert!(surface.backdrop_frozen());
            surface.capture(&config, &state, 1.0).unwrap()
        };
        assert_eq!(frozen.get_pixel(0, 0)[3], 0);
        assert!(!surface.backdrop_frozen());
        assert_eq!(surface.backdrop_cycles(), (1, 1));
    }

    #[test]
    fn silhouette_takes_swatch_color() {
        let config = test_product();
        let state = CompositionState::new(&config, "");
        let state = transition(&config, &state, Action::SelectColor("red".into()));
        let surface = surface();

        let img = surface.capture(&config, &state, 1.0).unwrap();
        let center = img.get_pixel(50, 50);
        assert_eq!(center.0, [0xc0, 0x39, 0x2b, 0xff]);
    }

    #[test]
    fn logo_blends_by_contrast() {
        let config = test_product();
        let surface = surface();
        surface.insert_image("white.png", &solid_png([255, 255, 255, 255])).unwrap();

        let mut state = CompositionState::new(&config, "");
        state = transition(&config, &state, Action::SetLogoSource(Some("white.png".into())));
        state = transition(&config, &state, Action::SelectColor("navy".into()));
        // Screen over navy: white stays white
        let img = surface.capture(&config, &state, 1.0).unwrap();
        let (x, y) = (state.logo.position.x as u32, state.logo.position.y as u32);
        assert_eq!(img.get_pixel(x, y).0, [255, 255, 255, 255]);

        // Multiply over white: white logo disappears into the fabric
        state = transition(&config, &state, Action::SelectColor("white".into()));
        let img = surface.capture(&config, &state, 1.0).unwrap();
        assert_eq!(img.get_pixel(x, y).0, [255, 255, 255, 255]);
    }

    #[test]
    fn failed_photo_renders_vector() {
        let mut config = test_product();
        config.render_mode = crate::product::RenderMode::Photographic;
        config.photo = Some(crate::product::PhotoAssets {
            base_url: "https://cdn.example/".into(),
            color_map: [("white".to_string(), "tee-white.png".to_string())].into(),
            fallback: None,
        });
        let surface = surface();
        surface
            .insert_image("https://cdn.example/tee-white.png", &solid_png([0, 255, 0, 255]))
            .unwrap();

        let state = CompositionState::new(&config, "");
        let img = surface.capture(&config, &state, 1.0).unwrap();
        assert_eq!(img.get_pixel(50, 50).0, [0, 255, 0, 255]);

        let state = transition(&config, &state, Action::PhotoLoadFailed);
        let img = surface.capture(&config, &state, 1.0).unwrap();
        assert_eq!(img.get_pixel(50, 50).0, [255, 255, 255, 255]);
    }

    #[test]
    fn invalid_density_is_a_capture_error() {
        let config = test_product();
        let state = CompositionState::new(&config, "");
        assert!(matches!(
            surface().capture(&config, &state, 0.001),
            Err(MockupError::Capture(_))
        ));
    }
}

//! Raster utilities: SVG rasterization through resvg and pixel compositing.

use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{Options, Tree, fontdb};

use crate::error::{MockupError, Result};

// ============================================================================
// SVG Rendering
// ============================================================================

/// Builds usvg options sharing the given font database.
pub fn svg_options(fonts: &Arc<fontdb::Database>) -> Options<'static> {
    Options {
        fontdb: Arc::clone(fonts),
        ..Options::default()
    }
}

/// Renders an SVG document stretched to exactly `width x height` pixels.
///
/// Used for full-surface layers whose viewBox already matches the surface
/// aspect ratio.
pub fn render_svg_exact(svg_data: &str, width: u32, height: u32, opts: &Options) -> Result<RgbaImage> {
    let tree = Tree::from_str(svg_data, opts)
        .map_err(|e| MockupError::Capture(format!("invalid SVG: {e}")))?;

    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| MockupError::Capture(format!("cannot allocate {width}x{height} surface")))?;

    let size = tree.size();
    let transform = Transform::from_scale(
        width as f32 / size.width(),
        height as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    Ok(pixmap_to_rgba_image(&pixmap))
}

/// Renders an SVG so that its larger side is `max_side` pixels, preserving
/// aspect ratio. Used to decode vector logos.
pub fn render_svg_fit(svg_data: &str, max_side: u32, opts: &Options) -> Result<RgbaImage> {
    let tree = Tree::from_str(svg_data, opts)
        .map_err(|e| MockupError::ImageLoad(format!("invalid SVG: {e}")))?;

    let size = tree.size();
    let scale = max_side as f32 / size.width().max(size.height());
    let width = (size.width() * scale).ceil() as u32;
    let height = (size.height() * scale).ceil() as u32;

    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| MockupError::ImageLoad("SVG has no drawable area".into()))?;
    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    Ok(pixmap_to_rgba_image(&pixmap))
}

/// Converts a tiny_skia Pixmap to an image::RgbaImage.
fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        // tiny_skia stores premultiplied alpha
        let (r, g, b, a) = unpremultiply(src.red(), src.green(), src.blue(), src.alpha());
        *dst = Rgba([r, g, b, a]);
    }
    img
}

fn unpremultiply(r: u8, g: u8, b: u8, a: u8) -> (u8, u8, u8, u8) {
    if a == 0 {
        (0, 0, 0, 0)
    } else {
        let a_f = a as f32 / 255.0;
        (
            (r as f32 / a_f).round().min(255.0) as u8,
            (g as f32 / a_f).round().min(255.0) as u8,
            (b as f32 / a_f).round().min(255.0) as u8,
            a,
        )
    }
}

// ============================================================================
// Compositing
// ============================================================================

/// Separable blend mode used when compositing a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Normal,
    /// Darkens: lets light fabric show through a logo's white areas.
    Multiply,
    /// Lightens: lets dark fabric show through a logo's black areas.
    Screen,
}

impl BlendMode {
    fn apply(self, src: f32, dst: f32) -> f32 {
        match self {
            BlendMode::Normal => src,
            BlendMode::Multiply => src * dst,
            BlendMode::Screen => src + dst - src * dst,
        }
    }
}

/// Composites `src` onto `dest` at the given offset using standard alpha
/// compositing with the given blend mode.
pub fn composite(dest: &mut RgbaImage, src: &RgbaImage, x: i32, y: i32, mode: BlendMode) {
    let dest_width = dest.width() as i32;
    let dest_height = dest.height() as i32;

    for (sx, sy, src_pixel) in src.enumerate_pixels() {
        let dx = x + sx as i32;
        let dy = y + sy as i32;
        if dx < 0 || dy < 0 || dx >= dest_width || dy >= dest_height {
            continue;
        }
        if src_pixel[3] == 0 {
            continue;
        }

        let dst_pixel = dest.get_pixel(dx as u32, dy as u32);
        let blended = blend_pixel(*src_pixel, *dst_pixel, mode);
        dest.put_pixel(dx as u32, dy as u32, blended);
    }
}

/// Source-over compositing of one pixel with a separable blend function.
fn blend_pixel(src: Rgba<u8>, dst: Rgba<u8>, mode: BlendMode) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;

    let out_a = sa + da * (1.0 - sa);
    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |s: u8, d: u8| -> u8 {
        let sf = s as f32 / 255.0;
        let df = d as f32 / 255.0;
        // Where the backdrop is transparent the source color is used unblended
        let mixed = (1.0 - da) * sf + da * mode.apply(sf, df);
        let out = (mixed * sa + df * da * (1.0 - sa)) / out_a;
        (out.clamp(0.0, 1.0) * 255.0).round() as u8
    };

    Rgba([
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ])
}

/// Resizes an image to fit inside `max_width x max_height`, preserving aspect ratio.
pub fn fit_within(img: &RgbaImage, max_width: u32, max_height: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 || max_width == 0 || max_height == 0 {
        return RgbaImage::new(0, 0);
    }
    let scale = (max_width as f32 / w as f32).min(max_height as f32 / h as f32);
    let width = ((w as f32 * scale).round() as u32).max(1);
    let height = ((h as f32 * scale).round() as u32).max(1);
    imageops::resize(img, width, height, FilterType::Triangle)
}

/// Resizes an image to cover exactly `width x height`, cropping the overflow.
pub fn cover(img: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 || width == 0 || height == 0 {
        return RgbaImage::new(width, height);
    }
    let scale = (width as f32 / w as f32).max(height as f32 / h as f32);
    let scaled_w = ((w as f32 * scale).ceil() as u32).max(width);
    let scaled_h = ((h as f32 * scale).ceil() as u32).max(height);
    let scaled = imageops::resize(img, scaled_w, scaled_h, FilterType::Triangle);
    let x = (scaled_w - width) / 2;
    let y = (scaled_h - height) / 2;
    imageops::crop_imm(&scaled, x, y, width, height).to_image()
}

/// Drops the alpha channel by compositing over a solid background.
pub fn flatten(img: &RgbaImage, background: Rgb<u8>) -> RgbImage {
    let mut out = RgbImage::new(img.width(), img.height());
    for (dst, src) in out.pixels_mut().zip(img.pixels()) {
        let a = src[3] as f32 / 255.0;
        let mix = |s: u8, b: u8| (s as f32 * a + b as f32 * (1.0 - a)).round() as u8;
        *dst = Rgb([
            mix(src[0], background[0]),
            mix(src[1], background[1]),
            mix(src[2], background[2]),
        ]);
    }
    out
}

// ============================================================================
// Tests
// ============================================================================

//! Serializes captured bitmaps into export formats.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, Rgb, RgbaImage};

use super::pdf;
use crate::config::ExportSettings;
use crate::error::{MockupError, Result};
use crate::render::raster;

/// Page color behind transparent pixels in formats without alpha.
const PAGE_WHITE: Rgb<u8> = Rgb([255, 255, 255]);

pub fn png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| MockupError::Encode(format!("PNG: {e}")))?;
    Ok(out.into_inner())
}

/// Wraps the bitmap as an inline PNG in an SVG document.
///
/// The document keeps the logical size so viewers show it at 1x.
pub fn svg(image: &RgbaImage, logical_width: u32, logical_height: u32) -> Result<Vec<u8>> {
    let encoded = BASE64.encode(png(image)?);
    let (px_w, px_h) = image.dimensions();
    let doc = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{logical_width}" height="{logical_height}" viewBox="0 0 {px_w} {px_h}"><image width="{px_w}" height="{px_h}" href="data:image/png;base64,{encoded}" xlink:href="data:image/png;base64,{encoded}"/></svg>"#
    );
    Ok(doc.into_bytes())
}

pub fn jpeg(image: &RgbaImage, quality: f32) -> Result<Vec<u8>> {
    let flat = raster::flatten(image, PAGE_WHITE);
    let quality = (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8;
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(&flat)
        .map_err(|e| MockupError::Encode(format!("JPEG: {e}")))?;
    Ok(out)
}

/// Places the bitmap on a single page, JPEG-compressed over white.
pub fn pdf(image: &RgbaImage, settings: &ExportSettings) -> Result<Vec<u8>> {
    let (w, h) = image.dimensions();
    let jpeg = jpeg(image, settings.jpeg_quality)?;
    pdf::single_image_page(jpeg, w, h, settings.page, settings.pdf_margin_pt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample() -> RgbaImage {
        RgbaImage::from_fn(8, 4, |x, _| {
            if x < 4 {
                Rgba([200, 30, 30, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    #[test]
    fn png_keeps_dimensions_and_alpha() {
        let bytes = png(&sample()).unwrap();
        let back = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(back.dimensions(), (8, 4));
        assert_eq!(back.get_pixel(7, 0)[3], 0);
    }

    #[test]
    fn svg_embeds_png_at_logical_size() {
        let doc = String::from_utf8(svg(&sample(), 4, 2).unwrap()).unwrap();
        assert!(doc.starts_with("<svg"));
        assert!(doc.contains(r#"width="4" height="2" viewBox="0 0 8 4""#));
        assert!(doc.contains("data:image/png;base64,"));
    }

    #[test]
    fn jpeg_flattens_onto_white() {
        let bytes = jpeg(&sample(), 0.95).unwrap();
        let back = image::load_from_memory(&bytes).unwrap().to_rgb8();
        let corner = back.get_pixel(7, 3);
        assert!(corner.0.iter().all(|c| *c > 235), "got {corner:?}");
    }

    #[test]
    fn pdf_is_a_pdf() {
        let bytes = pdf(&sample(), &ExportSettings::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}

//! Single-page PDF output with an embedded JPEG.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use crate::config::PageSize;
use crate::error::{MockupError, Result};

/// Where the image lands on the page, in PDF points from the bottom left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Fits an image of `img_w`x`img_h` inside the page margins, centered.
pub fn place(img_w: u32, img_h: u32, page: (f32, f32), margin: f32) -> Placement {
    let (page_w, page_h) = page;
    let avail_w = (page_w - 2.0 * margin).max(1.0);
    let avail_h = (page_h - 2.0 * margin).max(1.0);
    let scale = (avail_w / img_w.max(1) as f32).min(avail_h / img_h.max(1) as f32);
    let width = img_w as f32 * scale;
    let height = img_h as f32 * scale;
    Placement {
        x: (page_w - width) / 2.0,
        y: (page_h - height) / 2.0,
        width,
        height,
    }
}

/// Writes a one-page document showing a JPEG of `width`x`height` pixels.
pub fn single_image_page(jpeg: Vec<u8>, width: u32, height: u32, page: PageSize, margin: f32) -> Result<Vec<u8>> {
    let (page_w, page_h) = page.size_pt();
    let spot = place(width, height, (page_w, page_h), margin);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg,
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    spot.width.into(),
                    Object::Integer(0),
                    Object::Integer(0),
                    spot.height.into(),
                    spot.x.into(),
                    spot.y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content
        .encode()
        .map_err(|e| MockupError::Encode(format!("PDF content stream: {e}")))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let resources_id = doc.add_object(dictionary! {
        "XObject" => dictionary! { "Im0" => image_id },
    });
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![Object::Integer(0), Object::Integer(0), page_w.into(), page_h.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| MockupError::Encode(format!("PDF write: {e}")))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landscape_image_is_width_bound_and_centered() {
        let spot = place(1200, 600, PageSize::A4.size_pt(), 36.0);
        assert!((spot.width - (595.28 - 72.0)).abs() < 1e-3);
        assert!((spot.height - spot.width / 2.0).abs() < 1e-3);
        assert!((spot.x - 36.0).abs() < 1e-3);
        assert!((spot.y * 2.0 + spot.height - 841.89).abs() < 1e-3);
    }

    #[test]
    fn writes_a_parseable_single_page() {
        // Payload bytes are opaque to the writer
        let pdf = single_image_page(vec![0xff, 0xd8, 0xff, 0xd9], 4, 2, PageSize::Letter, 36.0).unwrap();
        assert!(pdf.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        let text = String::from_utf8_lossy(&pdf);
        assert!(text.contains("/DCTDecode"));
    }
}

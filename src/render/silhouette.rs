//! Embedded product silhouettes.
//!
//! Each silhouette is a plain SVG whose body is painted with
//! `currentColor`; tinting sets the root `color` attribute to the selected
//! swatch.

use crate::product::ProductView;

const GENERIC: &str = include_str!("../../assets/silhouettes/generic-front.svg");

const SILHOUETTES: &[(&str, ProductView, &str)] = &[
    ("tshirt", ProductView::Front, include_str!("../../assets/silhouettes/tshirt-front.svg")),
    ("tshirt", ProductView::Back, include_str!("../../assets/silhouettes/tshirt-back.svg")),
    ("hoodie", ProductView::Front, include_str!("../../assets/silhouettes/hoodie-front.svg")),
    ("hoodie", ProductView::Back, include_str!("../../assets/silhouettes/hoodie-back.svg")),
    ("mug", ProductView::Front, include_str!("../../assets/silhouettes/mug-front.svg")),
    ("tote", ProductView::Front, include_str!("../../assets/silhouettes/tote-front.svg")),
    ("poster", ProductView::Front, include_str!("../../assets/silhouettes/poster-front.svg")),
];

/// Returns the silhouette for a product side.
///
/// Missing sides fall back to the product's front, and unknown products
/// (custom configurations) to a generic rounded panel.
pub fn lookup(product_id: &str, view: ProductView) -> &'static str {
    find(product_id, view)
        .or_else(|| find(product_id, ProductView::Front))
        .unwrap_or(GENERIC)
}

fn find(product_id: &str, view: ProductView) -> Option<&'static str> {
    SILHOUETTES
        .iter()
        .find(|(id, v, _)| *id == product_id && *v == view)
        .map(|(_, _, svg)| *svg)
}

/// Returns the silhouette markup tinted with a normalized `#rrggbb` color.
pub fn tinted(product_id: &str, view: ProductView, hex: &str) -> String {
    let svg = lookup(product_id, view);
    match svg.find("<svg") {
        Some(start) => {
            let insert_at = start + "<svg".len();
            let mut out = String::with_capacity(svg.len() + 24);
            out.push_str(&svg[..insert_at]);
            out.push_str(&format!(" color=\"{hex}\""));
            out.push_str(&svg[insert_at..]);
            out
        }
        None => svg.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================

//! SVG scene fragments for text layers and editor overlays.
//!
//! Both layers are emitted as standalone SVG documents in logical surface
//! coordinates and rasterized through resvg at the requested density.

use std::fmt::Write;

use palette::Srgb;

use super::layout::{SurfaceLayout, TextBox};
use crate::color;
use crate::product::ProductConfig;
use crate::state::{CompositionState, TextBlock, TextEffect};

const FALLBACK_TEXT: Srgb<u8> = Srgb::new(0x11, 0x11, 0x11);

/// Which editor-only overlays to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Overlays {
    pub grid: bool,
    pub rulers: bool,
    pub guides: bool,
    pub handles: bool,
}

impl Overlays {
    /// Overlays for the interactive preview.
    ///
    /// Print-area guides show while an entity is being dragged or the grid
    /// is on.
    pub fn preview(state: &CompositionState, dragging: bool) -> Self {
        Self {
            grid: state.canvas.show_grid,
            rulers: state.canvas.show_rulers,
            guides: dragging || state.canvas.show_grid,
            handles: true,
        }
    }

    /// Export captures exclude every overlay.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn any(&self) -> bool {
        self.grid || self.rulers || self.guides || self.handles
    }
}

// ============================================================================
// Text layer
// ============================================================================

/// Builds the SVG for brand text and text items, or `None` when nothing is laid out.
pub fn text_layer(
    state: &CompositionState,
    layout: &SurfaceLayout,
    width: f32,
    height: f32,
) -> Option<String> {
    let mut body = String::new();

    if let Some(brand) = &layout.brand {
        push_text(&mut body, &state.brand.text, brand, width, height);
    }
    for text_box in &layout.text_items {
        let Some(item) = text_box.id.and_then(|id| state.text_item(id)) else {
            continue;
        };
        push_text(&mut body, &item.text, text_box, width, height);
    }

    if body.is_empty() {
        return None;
    }

    Some(document(
        width,
        height,
        r#"<defs><filter id="soft-shadow" x="-20%" y="-20%" width="140%" height="160%"><feGaussianBlur stdDeviation="2"/></filter></defs>"#,
        &body,
    ))
}

fn push_text(out: &mut String, text: &TextBlock, text_box: &TextBox, width: f32, height: f32) {
    let font_size = text_box.font_size_pct / 100.0 * height;
    let scale = text.axis_scale();
    let cx = text.position.x;
    let cy = text.position.y;

    let base = color::parse_hex(&text.color).unwrap_or(FALLBACK_TEXT);
    let fill = color::to_hex(base);
    let content = escape_xml(&text.content);
    let family = escape_xml(&text.font);

    // Glyphs are laid out in logical pixels and mapped into the percent viewBox.
    let _ = write!(
        out,
        r#"<g transform="translate({cx} {cy}) scale({sx} {sy}) rotate({rot}) scale({kx} {ky})" font-family="'{family}', sans-serif" font-size="{font_size}" font-weight="{weight}" text-anchor="middle">"#,
        sx = 100.0 / width,
        sy = 100.0 / height,
        rot = text.rotation,
        kx = scale.x,
        ky = scale.y,
        weight = text.weight,
    );

    // Baseline offset that centers a line of text on the anchor
    let baseline = font_size * 0.35;
    let step = font_size * 0.03;
    let glyph = |dx: f32, dy: f32, fill: &str, extra: &str| {
        format!(
            r#"<text x="{dx}" y="{y}" fill="{fill}"{extra}>{content}</text>"#,
            y = baseline + dy,
        )
    };

    match text.effect {
        TextEffect::None => {}
        TextEffect::ThreeD => {
            let side = color::to_hex(color::shift_lightness(base, -0.25));
            for i in (1..=4).rev() {
                let offset = step * i as f32;
                out.push_str(&glyph(offset, offset, &side, ""));
            }
        }
        TextEffect::Embossed => {
            let light = color::to_hex(color::shift_lightness(base, 0.35));
            let dark = color::to_hex(color::shift_lightness(base, -0.35));
            out.push_str(&glyph(-step, -step, &light, ""));
            out.push_str(&glyph(step, step, &dark, ""));
        }
        TextEffect::Debossed => {
            let light = color::to_hex(color::shift_lightness(base, 0.35));
            let dark = color::to_hex(color::shift_lightness(base, -0.35));
            out.push_str(&glyph(-step, -step, &dark, ""));
            out.push_str(&glyph(step, step, &light, ""));
        }
        TextEffect::Floating => {
            out.push_str(&glyph(
                0.0,
                font_size * 0.15,
                "#000000",
                r#" fill-opacity="0.35" filter="url(#soft-shadow)""#,
            ));
        }
    }
    out.push_str(&glyph(0.0, 0.0, &fill, ""));
    out.push_str("</g>");
}

// ============================================================================
// Overlays
// ============================================================================

const GUIDE_COLOR: &str = "#3b82f6";
const GRID_COLOR: &str = "#000000";

/// Builds the editor overlay SVG, or `None` when nothing is enabled.
pub fn overlay_layer(
    config: &ProductConfig,
    layout: &SurfaceLayout,
    overlays: Overlays,
    width: f32,
    height: f32,
) -> Option<String> {
    if !overlays.any() {
        return None;
    }

    // Hairlines stay one logical pixel wide on both axes.
    let hx = 100.0 / width;
    let hy = 100.0 / height;
    let hairline = hx.min(hy);
    let mut body = String::new();

    if overlays.grid {
        for i in 1..10 {
            let p = i as f32 * 10.0;
            let _ = write!(
                body,
                r#"<line x1="{p}" y1="0" x2="{p}" y2="100" stroke="{GRID_COLOR}" stroke-opacity="0.12" stroke-width="{hairline}"/><line x1="0" y1="{p}" x2="100" y2="{p}" stroke="{GRID_COLOR}" stroke-opacity="0.12" stroke-width="{hairline}"/>"#,
            );
        }
    }

    if overlays.rulers {
        let band_x = 12.0 * hx;
        let band_y = 12.0 * hy;
        let _ = write!(
            body,
            r##"<rect x="0" y="0" width="100" height="{band_y}" fill="#f8fafc" fill-opacity="0.9"/><rect x="0" y="0" width="{band_x}" height="100" fill="#f8fafc" fill-opacity="0.9"/>"##,
        );
        for i in 1..20 {
            let p = i as f32 * 5.0;
            let major = i % 2 == 0;
            let len_y = if major { band_y } else { band_y / 2.0 };
            let len_x = if major { band_x } else { band_x / 2.0 };
            let _ = write!(
                body,
                r##"<line x1="{p}" y1="0" x2="{p}" y2="{len_y}" stroke="#64748b" stroke-width="{hairline}"/><line x1="0" y1="{p}" x2="{len_x}" y2="{p}" stroke="#64748b" stroke-width="{hairline}"/>"##,
            );
        }
    }

    if overlays.guides {
        for area in [&config.logo_print_area, &config.text_print_area] {
            let _ = write!(
                body,
                r#"<rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="{GUIDE_COLOR}" stroke-opacity="0.6" stroke-width="{hairline}" stroke-dasharray="{} {}"/>"#,
                area.left,
                area.top,
                area.width,
                area.height,
                hairline * 4.0,
                hairline * 3.0,
            );
        }
    }

    if overlays.handles && !layout.handles.is_empty() {
        if let Some((target, _, _)) = layout.handles.first()
            && let Some(selected) = layout.text_box(*target)
        {
            let r = selected.rect;
            let _ = write!(
                body,
                r#"<rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="{GUIDE_COLOR}" stroke-width="{hairline}"/>"#,
                r.left, r.top, r.width, r.height,
            );
        }
        for (_, _, rect) in &layout.handles {
            let _ = write!(
                body,
                r##"<rect x="{}" y="{}" width="{}" height="{}" fill="#ffffff" stroke="{GUIDE_COLOR}" stroke-width="{hairline}"/>"##,
                rect.left, rect.top, rect.width, rect.height,
            );
        }
    }

    if body.is_empty() {
        return None;
    }
    Some(document(width, height, "", &body))
}

// ============================================================================
// Helpers
// ============================================================================

/// Wraps a body drawn in percent coordinates into a document of the given
/// logical size.
fn document(width: f32, height: f32, defs: &str, body: &str) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 100 100" preserveAspectRatio="none">{defs}{body}</svg>"#
    )
}

pub(crate) fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================

//! Entity boxes in percent space, shared by drawing and hit testing.
//!
//! Horizontal extents are percentages of the surface width and vertical
//! extents percentages of the surface height, the same space positions and
//! print areas live in. Boxes ignore text rotation.

use crate::geometry::{Corner, Position};
use crate::product::ProductConfig;
use crate::state::{CompositionState, EditTarget, TextBlock, TextId};

/// Logo width at scale 1.0, as a percentage of the surface width.
pub const LOGO_BASE_WIDTH_PCT: f32 = 30.0;

/// Font size at scale 1.0, as a percentage of the surface height.
pub const TEXT_BASE_SIZE_PCT: f32 = 6.0;

/// Average glyph advance relative to the font size.
pub const GLYPH_ADVANCE_EM: f32 = 0.6;

pub const LINE_HEIGHT_EM: f32 = 1.2;

/// Side length of a resize handle, as a percentage of the surface width.
pub const HANDLE_SIZE_PCT: f32 = 2.5;

/// Whether the layout serves the interactive preview or an export capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// Brand text is hidden while a text item is selected; handles are shown.
    Preview,
    /// Every visible entity is laid out; no handles.
    Capture,
}

/// An axis-aligned box in percent space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl PercentRect {
    pub fn centered(center: Position, width: f32, height: f32) -> Self {
        Self {
            left: center.x - width / 2.0,
            top: center.y - height / 2.0,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= self.left && pos.x <= self.right() && pos.y >= self.top && pos.y <= self.bottom()
    }

    pub fn corner(&self, corner: Corner) -> Position {
        let x = if corner.x_sign() > 0.0 { self.right() } else { self.left };
        let y = if corner.y_sign() > 0.0 { self.bottom() } else { self.top };
        Position::new(x, y)
    }
}

/// What a pointer-down landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Logo,
    Brand,
    TextItem(TextId),
    ResizeHandle { target: EditTarget, corner: Corner },
}

/// A laid-out text entity.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub id: Option<TextId>,
    pub rect: PercentRect,
    /// Font size as a percentage of the surface height, before axis scaling.
    pub font_size_pct: f32,
}

/// Boxes of every drawable entity for one state snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceLayout {
    /// Surface width divided by height.
    pub aspect_ratio: f32,
    pub logo: Option<PercentRect>,
    pub brand: Option<TextBox>,
    /// Text items in paint order (last is topmost).
    pub text_items: Vec<TextBox>,
    /// Corner handles of the edit target, when it is laid out.
    pub handles: Vec<(EditTarget, Corner, PercentRect)>,
}

impl SurfaceLayout {
    /// Lays out the composition.
    ///
    /// `logo_aspect` is the decoded logo's width over height; a square logo
    /// is assumed until the image is available.
    pub fn compute(
        config: &ProductConfig,
        state: &CompositionState,
        logo_aspect: Option<f32>,
        mode: LayoutMode,
    ) -> Self {
        let aspect = config.aspect_ratio;

        let logo = state.effective_logo_url().map(|_| {
            let width = LOGO_BASE_WIDTH_PCT * state.logo.scale;
            let logo_aspect = logo_aspect.filter(|a| a.is_finite() && *a > 0.0).unwrap_or(1.0);
            PercentRect::centered(state.logo.position, width, width * aspect / logo_aspect)
        });

        let hide_brand = mode == LayoutMode::Preview && state.selected_text_id().is_some();
        let brand = (state.brand.visible && !hide_brand && !state.brand.text.content.is_empty())
            .then(|| text_box(None, &state.brand.text, aspect));

        let text_items: Vec<TextBox> = state
            .text_items
            .iter()
            .filter(|item| !item.text.content.is_empty())
            .map(|item| text_box(Some(item.id), &item.text, aspect))
            .collect();

        let mut layout = Self {
            aspect_ratio: aspect,
            logo,
            brand,
            text_items,
            handles: Vec::new(),
        };

        if mode == LayoutMode::Preview
            && let Some(text) = layout.text_box(state.edit_target)
        {
            let rect = text.rect;
            let size_x = HANDLE_SIZE_PCT;
            let size_y = HANDLE_SIZE_PCT * aspect;
            layout.handles = Corner::ALL
                .into_iter()
                .map(|corner| {
                    let center = rect.corner(corner);
                    (state.edit_target, corner, PercentRect::centered(center, size_x, size_y))
                })
                .collect();
        }
        layout
    }

    /// The laid-out box of a text entity, if it is drawn.
    pub fn text_box(&self, target: EditTarget) -> Option<&TextBox> {
        match target {
            EditTarget::Brand => self.brand.as_ref(),
            EditTarget::TextItem(id) => self.text_items.iter().find(|t| t.id == Some(id)),
        }
    }

    /// Finds the topmost interactive entity at `pos`.
    ///
    /// Resize handles are layered above everything, then text items
    /// topmost-first, then the brand text, then the logo.
    pub fn hit_test(&self, pos: Position) -> Option<Hit> {
        if let Some((target, corner, _)) = self.handles.iter().find(|(_, _, rect)| rect.contains(pos)) {
            return Some(Hit::ResizeHandle {
                target: *target,
                corner: *corner,
            });
        }
        for text in self.text_items.iter().rev() {
            if let Some(id) = text.id
                && text.rect.contains(pos)
            {
                return Some(Hit::TextItem(id));
            }
        }
        if self.brand.as_ref().is_some_and(|b| b.rect.contains(pos)) {
            return Some(Hit::Brand);
        }
        if self.logo.is_some_and(|rect| rect.contains(pos)) {
            return Some(Hit::Logo);
        }
        None
    }
}

fn text_box(id: Option<TextId>, text: &TextBlock, aspect: f32) -> TextBox {
    let scale = text.axis_scale();
    let chars = text.content.chars().count().max(1) as f32;
    let font_size_pct = TEXT_BASE_SIZE_PCT;
    let height = font_size_pct * LINE_HEIGHT_EM * scale.y;
    let width = chars * GLYPH_ADVANCE_EM * font_size_pct * scale.x / aspect;
    TextBox {
        id,
        rect: PercentRect::centered(text.position, width, height),
        font_size_pct,
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Composition state: the single source of truth for one editor session.
//!
//! [`CompositionState`] aggregates color, logo, brand text, secondary text
//! items, background-removal results, canvas view state and transient UI
//! flags. It only changes through [`transition`], which produces a fresh
//! snapshot per [`Action`].

mod action;
mod transition;

pub use action::Action;
pub use transition::transition;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{self, AxisScale, Position};
use crate::product::{ProductConfig, ProductView};

/// Font used for new text when nothing else is chosen.
pub const DEFAULT_FONT: &str = "Inter";

/// Text color used for new text.
pub const DEFAULT_TEXT_COLOR: &str = "#111111";

/// Numeric weight of regular text.
pub const DEFAULT_WEIGHT: u16 = 700;

/// Allowed canvas zoom range.
pub const ZOOM_RANGE: (f32, f32) = (0.5, 3.0);

// ============================================================================
// Text
// ============================================================================

/// Visual effect applied when drawing a text entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum TextEffect {
    #[default]
    None,
    #[serde(rename = "3d")]
    #[cfg_attr(feature = "clap", value(name = "3d"))]
    ThreeD,
    Embossed,
    Floating,
    Debossed,
}

/// Placement and styling shared by the brand text and every text item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct TextBlock {
    pub content: String,
    pub font: String,
    pub color: String,
    pub position: Position,
    pub scale: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_y: Option<f32>,
    #[serde(default)]
    pub effect: TextEffect,
    /// Rotation in degrees, clockwise.
    #[serde(default)]
    pub rotation: f32,
    #[serde(default = "default_weight")]
    pub weight: u16,
}

fn default_weight() -> u16 {
    DEFAULT_WEIGHT
}

impl TextBlock {
    /// Creates a block with default styling.
    pub fn new(content: impl Into<String>, position: Position, scale: f32) -> Self {
        Self {
            content: content.into(),
            font: DEFAULT_FONT.to_string(),
            color: DEFAULT_TEXT_COLOR.to_string(),
            position,
            scale: geometry::clamp_text_scale(scale),
            scale_x: None,
            scale_y: None,
            effect: TextEffect::None,
            rotation: 0.0,
            weight: DEFAULT_WEIGHT,
        }
    }

    /// The scale used for rendering.
    ///
    /// Independent axes override the uniform scale where present.
    pub fn axis_scale(&self) -> AxisScale {
        AxisScale::new(
            self.scale_x.unwrap_or(self.scale),
            self.scale_y.unwrap_or(self.scale),
        )
    }

    /// Brings every numeric field into range, as [`apply`](Self::apply)
    /// leaves them. Used for blocks that arrive whole from raw input.
    pub fn normalized(mut self) -> Self {
        self.scale = geometry::clamp_text_scale(self.scale);
        self.scale_x = self.scale_x.map(geometry::clamp_text_scale);
        self.scale_y = self.scale_y.map(geometry::clamp_text_scale);
        self.rotation = normalize_rotation(self.rotation);
        self.weight = self.weight.clamp(100, 900);
        self
    }

    /// Shallow-merges the provided fields. Scales are clamped to the text range.
    pub fn apply(&mut self, patch: &TextPatch) {
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        if let Some(font) = &patch.font {
            self.font = font.clone();
        }
        if let Some(color) = &patch.color {
            self.color = color.clone();
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(scale) = patch.scale {
            self.scale = geometry::clamp_text_scale(scale);
        }
        if let Some(scale_x) = patch.scale_x {
            self.scale_x = Some(geometry::clamp_text_scale(scale_x));
        }
        if let Some(scale_y) = patch.scale_y {
            self.scale_y = Some(geometry::clamp_text_scale(scale_y));
        }
        if let Some(effect) = patch.effect {
            self.effect = effect;
        }
        if let Some(rotation) = patch.rotation {
            self.rotation = normalize_rotation(rotation);
        }
        if let Some(weight) = patch.weight {
            self.weight = weight.clamp(100, 900);
        }
    }
}

/// Degrees in `[0, 360)`; non-finite input resets to 0.
fn normalize_rotation(degrees: f32) -> f32 {
    if degrees.is_finite() {
        degrees.rem_euclid(360.0)
    } else {
        0.0
    }
}

/// A partial update to a [`TextBlock`]. `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct TextPatch {
    pub content: Option<String>,
    pub font: Option<String>,
    pub color: Option<String>,
    pub position: Option<Position>,
    pub scale: Option<f32>,
    pub scale_x: Option<f32>,
    pub scale_y: Option<f32>,
    pub effect: Option<TextEffect>,
    pub rotation: Option<f32>,
    pub weight: Option<u16>,
}

impl TextPatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn position(position: Position) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    /// Sets both axes plus their mean as the uniform scale.
    pub fn axis_scale(scale: AxisScale) -> Self {
        Self {
            scale: Some(scale.mean()),
            scale_x: Some(scale.x),
            scale_y: Some(scale.y),
            ..Self::default()
        }
    }
}

/// Stable identifier of a secondary text item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct TextId(Uuid);

impl TextId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for TextId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// A free-form secondary text label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct TextItem {
    pub id: TextId,
    #[serde(flatten)]
    pub text: TextBlock,
}

impl TextItem {
    /// Creates an item with a fresh id at the product's default text placement.
    pub fn new(config: &ProductConfig, content: impl Into<String>) -> Self {
        Self {
            id: TextId::new(),
            text: TextBlock::new(
                content,
                config.default_text.position,
                config.default_text.scale,
            ),
        }
    }
}

/// The always-present primary text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct BrandText {
    pub visible: bool,
    #[serde(flatten)]
    pub text: TextBlock,
}

/// Which text entity the shared editing panel currently targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "id", rename_all = "kebab-case")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub enum EditTarget {
    #[default]
    Brand,
    TextItem(TextId),
}

// ============================================================================
// Logo / background removal / canvas / UI
// ============================================================================

/// Logo placement and sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoState {
    pub position: Position,
    pub scale: f32,
    /// The raw logo as supplied by the user.
    pub source_url: Option<String>,
    /// A processed logo pushed in by the host, highest precedence.
    pub external_processed_url: Option<String>,
}

/// Progress flags and cached results of background removal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundRemovalState {
    pub removing_logo: bool,
    pub removing_photo: bool,
    pub processed_logo_url: Option<String>,
    pub processed_photo_url: Option<String>,
}

/// Viewing state of the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasState {
    pub view: ProductView,
    pub zoom: f32,
    pub show_grid: bool,
    pub show_rulers: bool,
}

/// Transient UI flags that are never persisted in presets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    /// Set when the photographic asset for the current color failed to load.
    pub photo_load_failed: bool,
    pub font_picker_open: bool,
}

// ============================================================================
// CompositionState
// ============================================================================

/// The full editing state of one product composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionState {
    pub product_id: String,
    pub color_id: String,
    pub logo: LogoState,
    pub brand: BrandText,
    pub text_items: Vec<TextItem>,
    pub edit_target: EditTarget,
    pub background_removal: BackgroundRemovalState,
    /// A user-uploaded product photo replacing the catalogue artwork.
    pub custom_photo_url: Option<String>,
    pub canvas: CanvasState,
    pub ui: UiState,
    /// Brand name the composition was created with, used by reset.
    pub initial_brand_name: String,
}

impl CompositionState {
    /// Builds a fresh state from the product defaults.
    pub fn new(config: &ProductConfig, brand_name: &str) -> Self {
        let color_id = config
            .default_color()
            .map(|c| c.id.clone())
            .unwrap_or_default();

        Self {
            product_id: config.id.clone(),
            color_id,
            logo: LogoState {
                position: config.default_logo.position,
                scale: geometry::clamp_logo_scale(config.default_logo.scale),
                source_url: None,
                external_processed_url: None,
            },
            brand: BrandText {
                visible: true,
                text: TextBlock::new(
                    brand_name,
                    config.default_text.position,
                    config.default_text.scale,
                ),
            },
            text_items: Vec::new(),
            edit_target: EditTarget::Brand,
            background_removal: BackgroundRemovalState::default(),
            custom_photo_url: None,
            canvas: CanvasState {
                view: config.default_view(),
                zoom: 1.0,
                show_grid: false,
                show_rulers: false,
            },
            ui: UiState::default(),
            initial_brand_name: brand_name.to_string(),
        }
    }

    /// The selected text item id, if a secondary item is being edited.
    pub fn selected_text_id(&self) -> Option<TextId> {
        match self.edit_target {
            EditTarget::Brand => None,
            EditTarget::TextItem(id) => Some(id),
        }
    }

    pub fn is_selected(&self, id: TextId) -> bool {
        self.selected_text_id() == Some(id)
    }

    pub fn text_item(&self, id: TextId) -> Option<&TextItem> {
        self.text_items.iter().find(|item| item.id == id)
    }

    /// The text block the shared editing panel shows.
    pub fn active_text(&self) -> &TextBlock {
        match self.edit_target {
            EditTarget::TextItem(id) => self
                .text_item(id)
                .map(|item| &item.text)
                .unwrap_or(&self.brand.text),
            EditTarget::Brand => &self.brand.text,
        }
    }

    /// The logo URL to draw: external processed, then locally processed, then raw.
    pub fn effective_logo_url(&self) -> Option<&str> {
        self.logo
            .external_processed_url
            .as_deref()
            .or(self.background_removal.processed_logo_url.as_deref())
            .or(self.logo.source_url.as_deref())
    }

    /// The product photo to draw, if any.
    ///
    /// A background-removed custom photo wins over the raw custom photo,
    /// which wins over the catalogue asset for the selected color.
    pub fn effective_photo_url(&self, config: &ProductConfig) -> Option<String> {
        self.background_removal
            .processed_photo_url
            .clone()
            .or_else(|| self.custom_photo_url.clone())
            .or_else(|| config.photo_url(&self.color_id))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::tests::test_product;

    #[test]
    fn fresh_state_uses_product_defaults() {
        let config = test_product();
        let state = CompositionState::new(&config, "Acme");

        assert_eq!(state.color_id, "white");
        assert_eq!(state.logo.position, config.default_logo.position);
        assert_eq!(state.brand.text.content, "Acme");
        assert_eq!(state.brand.text.position, config.default_text.position);
        assert!(state.brand.visible);
        assert!(state.text_items.is_empty());
        assert_eq!(state.edit_target, EditTarget::Brand);
        assert_eq!(state.canvas.view, ProductView::Front);
        assert_eq!(state.canvas.zoom, 1.0);
    }

    #[test]
    fn logo_url_precedence() {
        let config = test_product();
        let mut state = CompositionState::new(&config, "Acme");
        assert_eq!(state.effective_logo_url(), None);

        state.logo.source_url = Some("raw.png".into());
        assert_eq!(state.effective_logo_url(), Some("raw.png"));

        state.background_removal.processed_logo_url = Some("local.png".into());
        assert_eq!(state.effective_logo_url(), Some("local.png"));

        state.logo.external_processed_url = Some("external.png".into());
        assert_eq!(state.effective_logo_url(), Some("external.png"));
    }

    #[test]
    fn axis_scale_overrides_uniform() {
        let mut block = TextBlock::new("Hi", Position::new(50.0, 50.0), 2.0);
        assert_eq!(block.axis_scale(), AxisScale::new(2.0, 2.0));

        block.scale_x = Some(3.0);
        assert_eq!(block.axis_scale(), AxisScale::new(3.0, 2.0));
    }

    #[test]
    fn patch_clamps_scales_and_normalizes_rotation() {
        let mut block = TextBlock::new("Hi", Position::new(50.0, 50.0), 1.0);
        block.apply(&TextPatch {
            scale: Some(40.0),
            scale_x: Some(0.01),
            rotation: Some(-90.0),
            weight: Some(5000),
            ..TextPatch::default()
        });
        assert_eq!(block.scale, 8.0);
        assert_eq!(block.scale_x, Some(0.5));
        assert_eq!(block.rotation, 270.0);
        assert_eq!(block.weight, 900);
    }

    #[test]
    fn text_effect_serializes_3d() {
        let json = serde_json::to_string(&TextEffect::ThreeD).unwrap();
        assert_eq!(json, "\"3d\"");
        let parsed: TextEffect = serde_json::from_str("\"debossed\"").unwrap();
        assert_eq!(parsed, TextEffect::Debossed);
    }

    #[test]
    fn edit_target_json_format() {
        let id = TextId::new();
        let json = serde_json::to_string(&EditTarget::TextItem(id)).unwrap();
        assert!(json.contains("\"kind\":\"text-item\""));
        let back: EditTarget = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EditTarget::TextItem(id));
        assert_eq!(
            serde_json::from_str::<EditTarget>(r#"{"kind":"brand"}"#).unwrap(),
            EditTarget::Brand
        );
    }
}

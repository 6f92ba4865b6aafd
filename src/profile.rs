//! Serializable brand presets for persistence and cross-process exchange.
//!
//! A [`BrandSettings`] captures the brand text and every secondary text item
//! in a JSON format the host can store and send back later. Transient UI
//! fields (selection, zoom, flags) are not part of a preset.
//!
//! # Example
//!
//! ```
//! use mockup_renderer::{BrandSettings, CompositionSession, Configurable, ProductRegistry};
//!
//! let registry = ProductRegistry::builtin().unwrap();
//! let mut session = CompositionSession::from_registry(&registry, "tshirt", "Acme").unwrap();
//!
//! // Export the current settings and serialize them for storage
//! let json = session.export_settings().to_json().unwrap();
//!
//! // Later, restore them in one atomic transition
//! let restored = BrandSettings::from_json(&json).unwrap();
//! session.apply_settings(&restored);
//! ```

use serde::{Deserialize, Serialize};

use crate::state::{BrandText, CompositionState, TextItem};

// ============================================================================
// Configurable Trait
// ============================================================================

/// Trait for types that can be configured from a [`BrandSettings`] preset.
pub trait Configurable {
    /// Applies a preset's settings to this instance.
    fn apply_settings(&mut self, settings: &BrandSettings);

    /// Exports the current settings as a preset.
    fn export_settings(&self) -> BrandSettings;
}

// ============================================================================
// BrandSettings
// ============================================================================

/// A persisted snapshot of the text side of a composition.
///
/// # JSON Format
///
/// ```json
/// {
///   "brand": {
///     "visible": true,
///     "content": "Acme",
///     "font": "Inter",
///     "color": "#111111",
///     "position": { "x": 50.0, "y": 70.0 },
///     "scale": 1.0,
///     "effect": "none",
///     "rotation": 0.0,
///     "weight": 700
///   },
///   "textItems": []
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct BrandSettings {
    pub brand: BrandText,
    #[serde(default)]
    pub text_items: Vec<TextItem>,
}

impl BrandSettings {
    /// Captures the preset fields of a composition.
    pub fn from_state(state: &CompositionState) -> Self {
        Self {
            brand: state.brand.clone(),
            text_items: state.text_items.clone(),
        }
    }

    /// Serializes the preset to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serializes the preset to a pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes a preset from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::tests::test_product;
    use crate::state::{TextEffect, TextPatch};

    #[test]
    fn settings_json_format() {
        let config = test_product();
        let state = CompositionState::new(&config, "Acme");
        let json = BrandSettings::from_state(&state).to_json_pretty().unwrap();

        assert!(json.contains("\"textItems\""));
        assert!(json.contains("\"visible\": true"));
        // Brand fields are flattened next to the visibility flag
        assert!(json.contains("\"content\": \"Acme\""));
        assert!(!json.contains("\"text\""));
    }

    #[test]
    fn settings_preserve_items_and_effects() {
        let config = test_product();
        let mut state = CompositionState::new(&config, "Acme");
        let mut item = TextItem::new(&config, "Since 1999");
        item.text.apply(&TextPatch {
            effect: Some(TextEffect::Embossed),
            scale_x: Some(2.5),
            ..TextPatch::default()
        });
        state.text_items.push(item.clone());

        let json = BrandSettings::from_state(&state).to_json().unwrap();
        let restored = BrandSettings::from_json(&json).unwrap();

        assert_eq!(restored.text_items, vec![item]);
        assert!(json.contains("\"embossed\""));
    }

    #[test]
    fn settings_without_items_deserialize() {
        let json = r##"{
            "brand": {
                "visible": false,
                "content": "Globex",
                "font": "Inter",
                "color": "#000000",
                "position": { "x": 50.0, "y": 60.0 },
                "scale": 1.5
            }
        }"##;
        let settings = BrandSettings::from_json(json).unwrap();
        assert!(!settings.brand.visible);
        assert_eq!(settings.brand.text.content, "Globex");
        assert_eq!(settings.brand.text.weight, 700);
        assert!(settings.text_items.is_empty());
    }
}

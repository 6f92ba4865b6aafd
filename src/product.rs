//! Product catalogue: per-product print areas, defaults, swatches and assets.
//!
//! The built-in catalogue is declarative data embedded from
//! `assets/products.json`; silhouette path data lives next to it as SVG
//! files. Entries are immutable once loaded and shared through [`Arc`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::color::{self, Contrast};
use crate::error::{MockupError, Result};
use crate::geometry::{Position, PrintArea};

const BUILTIN_CATALOGUE: &str = include_str!("../assets/products.json");

// ============================================================================
// Product types
// ============================================================================

/// A product side that can be shown on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ProductView {
    #[default]
    Front,
    Back,
    Left,
    Right,
}

/// How the product background is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub enum RenderMode {
    /// Tinted vector silhouette.
    #[default]
    Vector,
    /// Pre-rendered photograph per color, falling back to the silhouette.
    Photographic,
}

/// A selectable product color swatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct ProductColor {
    pub id: String,
    pub name: String,
    pub hex: String,
    /// Derived from the hex luminance when the catalogue omits it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contrast: Option<Contrast>,
}

impl ProductColor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, hex: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            hex: hex.into(),
            contrast: None,
        }
    }

    /// Returns the declared contrast class, or derives it from the hex value.
    pub fn contrast(&self) -> Contrast {
        self.contrast.unwrap_or_else(|| {
            color::parse_hex(&self.hex)
                .map(Contrast::of)
                .unwrap_or(Contrast::Light)
        })
    }
}

/// Default placement for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct Placement {
    pub position: Position,
    pub scale: f32,
}

/// Feature flags for a product type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct Capabilities {
    #[serde(default)]
    pub supports_rotation: bool,
    #[serde(default = "default_views")]
    pub views: Vec<ProductView>,
    #[serde(default)]
    pub curved_print: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            supports_rotation: false,
            views: default_views(),
            curved_print: false,
        }
    }
}

fn default_views() -> Vec<ProductView> {
    vec![ProductView::Front]
}

/// Photographic assets keyed by color id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct PhotoAssets {
    pub base_url: String,
    #[serde(default)]
    pub color_map: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

impl PhotoAssets {
    /// Resolves `base_url + color_map[color_id]`, or the fallback photo.
    pub fn resolve(&self, color_id: &str) -> Option<String> {
        self.color_map
            .get(color_id)
            .or(self.fallback.as_ref())
            .map(|path| format!("{}{}", self.base_url, path))
    }
}

/// Definition of one product type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct ProductConfig {
    pub id: String,
    pub name: String,
    pub category: String,
    /// Canvas width divided by height.
    pub aspect_ratio: f32,
    pub logo_print_area: PrintArea,
    pub text_print_area: PrintArea,
    pub default_logo: Placement,
    pub default_text: Placement,
    pub colors: Vec<ProductColor>,
    pub default_color: String,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub render_mode: RenderMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<PhotoAssets>,
}

impl ProductConfig {
    /// Looks up a swatch by id.
    pub fn color(&self, id: &str) -> Option<&ProductColor> {
        self.colors.iter().find(|c| c.id == id)
    }

    /// Returns the default swatch.
    ///
    /// Validated configs always contain it; the first swatch is used otherwise.
    pub fn default_color(&self) -> Option<&ProductColor> {
        self.color(&self.default_color).or_else(|| self.colors.first())
    }

    /// The first listed view, shown when a composition starts.
    pub fn default_view(&self) -> ProductView {
        self.capabilities
            .views
            .first()
            .copied()
            .unwrap_or_default()
    }

    pub fn supports_view(&self, view: ProductView) -> bool {
        self.capabilities.views.contains(&view)
    }

    /// Resolves the photographic asset URL for a color, if any.
    pub fn photo_url(&self, color_id: &str) -> Option<String> {
        match (self.render_mode, &self.photo) {
            (RenderMode::Photographic, Some(photo)) => photo.resolve(color_id),
            _ => None,
        }
    }

    /// Checks the structural rules every catalogue entry must satisfy.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(MockupError::InvalidConfig(format!("{}: {}", self.id, msg)));

        if self.id.is_empty() {
            return Err(MockupError::InvalidConfig("product id is empty".into()));
        }
        if !(self.aspect_ratio.is_finite() && self.aspect_ratio > 0.0) {
            return fail(format!("aspect ratio {} must be positive", self.aspect_ratio));
        }
        let placements = [
            ("logo", &self.logo_print_area, &self.default_logo),
            ("text", &self.text_print_area, &self.default_text),
        ];
        for (name, area, default) in placements {
            if !area.is_within_container() {
                return fail(format!("{name} print area {area:?} leaves the container"));
            }
            if !area.contains(default.position) {
                return fail(format!(
                    "default {name} position {:?} lies outside its print area",
                    default.position
                ));
            }
        }
        if self.colors.is_empty() {
            return fail("no colors".into());
        }
        if self.color(&self.default_color).is_none() {
            return fail(format!("default color '{}' is not listed", self.default_color));
        }
        if self.capabilities.views.is_empty() {
            return fail("no views".into());
        }
        Ok(())
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Read-only lookup of product configs by id.
#[derive(Debug, Clone, Default)]
pub struct ProductRegistry {
    products: HashMap<String, Arc<ProductConfig>>,
    order: Vec<String>,
}

impl ProductRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the catalogue embedded in the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CATALOGUE)
    }

    /// Parses a JSON array of product configs, validating each entry.
    pub fn from_json(json: &str) -> Result<Self> {
        let configs: Vec<ProductConfig> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for config in configs {
            registry.insert(config)?;
        }
        Ok(registry)
    }

    /// Adds a config, replacing any entry with the same id.
    pub fn insert(&mut self, config: ProductConfig) -> Result<()> {
        config.validate()?;
        if !self.products.contains_key(&config.id) {
            self.order.push(config.id.clone());
        }
        self.products.insert(config.id.clone(), Arc::new(config));
        Ok(())
    }

    /// Looks up a product by id.
    pub fn get(&self, product_id: &str) -> Option<Arc<ProductConfig>> {
        self.products.get(product_id).cloned()
    }

    /// Like [`get`](Self::get), but unknown ids become an error.
    pub fn require(&self, product_id: &str) -> Result<Arc<ProductConfig>> {
        self.get(product_id)
            .ok_or_else(|| MockupError::UnknownProduct(product_id.to_string()))
    }

    /// Product ids in catalogue order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A small product used across the crate's tests.
    pub(crate) fn test_product() -> ProductConfig {
        ProductConfig {
            id: "tshirt".into(),
            name: "Test Tee".into(),
            category: "apparel".into(),
            aspect_ratio: 1.0,
            logo_print_area: PrintArea::new(18.0, 25.0, 50.0, 45.0),
            text_print_area: PrintArea::new(60.0, 20.0, 60.0, 25.0),
            default_logo: Placement {
                position: Position::new(50.0, 35.0),
                scale: 1.0,
            },
            default_text: Placement {
                position: Position::new(50.0, 70.0),
                scale: 1.0,
            },
            colors: vec![
                ProductColor::new("white", "White", "#ffffff"),
                ProductColor::new("navy", "Navy", "#1b2a4a"),
                ProductColor {
                    contrast: Some(Contrast::Dark),
                    ..ProductColor::new("red", "Red", "#c0392b")
                },
            ],
            default_color: "white".into(),
            capabilities: Capabilities {
                supports_rotation: true,
                views: vec![ProductView::Front, ProductView::Back],
                curved_print: false,
            },
            render_mode: RenderMode::Vector,
            photo: None,
        }
    }

    #[test]
    fn builtin_catalogue_loads() {
        let registry = ProductRegistry::builtin().unwrap();
        assert!(!registry.is_empty());
        for id in registry.ids() {
            let config = registry.get(id).unwrap();
            assert!(config.validate().is_ok(), "{id} should validate");
        }
        assert!(registry.get("tshirt").is_some());
        assert!(registry.get("mug").is_some());
    }

    #[test]
    fn unknown_product_is_recoverable() {
        let registry = ProductRegistry::builtin().unwrap();
        assert!(registry.get("spaceship").is_none());
        assert!(matches!(
            registry.require("spaceship"),
            Err(MockupError::UnknownProduct(id)) if id == "spaceship"
        ));
    }

    #[test]
    fn contrast_is_derived_when_missing() {
        let config = test_product();
        assert_eq!(config.color("white").unwrap().contrast(), Contrast::Light);
        assert_eq!(config.color("navy").unwrap().contrast(), Contrast::Dark);
        assert_eq!(config.color("red").unwrap().contrast(), Contrast::Dark);
    }

    #[test]
    fn photo_url_resolution() {
        let mut config = test_product();
        let mut color_map = BTreeMap::new();
        color_map.insert("navy".to_string(), "navy.png".to_string());
        config.photo = Some(PhotoAssets {
            base_url: "https://cdn.example.com/tee/".into(),
            color_map,
            fallback: Some("blank.png".into()),
        });

        // Vector products never resolve photos.
        assert_eq!(config.photo_url("navy"), None);

        config.render_mode = RenderMode::Photographic;
        assert_eq!(
            config.photo_url("navy").as_deref(),
            Some("https://cdn.example.com/tee/navy.png")
        );
        assert_eq!(
            config.photo_url("white").as_deref(),
            Some("https://cdn.example.com/tee/blank.png")
        );

        config.photo.as_mut().unwrap().fallback = None;
        assert_eq!(config.photo_url("white"), None);
    }

    #[test]
    fn validation_rejects_bad_configs() {
        let mut config = test_product();
        config.default_color = "plaid".into();
        assert!(config.validate().is_err());

        let mut config = test_product();
        config.logo_print_area = PrintArea::new(80.0, 10.0, 10.0, 40.0);
        assert!(config.validate().is_err());

        let mut config = test_product();
        config.capabilities.views.clear();
        assert!(config.validate().is_err());

        // Sessions start at the defaults, so they must be printable
        let mut config = test_product();
        config.default_text.position = Position::new(50.0, 30.0);
        assert!(matches!(
            config.validate(),
            Err(MockupError::InvalidConfig(msg)) if msg.contains("default text position")
        ));

        let mut config = test_product();
        config.default_logo.position = Position::new(90.0, 35.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn registry_json_roundtrip() {
        let json = serde_json::to_string(&vec![test_product()]).unwrap();
        assert!(json.contains("\"logoPrintArea\""));
        let registry = ProductRegistry::from_json(&json).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(*registry.get("tshirt").unwrap(), test_product());
    }
}

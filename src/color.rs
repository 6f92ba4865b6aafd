//! Hex color parsing and contrast helpers.

use palette::{Hsl, IntoColor, Srgb};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Relative luminance above which a swatch counts as light.
///
/// At 0.179 black and white text have equal contrast against the swatch.
const LIGHT_LUMINANCE_THRESHOLD: f32 = 0.179;

/// Binary contrast class of a product color.
///
/// Chooses the logo blend mode so a logo stays legible against the swatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub enum Contrast {
    Light,
    Dark,
}

impl Contrast {
    /// Classifies a color by its relative luminance.
    pub fn of(color: Srgb<u8>) -> Self {
        if relative_luminance(color) > LIGHT_LUMINANCE_THRESHOLD {
            Contrast::Light
        } else {
            Contrast::Dark
        }
    }
}

/// Parses `#rrggbb`, `rrggbb` or `#rgb` into an sRGB color.
pub fn parse_hex(hex: &str) -> Option<Srgb<u8>> {
    let trimmed = hex.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if digits.len() == 3 {
        let expanded: String = digits.chars().flat_map(|c| [c, c]).collect();
        return Srgb::from_str(&expanded).ok();
    }
    Srgb::from_str(digits).ok()
}

/// Formats a color as lowercase `#rrggbb`.
pub fn to_hex(color: Srgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

/// Normalizes a user-supplied hex string, falling back when unparseable.
///
/// Output is always safe to embed in SVG attribute values.
pub fn normalize_hex(hex: &str, fallback: Srgb<u8>) -> String {
    to_hex(parse_hex(hex).unwrap_or(fallback))
}

/// WCAG relative luminance in 0.0-1.0.
pub fn relative_luminance(color: Srgb<u8>) -> f32 {
    let linear = color.into_format::<f32>().into_linear();
    0.2126 * linear.red + 0.7152 * linear.green + 0.0722 * linear.blue
}

/// Shifts the HSL lightness of a color by `amount` (negative darkens).
pub fn shift_lightness(color: Srgb<u8>, amount: f32) -> Srgb<u8> {
    let mut hsl: Hsl = color.into_format::<f32>().into_color();
    hsl.lightness = (hsl.lightness + amount).clamp(0.0, 1.0);
    let shifted: Srgb = hsl.into_color();
    shifted.into_format()
}

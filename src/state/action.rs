//! The closed set of composition transitions.

use serde::{Deserialize, Serialize};

use super::{EditTarget, TextId, TextItem, TextPatch};
use crate::geometry::Position;
use crate::product::ProductView;
use crate::profile::BrandSettings;

/// A state transition request.
///
/// Serialized adjacently tagged so hosts can send actions as JSON:
///
/// ```json
/// { "type": "setLogoScale", "payload": 1.5 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Action {
    // ---- Color ----
    /// Selects a swatch by id. Unknown ids are ignored.
    SelectColor(String),

    // ---- Logo ----
    /// Moves the logo. The position is expected to be pre-constrained.
    SetLogoPosition(Position),
    /// Sets the logo scale, clamped to the logo range.
    SetLogoScale(f32),
    /// Replaces the raw logo, discarding any locally processed copy.
    SetLogoSource(Option<String>),
    /// Sets a processed logo supplied by the host.
    SetExternalProcessedLogo(Option<String>),

    // ---- Brand text ----
    SetBrandVisible(bool),
    UpdateBrand(TextPatch),
    /// Atomically replaces the brand text and the whole text-item collection.
    RestoreBrandSettings(BrandSettings),

    // ---- Text items ----
    /// Appends a text item and makes it the edit target.
    AddText(TextItem),
    RemoveText(TextId),
    UpdateTextItem { id: TextId, patch: TextPatch },
    /// Switches the shared editing panel to another entity.
    SelectText(EditTarget),
    /// Applies a patch to whichever entity is the current edit target.
    EditActiveText(TextPatch),

    // ---- Background removal ----
    SetLogoRemovalInProgress(bool),
    SetProcessedLogoUrl(Option<String>),
    SetPhotoRemovalInProgress(bool),
    SetProcessedPhotoUrl(Option<String>),
    /// Replaces the custom product photo, discarding its processed copy.
    SetCustomPhoto(Option<String>),

    // ---- Canvas ----
    SetView(ProductView),
    /// Cycles to the next view the product supports.
    ToggleView,
    SetZoom(f32),
    SetGridVisible(bool),
    ToggleGrid,
    SetRulersVisible(bool),
    ToggleRulers,

    // ---- Transient UI ----
    /// Marks the photographic asset for the current color as failed.
    PhotoLoadFailed,
    SetFontPickerOpen(bool),

    /// Recomputes the whole state from the product defaults.
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_use_adjacent_tagging() {
        let json = serde_json::to_string(&Action::SetLogoScale(1.5)).unwrap();
        assert_eq!(json, r#"{"type":"setLogoScale","payload":1.5}"#);

        let parsed: Action = serde_json::from_str(r#"{"type":"toggleGrid"}"#).unwrap();
        assert_eq!(parsed, Action::ToggleGrid);

        let parsed: Action =
            serde_json::from_str(r#"{"type":"editActiveText","payload":{"content":"Hi"}}"#)
                .unwrap();
        assert_eq!(parsed, Action::EditActiveText(TextPatch::content("Hi")));
    }
}

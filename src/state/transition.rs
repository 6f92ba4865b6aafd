//! The pure transition function over [`CompositionState`].

use super::{Action, CompositionState, EditTarget, TextBlock, TextPatch, ZOOM_RANGE};
use crate::geometry;
use crate::product::ProductConfig;

/// Applies one action, returning the next snapshot.
///
/// The input state is never modified. Positions are stored as given (the
/// interaction layer constrains them before dispatch); scales and zoom are
/// clamped here as well for actions fed from raw numeric input. Rotation is
/// dropped for products that cannot print rotated text.
pub fn transition(config: &ProductConfig, state: &CompositionState, action: Action) -> CompositionState {
    let mut next = state.clone();

    match action {
        Action::SelectColor(color_id) => {
            if config.color(&color_id).is_some() {
                next.color_id = color_id;
                next.ui.photo_load_failed = false;
            } else {
                log::debug!("ignoring unknown color '{color_id}' for {}", config.id);
            }
        }

        Action::SetLogoPosition(position) => next.logo.position = position,
        Action::SetLogoScale(scale) => next.logo.scale = geometry::clamp_logo_scale(scale),
        Action::SetLogoSource(url) => {
            next.logo.source_url = url;
            next.background_removal.processed_logo_url = None;
        }
        Action::SetExternalProcessedLogo(url) => next.logo.external_processed_url = url,

        Action::SetBrandVisible(visible) => next.brand.visible = visible,
        Action::UpdateBrand(patch) => next.brand.text.apply(&supported_patch(config, patch)),
        Action::RestoreBrandSettings(settings) => {
            next.brand = settings.brand;
            next.brand.text = supported_block(config, next.brand.text);
            next.text_items = settings.text_items;
            for item in &mut next.text_items {
                item.text = supported_block(config, item.text.clone());
            }
            next.edit_target = EditTarget::Brand;
        }

        Action::AddText(mut item) => {
            item.text = supported_block(config, item.text);
            next.edit_target = EditTarget::TextItem(item.id);
            next.text_items.retain(|existing| existing.id != item.id);
            next.text_items.push(item);
        }
        Action::RemoveText(id) => {
            next.text_items.retain(|item| item.id != id);
            if next.edit_target == EditTarget::TextItem(id) {
                next.edit_target = EditTarget::Brand;
            }
        }
        Action::UpdateTextItem { id, patch } => {
            if let Some(item) = next.text_items.iter_mut().find(|item| item.id == id) {
                item.text.apply(&supported_patch(config, patch));
            }
        }
        Action::SelectText(target) => {
            next.edit_target = match target {
                EditTarget::TextItem(id) if state.text_item(id).is_none() => EditTarget::Brand,
                other => other,
            };
        }
        Action::EditActiveText(patch) => {
            let patch = supported_patch(config, patch);
            match next.edit_target {
                EditTarget::Brand => next.brand.text.apply(&patch),
                EditTarget::TextItem(id) => {
                    if let Some(item) = next.text_items.iter_mut().find(|item| item.id == id) {
                        item.text.apply(&patch);
                    }
                }
            }
        }

        Action::SetLogoRemovalInProgress(flag) => next.background_removal.removing_logo = flag,
        Action::SetProcessedLogoUrl(url) => next.background_removal.processed_logo_url = url,
        Action::SetPhotoRemovalInProgress(flag) => next.background_removal.removing_photo = flag,
        Action::SetProcessedPhotoUrl(url) => next.background_removal.processed_photo_url = url,
        Action::SetCustomPhoto(url) => {
            next.custom_photo_url = url;
            next.background_removal.processed_photo_url = None;
            next.ui.photo_load_failed = false;
        }

        Action::SetView(view) => {
            if config.supports_view(view) {
                next.canvas.view = view;
            }
        }
        Action::ToggleView => {
            let views = &config.capabilities.views;
            if let Some(index) = views.iter().position(|v| *v == state.canvas.view) {
                next.canvas.view = views[(index + 1) % views.len()];
            } else if let Some(first) = views.first() {
                next.canvas.view = *first;
            }
        }
        Action::SetZoom(zoom) => {
            if zoom.is_finite() {
                next.canvas.zoom = zoom.clamp(ZOOM_RANGE.0, ZOOM_RANGE.1);
            }
        }
        Action::SetGridVisible(visible) => next.canvas.show_grid = visible,
        Action::ToggleGrid => next.canvas.show_grid = !state.canvas.show_grid,
        Action::SetRulersVisible(visible) => next.canvas.show_rulers = visible,
        Action::ToggleRulers => next.canvas.show_rulers = !state.canvas.show_rulers,

        Action::PhotoLoadFailed => next.ui.photo_load_failed = true,
        Action::SetFontPickerOpen(open) => next.ui.font_picker_open = open,

        Action::Reset => next = CompositionState::new(config, &state.initial_brand_name),
    }

    next
}

/// Drops the fields the product cannot print from a patch.
fn supported_patch(config: &ProductConfig, mut patch: TextPatch) -> TextPatch {
    if !config.capabilities.supports_rotation && patch.rotation.take().is_some() {
        log::debug!("{} does not support rotation, ignoring", config.id);
    }
    patch
}

/// Brings a block that arrived whole into range for the product.
fn supported_block(config: &ProductConfig, block: TextBlock) -> TextBlock {
    let mut block = block.normalized();
    if !config.capabilities.supports_rotation {
        block.rotation = 0.0;
    }
    block
}

// ============================================================================
// Tests
// ============================================================================

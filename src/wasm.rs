//! Editor bindings for WASM environments.
//!
//! [`MockupEditor`] wraps a session, a render surface and the gesture
//! controller so a web frontend can drive the editor with plain pointer
//! coordinates and draw the returned pixels itself.
//!
//! # Feature Flag
//!
//! This module is only available with the `wasm` feature enabled. Browser
//! builds also turn off the default `native` feature, which needs a
//! filesystem:
//!
//! ```toml
//! [dependencies]
//! mockup-renderer = { version = "0.1", default-features = false, features = ["wasm"] }
//! ```
//!
//! # Example (JavaScript/TypeScript)
//!
//! ```javascript
//! import init, { MockupEditor } from 'mockup-renderer';
//!
//! await init();
//!
//! const editor = new MockupEditor('tshirt', 'Acme', 600);
//! editor.setContainerRect(rect.left, rect.top, rect.width, rect.height);
//!
//! canvas.onpointerdown = (e) => editor.pointerDown(e.clientX, e.clientY, e.pointerType === 'touch');
//! window.onpointermove = (e) => editor.pointerMove(e.clientX, e.clientY);
//! window.onpointerup = (e) => editor.pointerUp(e.clientX, e.clientY);
//!
//! editor.dispatch({ type: 'selectColor', payload: 'navy' });
//! const [w, h] = editor.getRenderedDimensions();
//! const pixels = editor.renderToPixels();
//! ctx.putImageData(new ImageData(new Uint8ClampedArray(pixels), w, h), 0, 0);
//! ```

use std::sync::Arc;

use resvg::usvg::fontdb;
use wasm_bindgen::prelude::*;

use crate::geometry::ContainerRect;
use crate::interaction::{DragController, PointerEvent, PointerHub, PointerPhase, PointerSource};
use crate::product::{ProductConfig, ProductRegistry};
use crate::profile::BrandSettings;
use crate::render::RenderSurface;
use crate::render::layout::LayoutMode;
use crate::session::CompositionSession;
use crate::state::Action;

// ============================================================================
// MockupEditor
// ============================================================================

/// An interactive mockup editor exposed to JavaScript.
#[wasm_bindgen]
pub struct MockupEditor {
    session: CompositionSession,
    surface: RenderSurface,
    hub: PointerHub,
    drag: DragController,
    rect: ContainerRect,
}

#[wasm_bindgen]
impl MockupEditor {
    /// Creates an editor for a built-in catalogue product.
    ///
    /// # Arguments
    ///
    /// * `product_id` - Catalogue id such as `"tshirt"`
    /// * `brand_name` - Initial brand text
    /// * `width` - Logical surface width in CSS pixels
    #[wasm_bindgen(constructor)]
    pub fn new(product_id: &str, brand_name: &str, width: u32) -> Result<MockupEditor, JsError> {
        let registry = ProductRegistry::builtin().map_err(to_js)?;
        let config = registry.require(product_id).map_err(to_js)?;
        Ok(Self::with_config(config, brand_name, width))
    }

    /// Creates an editor for a product described as JSON.
    #[wasm_bindgen(js_name = "fromProductJson")]
    pub fn from_product_json(json: &str, brand_name: &str, width: u32) -> Result<MockupEditor, JsError> {
        let config: ProductConfig = serde_json::from_str(json)
            .map_err(|e| JsError::new(&format!("Failed to parse product: {}", e)))?;
        config.validate().map_err(to_js)?;
        Ok(Self::with_config(Arc::new(config), brand_name, width))
    }

    // ---- State ----

    /// Applies an action object such as `{ type: 'setZoom', payload: 1.5 }`.
    ///
    /// Returns `true` if the composition changed.
    pub fn dispatch(&self, action: JsValue) -> Result<bool, JsError> {
        let action: Action = serde_wasm_bindgen::from_value(action)
            .map_err(|e| JsError::new(&format!("Invalid action: {}", e)))?;
        Ok(self.session.dispatch(action))
    }

    /// Same as [`dispatch`](Self::dispatch) for a JSON string.
    #[wasm_bindgen(js_name = "dispatchJson")]
    pub fn dispatch_json(&self, json: &str) -> Result<bool, JsError> {
        let action: Action = serde_json::from_str(json)
            .map_err(|e| JsError::new(&format!("Invalid action: {}", e)))?;
        Ok(self.session.dispatch(action))
    }

    /// Returns the current composition state as a JS object.
    pub fn state(&self) -> Result<JsValue, JsError> {
        serde_wasm_bindgen::to_value(&*self.session.state())
            .map_err(|e| JsError::new(&format!("Failed to serialize state: {}", e)))
    }

    // ---- Images ----

    /// Stores image bytes fetched by the host under `url`.
    #[wasm_bindgen(js_name = "loadImage")]
    pub fn load_image(&self, url: &str, bytes: &[u8]) -> Result<(), JsError> {
        self.surface.insert_image(url, bytes).map_err(to_js)
    }

    /// Marks the product photo for the current color as unavailable.
    #[wasm_bindgen(js_name = "photoFailed")]
    pub fn photo_failed(&self) {
        self.session.dispatch(Action::PhotoLoadFailed);
    }

    // ---- Pointer input ----

    /// Updates where the surface sits in the viewport.
    #[wasm_bindgen(js_name = "setContainerRect")]
    pub fn set_container_rect(&mut self, left: f32, top: f32, width: f32, height: f32) {
        self.rect = ContainerRect::new(left, top, width, height);
    }

    /// Handles a pointer-down on the surface. Returns `true` if a gesture started.
    #[wasm_bindgen(js_name = "pointerDown")]
    pub fn pointer_down(&self, client_x: f32, client_y: f32, touch: bool) -> bool {
        let state = self.session.state();
        let layout = self.surface.layout(self.session.config(), &state, LayoutMode::Preview);
        let event = self.event(PointerPhase::Down, client_x, client_y, touch);
        self.drag.pointer_down(&event, &layout, &self.rect)
    }

    /// Forwards a window-level pointer move.
    #[wasm_bindgen(js_name = "pointerMove")]
    pub fn pointer_move(&self, client_x: f32, client_y: f32) {
        self.hub.dispatch(&self.event(PointerPhase::Move, client_x, client_y, false));
    }

    /// Forwards a window-level pointer release.
    #[wasm_bindgen(js_name = "pointerUp")]
    pub fn pointer_up(&self, client_x: f32, client_y: f32) {
        self.hub.dispatch(&self.event(PointerPhase::Up, client_x, client_y, false));
    }

    #[wasm_bindgen(js_name = "pointerCancel")]
    pub fn pointer_cancel(&self) {
        self.hub.dispatch(&self.event(PointerPhase::Cancel, 0.0, 0.0, false));
    }

    #[wasm_bindgen(js_name = "isDragging")]
    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    // ---- Rendering ----

    /// Renders the preview and returns raw RGBA pixel data.
    #[wasm_bindgen(js_name = "renderToPixels")]
    pub fn render_to_pixels(&self) -> Result<Vec<u8>, JsError> {
        let state = self.session.state();
        let rendered = self
            .surface
            .render_preview(self.session.config(), &state, self.drag.is_dragging())
            .map_err(to_js)?;
        Ok(rendered.into_raw())
    }

    /// Returns `[width, height]` of the preview at the current zoom.
    #[wasm_bindgen(js_name = "getRenderedDimensions")]
    pub fn get_rendered_dimensions(&self) -> Vec<u32> {
        let zoom = self.session.state().canvas.zoom;
        let width = self.surface.width() as f32 * zoom;
        let height = self.surface.height_for(self.session.config()) as f32 * zoom;
        vec![width.round() as u32, height.round() as u32]
    }

    // ---- Preset Import/Export ----

    /// Exports the brand preset as a JSON string.
    #[wasm_bindgen(js_name = "exportPresetJson")]
    pub fn export_preset_json(&self) -> Result<String, JsError> {
        self.session
            .brand_settings()
            .to_json()
            .map_err(|e| JsError::new(&format!("Failed to serialize preset: {}", e)))
    }

    /// Restores a brand preset from a JSON string.
    #[wasm_bindgen(js_name = "importPresetJson")]
    pub fn import_preset_json(&self, json: &str) -> Result<(), JsError> {
        let settings = BrandSettings::from_json(json)
            .map_err(|e| JsError::new(&format!("Failed to parse preset: {}", e)))?;
        self.session.restore_brand_settings(&settings);
        Ok(())
    }

    /// Restores the host's saved preset unless that snapshot was already applied.
    #[wasm_bindgen(js_name = "syncSavedPreset")]
    pub fn sync_saved_preset(&self, json: Option<String>) -> Result<bool, JsError> {
        let settings = json
            .as_deref()
            .map(BrandSettings::from_json)
            .transpose()
            .map_err(|e| JsError::new(&format!("Failed to parse preset: {}", e)))?;
        Ok(self.session.sync_saved_settings(settings.as_ref()))
    }

    /// Returns the composition to the product defaults.
    pub fn reset(&self) {
        self.session.dispatch(Action::Reset);
    }
}

impl MockupEditor {
    fn with_config(config: Arc<ProductConfig>, brand_name: &str, width: u32) -> MockupEditor {
        let session = CompositionSession::new(config, brand_name);
        let hub = PointerHub::new();
        let drag = DragController::new(session.clone(), hub.clone());
        let surface = RenderSurface::with_fonts(width, fontdb::Database::new());
        let rect = ContainerRect::from_size(surface.width() as f32, surface.height_for(session.config()) as f32);
        MockupEditor {
            session,
            surface,
            hub,
            drag,
            rect,
        }
    }

    fn event(&self, phase: PointerPhase, client_x: f32, client_y: f32, touch: bool) -> PointerEvent {
        PointerEvent {
            phase,
            client_x,
            client_y,
            source: if touch {
                PointerSource::Touch
            } else {
                PointerSource::Mouse
            },
        }
    }
}

fn to_js(err: crate::error::MockupError) -> JsError {
    JsError::new(&err.to_string())
}

//! mockup-renderer: product mockup composition and export
//!
//! This crate composes brand assets (a logo, brand text and free-form text
//! items) onto a catalogue product, lets a host edit the composition through
//! pointer gestures, and exports the result as PNG, SVG or PDF.
//!
//! # Example
//!
//! ```
//! use mockup_renderer::{Action, CompositionSession, ProductRegistry, TextPatch};
//!
//! let registry = ProductRegistry::builtin().unwrap();
//! let session = CompositionSession::from_registry(&registry, "tshirt", "Acme").unwrap();
//!
//! // All changes go through actions
//! session.dispatch(Action::SelectColor("navy".into()));
//! session.dispatch(Action::EditActiveText(TextPatch::content("Acme Corp")));
//!
//! assert_eq!(session.state().brand.text.content, "Acme Corp");
//! ```
//!
//! # Rendering and Export
//!
//! A [`RenderSurface`] rasterizes snapshots for the preview; an
//! [`ExportPipeline`] captures it without editor overlays:
//!
//! ```no_run
//! use std::sync::Arc;
//! use mockup_renderer::{
//!     CompositionSession, EngineConfig, ExportFormat, ExportPipeline, HttpFetcher,
//!     ProductRegistry, RenderSurface,
//! };
//!
//! # async fn run() -> mockup_renderer::Result<()> {
//! let config = EngineConfig::default();
//! let registry = ProductRegistry::builtin()?;
//! let session = CompositionSession::from_registry(&registry, "mug", "Acme")?;
//! let surface = RenderSurface::new(&config);
//!
//! let fetcher = Arc::new(HttpFetcher::new(&config.network)?);
//! let pipeline = ExportPipeline::from_config(&config, fetcher);
//! let outcome = pipeline.export(&session, Some(&surface), ExportFormat::Pdf).await?;
//! println!("wrote {}", outcome.location);
//! # Ok(())
//! # }
//! ```

pub mod assets;
pub mod color;
mod config;
mod error;
pub mod export;
pub mod geometry;
pub mod interaction;
mod product;
mod profile;
mod removal;
pub mod render;
mod session;
mod state;

#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "native")]
pub use assets::HttpFetcher;
pub use assets::{ImageFetcher, ImageStore};
pub use config::{EngineConfig, ExportSettings, FontSettings, NetworkSettings, PageSize};
pub use error::{MockupError, Result};
#[cfg(feature = "native")]
pub use export::DirectoryDelivery;
pub use export::{Delivery, ExportFormat, ExportOutcome, ExportPipeline};
pub use geometry::{AxisScale, ContainerRect, Corner, Position, PrintArea};
pub use interaction::{DragController, ListenerGuard, PointerEvent, PointerHub};
pub use product::{
    Capabilities, PhotoAssets, Placement, ProductColor, ProductConfig, ProductRegistry,
    ProductView, RenderMode,
};
pub use profile::{BrandSettings, Configurable};
#[cfg(feature = "native")]
pub use removal::HttpBackgroundRemover;
pub use removal::{BackgroundRemover, RemovalRequest, RemovalSlot};
pub use render::RenderSurface;
pub use session::{CompositionSession, SessionEvent, Subscription};
pub use state::{
    Action, BrandText, CompositionState, EditTarget, TextBlock, TextEffect, TextId, TextItem,
    TextPatch, transition,
};

#[cfg(feature = "wasm")]
pub use wasm::MockupEditor;

//! One editing session over a product composition.
//!
//! [`CompositionSession`] owns the current [`CompositionState`] snapshot and
//! is the only writer: every change goes through [`dispatch`], which runs the
//! pure [`transition`] and swaps in the new snapshot. The session is a cheap
//! cloneable handle for single-threaded hosts, so gesture listeners and async
//! side channels can dispatch without borrowing the owner.
//!
//! [`dispatch`]: CompositionSession::dispatch

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::assets::ImageFetcher;
use crate::error::Result;
use crate::product::{ProductConfig, ProductRegistry};
use crate::profile::{BrandSettings, Configurable};
use crate::removal::{self, BackgroundRemover, RemovalRequest, RemovalSlot};
use crate::render::RenderSurface;
use crate::state::{Action, CompositionState, transition};

// ============================================================================
// Subscriptions
// ============================================================================

/// Notifications published by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Background removal produced a processed URL for a slot.
    Processed { slot: RemovalSlot, url: String },
}

type Listener = Rc<dyn Fn(&SessionEvent)>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Keeps a session listener registered until dropped.
#[must_use = "the listener is removed as soon as the subscription is dropped"]
pub struct Subscription {
    subscribers: Weak<RefCell<Subscribers>>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers
                .borrow_mut()
                .listeners
                .retain(|(id, _)| *id != self.id);
        }
    }
}

// ============================================================================
// CompositionSession
// ============================================================================

struct Inner {
    config: Arc<ProductConfig>,
    state: RefCell<Rc<CompositionState>>,
    subscribers: Rc<RefCell<Subscribers>>,
    /// Fingerprint of the last preset restored by `sync_saved_settings`.
    last_synced: RefCell<Option<String>>,
    revision: Cell<u64>,
    exporting: Cell<bool>,
}

/// Holds the composition's export slot until dropped.
pub(crate) struct ExportClaim<'a>(&'a Cell<bool>);

impl Drop for ExportClaim<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Shared handle to one composition.
#[derive(Clone)]
pub struct CompositionSession {
    inner: Rc<Inner>,
}

impl CompositionSession {
    /// Starts a session from any product config, bypassing the registry.
    pub fn new(config: Arc<ProductConfig>, brand_name: &str) -> Self {
        let state = CompositionState::new(&config, brand_name);
        Self {
            inner: Rc::new(Inner {
                config,
                state: RefCell::new(Rc::new(state)),
                subscribers: Rc::new(RefCell::new(Subscribers::default())),
                last_synced: RefCell::new(None),
                revision: Cell::new(0),
                exporting: Cell::new(false),
            }),
        }
    }

    /// Starts a session for a catalogue product.
    pub fn from_registry(registry: &ProductRegistry, product_id: &str, brand_name: &str) -> Result<Self> {
        Ok(Self::new(registry.require(product_id)?, brand_name))
    }

    pub fn config(&self) -> &Arc<ProductConfig> {
        &self.inner.config
    }

    /// The current immutable snapshot.
    pub fn state(&self) -> Rc<CompositionState> {
        Rc::clone(&self.inner.state.borrow())
    }

    /// Number of snapshots that differed from their predecessor.
    pub fn revision(&self) -> u64 {
        self.inner.revision.get()
    }

    /// Whether an export of this composition is running.
    pub fn is_exporting(&self) -> bool {
        self.inner.exporting.get()
    }

    /// Claims the composition for one export, or `None` while another
    /// export of it is running.
    pub(crate) fn begin_export(&self) -> Option<ExportClaim<'_>> {
        if self.inner.exporting.replace(true) {
            return None;
        }
        Some(ExportClaim(&self.inner.exporting))
    }

    /// Applies one action. Returns `true` if the state changed.
    pub fn dispatch(&self, action: Action) -> bool {
        let current = self.state();
        let next = transition(&self.inner.config, &current, action);
        if next == *current {
            return false;
        }
        *self.inner.state.borrow_mut() = Rc::new(next);
        self.inner.revision.set(self.inner.revision.get() + 1);
        true
    }

    /// Applies several actions, publishing only the final snapshot.
    pub fn dispatch_all(&self, actions: impl IntoIterator<Item = Action>) -> bool {
        let current = self.state();
        let next = actions
            .into_iter()
            .fold((*current).clone(), |acc, action| {
                transition(&self.inner.config, &acc, action)
            });
        if next == *current {
            return false;
        }
        *self.inner.state.borrow_mut() = Rc::new(next);
        self.inner.revision.set(self.inner.revision.get() + 1);
        true
    }

    // ---- Subscriptions ----

    /// Registers a listener for session events.
    pub fn subscribe(&self, listener: impl Fn(&SessionEvent) + 'static) -> Subscription {
        let listener: Listener = Rc::new(listener);
        let mut subscribers = self.inner.subscribers.borrow_mut();
        subscribers.next_id += 1;
        let id = subscribers.next_id;
        subscribers.listeners.push((id, listener));
        Subscription {
            subscribers: Rc::downgrade(&self.inner.subscribers),
            id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().listeners.len()
    }

    fn publish(&self, event: &SessionEvent) {
        // Listeners may subscribe, unsubscribe or dispatch while being notified
        let listeners: Vec<Listener> = self
            .inner
            .subscribers
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    // ---- Presets ----

    /// The persisted portion of the current state.
    pub fn brand_settings(&self) -> BrandSettings {
        BrandSettings::from_state(&self.state())
    }

    /// Replaces brand text and all text items in one transition.
    pub fn restore_brand_settings(&self, settings: &BrandSettings) {
        self.dispatch(Action::RestoreBrandSettings(settings.clone()));
    }

    /// Restores a saved preset once per distinct snapshot.
    ///
    /// Hosts call this whenever their stored preset may have changed; the
    /// same snapshot is never re-applied over later edits. Returns `true`
    /// when the preset was applied.
    pub fn sync_saved_settings(&self, saved: Option<&BrandSettings>) -> bool {
        let Some(settings) = saved else {
            return false;
        };
        let fingerprint = match settings.to_json() {
            Ok(json) => json,
            Err(e) => {
                log::warn!("cannot fingerprint saved settings: {e}");
                return false;
            }
        };
        if self.inner.last_synced.borrow().as_deref() == Some(fingerprint.as_str()) {
            return false;
        }
        self.restore_brand_settings(settings);
        *self.inner.last_synced.borrow_mut() = Some(fingerprint);
        log::debug!("restored saved brand settings");
        true
    }

    // ---- Background removal ----

    /// Starts logo background removal.
    ///
    /// Returns `None` when there is no logo or a request for the slot is
    /// already running; duplicates are dropped.
    pub fn begin_logo_removal(&self) -> Option<RemovalRequest> {
        let state = self.state();
        if state.background_removal.removing_logo {
            log::debug!("logo background removal already running, ignoring request");
            return None;
        }
        let source_url = state.logo.source_url.clone()?;
        self.dispatch(Action::SetLogoRemovalInProgress(true));
        Some(RemovalRequest {
            slot: RemovalSlot::Logo,
            source_url,
        })
    }

    /// Starts background removal of the custom product photo.
    pub fn begin_photo_removal(&self) -> Option<RemovalRequest> {
        let state = self.state();
        if state.background_removal.removing_photo {
            log::debug!("photo background removal already running, ignoring request");
            return None;
        }
        let source_url = state.custom_photo_url.clone()?;
        self.dispatch(Action::SetPhotoRemovalInProgress(true));
        Some(RemovalRequest {
            slot: RemovalSlot::ProductPhoto,
            source_url,
        })
    }

    /// Records the outcome of a removal request.
    ///
    /// Success stores the processed URL and notifies subscribers. Failure is
    /// logged and only clears the in-progress flag. Results for a source
    /// that was replaced in the meantime are discarded.
    pub fn complete_removal(&self, request: &RemovalRequest, outcome: Result<String>) -> Option<String> {
        let (done, current_source) = match request.slot {
            RemovalSlot::Logo => (
                Action::SetLogoRemovalInProgress(false),
                self.state().logo.source_url.clone(),
            ),
            RemovalSlot::ProductPhoto => (
                Action::SetPhotoRemovalInProgress(false),
                self.state().custom_photo_url.clone(),
            ),
        };

        let url = match outcome {
            Ok(url) if current_source.as_deref() == Some(request.source_url.as_str()) => url,
            Ok(_) => {
                log::debug!("{} changed during background removal, discarding result", request.slot);
                self.dispatch(done);
                return None;
            }
            Err(e) => {
                log::warn!("{} background removal failed: {e}", request.slot);
                self.dispatch(done);
                return None;
            }
        };

        let store = match request.slot {
            RemovalSlot::Logo => Action::SetProcessedLogoUrl(Some(url.clone())),
            RemovalSlot::ProductPhoto => Action::SetProcessedPhotoUrl(Some(url.clone())),
        };
        self.dispatch_all([store, done]);
        log::info!("{} background removed", request.slot);
        self.publish(&SessionEvent::Processed {
            slot: request.slot,
            url: url.clone(),
        });
        Some(url)
    }

    /// Runs a whole removal round trip for a slot.
    pub async fn remove_background(
        &self,
        slot: RemovalSlot,
        remover: &dyn BackgroundRemover,
        fetcher: &dyn ImageFetcher,
    ) -> Option<String> {
        let request = match slot {
            RemovalSlot::Logo => self.begin_logo_removal(),
            RemovalSlot::ProductPhoto => self.begin_photo_removal(),
        }?;
        let outcome = removal::process(&request, remover, fetcher).await;
        self.complete_removal(&request, outcome)
    }

    // ---- Assets ----

    /// Loads the product photo for the current state into the surface.
    ///
    /// A failed load flags `photo_load_failed` so rendering falls back to the
    /// vector silhouette until the color changes. Returns `true` when a photo
    /// is ready to draw.
    pub async fn load_product_photo(&self, surface: &RenderSurface, fetcher: &dyn ImageFetcher) -> bool {
        let state = self.state();
        if state.ui.photo_load_failed {
            return false;
        }
        let Some(url) = state.effective_photo_url(&self.inner.config) else {
            return false;
        };
        match surface.preload(&url, fetcher).await {
            Ok(_) => true,
            Err(_) => {
                // The color may have changed while loading
                let current = self.state().effective_photo_url(&self.inner.config);
                if current.as_deref() == Some(url.as_str()) {
                    self.dispatch(Action::PhotoLoadFailed);
                }
                false
            }
        }
    }
}

impl Configurable for CompositionSession {
    fn apply_settings(&mut self, settings: &BrandSettings) {
        self.restore_brand_settings(settings);
    }

    fn export_settings(&self) -> BrandSettings {
        self.brand_settings()
    }
}

// ============================================================================
// Tests
// ============================================================================

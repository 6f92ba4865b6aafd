//! Pointer input: window-level listeners and drag gestures.
//!
//! A host forwards pointer-downs on the surface to [`DragController`] and
//! every window-level pointer event to the shared [`PointerHub`]. Gestures
//! register on the hub only while they run; their [`ListenerGuard`]
//! unregisters them on release, cancel or teardown.

mod drag;

pub use drag::{DragController, Gesture, ResizeGesture};

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

/// Stage of a pointer interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// Input device behind a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PointerSource {
    #[default]
    Mouse,
    Touch,
}

/// A pointer event in client (viewport) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub client_x: f32,
    pub client_y: f32,
    #[serde(default)]
    pub source: PointerSource,
}

impl PointerEvent {
    pub fn new(phase: PointerPhase, client_x: f32, client_y: f32) -> Self {
        Self {
            phase,
            client_x,
            client_y,
            source: PointerSource::Mouse,
        }
    }

    pub fn down(client_x: f32, client_y: f32) -> Self {
        Self::new(PointerPhase::Down, client_x, client_y)
    }

    pub fn moved(client_x: f32, client_y: f32) -> Self {
        Self::new(PointerPhase::Move, client_x, client_y)
    }

    pub fn up(client_x: f32, client_y: f32) -> Self {
        Self::new(PointerPhase::Up, client_x, client_y)
    }

    pub fn touch(mut self) -> Self {
        self.source = PointerSource::Touch;
        self
    }

    /// Whether this event ends a running gesture.
    pub fn ends_gesture(&self) -> bool {
        matches!(self.phase, PointerPhase::Up | PointerPhase::Cancel)
    }
}

// ============================================================================
// PointerHub
// ============================================================================

type Listener = Rc<dyn Fn(&PointerEvent)>;

#[derive(Default)]
struct HubInner {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Window-level pointer listeners.
#[derive(Clone, Default)]
pub struct PointerHub {
    inner: Rc<RefCell<HubInner>>,
}

impl PointerHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for every subsequent pointer event.
    pub fn listen(&self, listener: impl Fn(&PointerEvent) + 'static) -> ListenerGuard {
        let listener: Listener = Rc::new(listener);
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.listeners.push((id, listener));
        ListenerGuard {
            hub: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Delivers an event to every listener registered when it was raised.
    pub fn dispatch(&self, event: &PointerEvent) {
        // Listeners unregister themselves on release
        let listeners: Vec<Listener> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

/// Unregisters a hub listener when dropped.
#[must_use = "the listener is removed as soon as the guard is dropped"]
pub struct ListenerGuard {
    hub: Weak<RefCell<HubInner>>,
    id: u64,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.borrow_mut().listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn guard_unregisters_on_drop() {
        let hub = PointerHub::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let guard = hub.listen(move |_| counter.set(counter.get() + 1));

        hub.dispatch(&PointerEvent::moved(1.0, 1.0));
        assert_eq!(hub.listener_count(), 1);
        drop(guard);
        hub.dispatch(&PointerEvent::moved(2.0, 2.0));

        assert_eq!(hits.get(), 1);
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn listener_may_remove_itself_while_dispatching() {
        let hub = PointerHub::new();
        let slot: Rc<RefCell<Option<ListenerGuard>>> = Rc::new(RefCell::new(None));
        let weak_slot = Rc::downgrade(&slot);
        let guard = hub.listen(move |event| {
            if event.ends_gesture()
                && let Some(slot) = weak_slot.upgrade()
            {
                slot.borrow_mut().take();
            }
        });
        *slot.borrow_mut() = Some(guard);

        hub.dispatch(&PointerEvent::up(0.0, 0.0).touch());
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn pointer_event_json() {
        let event: PointerEvent =
            serde_json::from_str(r#"{"phase":"move","clientX":3,"clientY":4}"#).unwrap();
        assert_eq!(event, PointerEvent::moved(3.0, 4.0));
    }
}

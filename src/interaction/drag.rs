//! Drag and resize gestures.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::{ListenerGuard, PointerEvent, PointerHub, PointerPhase};
use crate::geometry::{self, AxisScale, ContainerRect, Corner};
use crate::render::layout::{Hit, SurfaceLayout};
use crate::session::CompositionSession;
use crate::state::{Action, EditTarget, TextPatch};

/// What a running gesture manipulates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// Moving the logo within the logo print area.
    Logo,
    /// Moving brand text or a text item within the text print area.
    Text(EditTarget),
    /// Scaling brand text or a text item from one of its corner handles.
    Resize(ResizeGesture),
}

/// A corner resize in progress.
///
/// Scales are derived from the total pointer travel since the gesture began,
/// so the result does not depend on how many moves were delivered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeGesture {
    pub target: EditTarget,
    pub corner: Corner,
    /// Pointer position at gesture start, in client pixels.
    pub origin: (f32, f32),
    /// Axis scale at gesture start.
    pub start: AxisScale,
}

impl ResizeGesture {
    /// The clamped axis scale for the pointer at `(client_x, client_y)`.
    pub fn scale_at(&self, client_x: f32, client_y: f32) -> AxisScale {
        geometry::resize_from_corner(
            self.start,
            self.corner,
            client_x - self.origin.0,
            client_y - self.origin.1,
        )
    }
}

struct ActiveGesture {
    gesture: Gesture,
    _listener: ListenerGuard,
}

type ActiveSlot = Rc<RefCell<Option<ActiveGesture>>>;

/// Starts gestures from pointer-downs on the surface.
///
/// Only one gesture runs at a time. Its move and release handling is a
/// window-level listener on the [`PointerHub`], so dragging continues when
/// the pointer leaves the surface.
pub struct DragController {
    session: CompositionSession,
    hub: PointerHub,
    active: ActiveSlot,
}

impl DragController {
    pub fn new(session: CompositionSession, hub: PointerHub) -> Self {
        Self {
            session,
            hub,
            active: Rc::new(RefCell::new(None)),
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.active.borrow().is_some()
    }

    pub fn active_gesture(&self) -> Option<Gesture> {
        self.active.borrow().as_ref().map(|active| active.gesture)
    }

    /// Handles a pointer-down on the surface.
    ///
    /// `layout` must describe what is currently drawn and `rect` where the
    /// surface sits in the viewport. Returns `true` when a gesture started.
    pub fn pointer_down(&self, event: &PointerEvent, layout: &SurfaceLayout, rect: &ContainerRect) -> bool {
        if self.is_dragging() {
            log::debug!("pointer down during an active gesture, ignoring");
            return false;
        }

        let pos = geometry::client_to_percent(event.client_x, event.client_y, rect);
        let gesture = match layout.hit_test(pos) {
            None => {
                if self.session.state().selected_text_id().is_some() {
                    self.session.dispatch(Action::SelectText(EditTarget::Brand));
                }
                return false;
            }
            Some(Hit::Logo) => Gesture::Logo,
            Some(Hit::Brand) => {
                self.session.dispatch(Action::SelectText(EditTarget::Brand));
                Gesture::Text(EditTarget::Brand)
            }
            Some(Hit::TextItem(id)) => {
                self.session
                    .dispatch(Action::SelectText(EditTarget::TextItem(id)));
                Gesture::Text(EditTarget::TextItem(id))
            }
            Some(Hit::ResizeHandle { target, corner }) => {
                let state = self.session.state();
                let start = match target {
                    EditTarget::Brand => state.brand.text.axis_scale(),
                    EditTarget::TextItem(id) => match state.text_item(id) {
                        Some(item) => item.text.axis_scale(),
                        None => return false,
                    },
                };
                Gesture::Resize(ResizeGesture {
                    target,
                    corner,
                    origin: (event.client_x, event.client_y),
                    start,
                })
            }
        };

        let listener = self.hub.listen(gesture_listener(
            self.session.clone(),
            Rc::downgrade(&self.active),
            gesture,
            *rect,
        ));
        *self.active.borrow_mut() = Some(ActiveGesture {
            gesture,
            _listener: listener,
        });
        log::debug!("{gesture:?} gesture started");
        true
    }

    /// Ends the running gesture, keeping whatever was last applied.
    pub fn cancel(&self) {
        let ended = self.active.borrow_mut().take();
        if let Some(active) = ended {
            log::debug!("{:?} gesture cancelled", active.gesture);
        }
    }
}

impl Drop for DragController {
    fn drop(&mut self) {
        self.active.borrow_mut().take();
    }
}

fn gesture_listener(
    session: CompositionSession,
    active: Weak<RefCell<Option<ActiveGesture>>>,
    gesture: Gesture,
    rect: ContainerRect,
) -> impl Fn(&PointerEvent) + 'static {
    move |event| match event.phase {
        PointerPhase::Move => apply_move(&session, gesture, event, &rect),
        PointerPhase::Up | PointerPhase::Cancel => {
            if let Some(active) = active.upgrade() {
                let ended = active.borrow_mut().take();
                if ended.is_some() {
                    log::debug!("{gesture:?} gesture ended");
                }
            }
        }
        PointerPhase::Down => {}
    }
}

fn apply_move(session: &CompositionSession, gesture: Gesture, event: &PointerEvent, rect: &ContainerRect) {
    let config = session.config();
    let raw = geometry::client_to_percent(event.client_x, event.client_y, rect);
    let action = match gesture {
        Gesture::Logo => Action::SetLogoPosition(geometry::constrain_to_area(
            raw.x,
            raw.y,
            &config.logo_print_area,
        )),
        Gesture::Text(target) => update_text(
            target,
            TextPatch::position(geometry::constrain_to_area(
                raw.x,
                raw.y,
                &config.text_print_area,
            )),
        ),
        Gesture::Resize(resize) => update_text(
            resize.target,
            TextPatch::axis_scale(resize.scale_at(event.client_x, event.client_y)),
        ),
    };
    session.dispatch(action);
}

fn update_text(target: EditTarget, patch: TextPatch) -> Action {
    match target {
        EditTarget::Brand => Action::UpdateBrand(patch),
        EditTarget::TextItem(id) => Action::UpdateTextItem { id, patch },
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Position;
    use crate::product::tests::test_product;
    use crate::render::layout::LayoutMode;
    use crate::state::TextItem;
    use std::sync::Arc;

    const RECT: ContainerRect = ContainerRect {
        left: 0.0,
        top: 0.0,
        width: 600.0,
        height: 600.0,
    };

    fn setup() -> (CompositionSession, PointerHub, DragController) {
        let session = CompositionSession::new(Arc::new(test_product()), "Acme");
        let hub = PointerHub::new();
        let controller = DragController::new(session.clone(), hub.clone());
        (session, hub, controller)
    }

    fn preview_layout(session: &CompositionSession) -> SurfaceLayout {
        SurfaceLayout::compute(session.config(), &session.state(), None, LayoutMode::Preview)
    }

    /// Client coordinates of a percent position inside `RECT`.
    fn client(pos: Position) -> (f32, f32) {
        (pos.x * 6.0, pos.y * 6.0)
    }

    #[test]
    fn logo_drag_is_clamped_to_print_area() {
        let (session, hub, controller) = setup();
        session.dispatch(Action::SetLogoSource(Some("logo.png".into())));
        let (x, y) = client(session.state().logo.position);

        assert!(controller.pointer_down(&PointerEvent::down(x, y), &preview_layout(&session), &RECT));
        assert_eq!(controller.active_gesture(), Some(Gesture::Logo));

        hub.dispatch(&PointerEvent::moved(720.0, 60.0));
        assert_eq!(session.state().logo.position, Position::new(75.0, 18.0));

        // Release far outside keeps the clamped position
        hub.dispatch(&PointerEvent::up(2000.0, -500.0));
        assert_eq!(session.state().logo.position, Position::new(75.0, 18.0));
        assert!(!controller.is_dragging());
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn text_drag_selects_the_item() {
        let (session, hub, controller) = setup();
        let config = test_product();
        let first = TextItem::new(&config, "First");
        let first_id = first.id;
        session.dispatch(Action::AddText(first));
        session.dispatch(Action::SelectText(EditTarget::Brand));

        let (x, y) = client(config.default_text.position);
        assert!(controller.pointer_down(&PointerEvent::down(x, y), &preview_layout(&session), &RECT));
        assert_eq!(session.state().edit_target, EditTarget::TextItem(first_id));

        hub.dispatch(&PointerEvent::moved(0.0, 0.0).touch());
        let moved = session.state().text_item(first_id).unwrap().text.position;
        assert_eq!(moved, Position::new(20.0, 60.0));
        // Brand text shares the anchor but was not the target
        assert_eq!(session.state().brand.text.position, config.default_text.position);

        hub.dispatch(&PointerEvent::new(PointerPhase::Cancel, 0.0, 0.0));
        assert!(!controller.is_dragging());
    }

    #[test]
    fn corner_resize_scales_each_axis() {
        let (session, hub, controller) = setup();
        let config = test_product();
        let item = TextItem::new(&config, "Hi");
        let id = item.id;
        session.dispatch(Action::AddText(item));

        let layout = preview_layout(&session);
        let (_, _, handle) = layout
            .handles
            .iter()
            .find(|(_, corner, _)| *corner == Corner::BottomRight)
            .copied()
            .unwrap();
        let (x, y) = client(Position::new(
            handle.left + handle.width / 2.0,
            handle.top + handle.height / 2.0,
        ));

        assert!(controller.pointer_down(&PointerEvent::down(x, y), &layout, &RECT));
        assert!(matches!(controller.active_gesture(), Some(Gesture::Resize(_))));

        hub.dispatch(&PointerEvent::moved(x + 50.0, y + 50.0));
        hub.dispatch(&PointerEvent::moved(x + 100.0, y + 50.0));
        let text = session.state().text_item(id).unwrap().text.clone();
        assert!((text.scale_x.unwrap() - 2.0).abs() < 1e-4);
        assert!((text.scale_y.unwrap() - 1.5).abs() < 1e-4);
        assert!((text.scale - 1.75).abs() < 1e-4);

        // Huge travel stays within the text range
        hub.dispatch(&PointerEvent::moved(x + 10_000.0, y - 10_000.0));
        let scale = session.state().text_item(id).unwrap().text.axis_scale();
        assert_eq!(scale, AxisScale::new(8.0, 0.5));
        hub.dispatch(&PointerEvent::up(0.0, 0.0));
    }

    #[test]
    fn brand_text_resizes_from_its_corner() {
        let (session, hub, controller) = setup();
        let layout = preview_layout(&session);
        let (target, corner, handle) = layout.handles[0];
        assert_eq!(target, EditTarget::Brand);
        let (x, y) = client(Position::new(
            handle.left + handle.width / 2.0,
            handle.top + handle.height / 2.0,
        ));

        assert!(controller.pointer_down(&PointerEvent::down(x, y), &layout, &RECT));
        assert!(matches!(
            controller.active_gesture(),
            Some(Gesture::Resize(ResizeGesture { target: EditTarget::Brand, .. }))
        ));

        // Outward travel from the grabbed corner grows both axes
        let (dx, dy) = (corner.x_sign() * 200.0, corner.y_sign() * 100.0);
        hub.dispatch(&PointerEvent::moved(x + dx, y + dy));
        let scale = session.state().brand.text.axis_scale();
        assert!((scale.x - 3.0).abs() < 1e-4);
        assert!((scale.y - 2.0).abs() < 1e-4);

        hub.dispatch(&PointerEvent::up(x + dx, y + dy));
        assert!(!controller.is_dragging());
    }

    #[test]
    fn second_down_during_gesture_is_ignored() {
        let (session, _hub, controller) = setup();
        session.dispatch(Action::SetLogoSource(Some("logo.png".into())));
        let layout = preview_layout(&session);
        let (x, y) = client(session.state().logo.position);

        assert!(controller.pointer_down(&PointerEvent::down(x, y), &layout, &RECT));
        assert!(!controller.pointer_down(&PointerEvent::down(x, y), &layout, &RECT));
        assert_eq!(controller.active_gesture(), Some(Gesture::Logo));
    }

    #[test]
    fn down_on_empty_space_deselects() {
        let (session, hub, controller) = setup();
        let config = test_product();
        session.dispatch(Action::AddText(TextItem::new(&config, "Label")));
        assert!(session.state().selected_text_id().is_some());

        assert!(!controller.pointer_down(&PointerEvent::down(5.0, 5.0), &preview_layout(&session), &RECT));
        assert_eq!(session.state().edit_target, EditTarget::Brand);
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn teardown_mid_gesture_removes_listeners() {
        let (session, hub, controller) = setup();
        session.dispatch(Action::SetLogoSource(Some("logo.png".into())));
        let (x, y) = client(session.state().logo.position);
        assert!(controller.pointer_down(&PointerEvent::down(x, y), &preview_layout(&session), &RECT));
        assert_eq!(hub.listener_count(), 1);

        drop(controller);
        assert_eq!(hub.listener_count(), 0);

        // Late events have nothing to update
        let before = session.state();
        hub.dispatch(&PointerEvent::moved(0.0, 0.0));
        assert_eq!(*session.state(), *before);
    }
}

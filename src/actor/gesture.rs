//! Turns raw pointer and wheel input into window mutations.
//!
//! Every window is in exactly one [`GestureState`]. Header presses drag,
//! resize handles resize, and content presses pan; a second touch landing on
//! a panning window upgrades the pan to a pinch. Global drag and resize
//! exclusivity is enforced by the [`WindowManager`], which owns those
//! trackers.

use tracing::{debug, trace};

use crate::common::collections::HashMap;
use crate::common::config::GestureSettings;
use crate::layout_engine::WindowManager;
use crate::layout_engine::geometry::ResizeEdge;
use crate::model::window::ContentId;
use crate::sys::event::{HitTarget, PointerEvent, PointerId, PointerKind, WheelEvent};
use crate::sys::geometry::Point;

#[derive(Debug, Clone, PartialEq)]
pub enum GestureState {
    Idle,
    Dragging {
        pointer: PointerId,
    },
    Resizing {
        pointer: PointerId,
        edge: ResizeEdge,
    },
    Panning {
        pointer: PointerId,
        last: Point,
    },
    Pinching {
        fingers: [(PointerId, Point); 2],
        /// Floored finger distance at the last applied update.
        last_distance: f64,
    },
}

/// What a routed event did, so the caller can focus, raise or persist.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    Ignored,
    Began(ContentId),
    Moved(ContentId),
    /// A gesture finished normally; its result should be persisted.
    Committed(ContentId),
    /// A gesture was abandoned. Geometry applied so far is kept.
    Cancelled(ContentId),
}

pub struct GestureRouter {
    settings: GestureSettings,
    states: HashMap<ContentId, GestureState>,
    owners: HashMap<PointerId, ContentId>,
}

impl GestureRouter {
    pub fn new(settings: &GestureSettings) -> Self {
        GestureRouter {
            settings: settings.clone(),
            states: HashMap::default(),
            owners: HashMap::default(),
        }
    }

    pub fn state(&self, id: &ContentId) -> GestureState {
        self.states.get(id).cloned().unwrap_or(GestureState::Idle)
    }

    pub fn is_active(&self) -> bool { !self.states.is_empty() }

    pub fn handle_pointer(&mut self, wm: &mut WindowManager, event: PointerEvent) -> GestureOutcome {
        match event {
            PointerEvent::Down { pointer, kind, window, target, at } => {
                self.on_down(wm, pointer, kind, window, target, at)
            }
            PointerEvent::Move { pointer, at } => self.on_move(wm, pointer, at),
            PointerEvent::Up { pointer, at } => self.on_up(wm, pointer, at),
            PointerEvent::Cancel { pointer } => self.on_cancel(wm, pointer),
        }
    }

    fn on_down(
        &mut self,
        wm: &mut WindowManager,
        pointer: PointerId,
        kind: PointerKind,
        id: ContentId,
        target: HitTarget,
        at: Point,
    ) -> GestureOutcome {
        if self.owners.contains_key(&pointer) {
            trace!(?pointer, "duplicate pointer down");
            return GestureOutcome::Ignored;
        }
        if wm.window(&id).is_none() {
            trace!(%id, "pointer down on unknown window");
            return GestureOutcome::Ignored;
        }

        match self.state(&id) {
            GestureState::Idle => {}
            GestureState::Panning { pointer: first, last }
                if kind == PointerKind::Touch && target == HitTarget::Content =>
            {
                let distance = last.distance(at).max(self.settings.pinch_min_distance);
                self.owners.insert(pointer, id.clone());
                self.states.insert(id.clone(), GestureState::Pinching {
                    fingers: [(first, last), (pointer, at)],
                    last_distance: distance,
                });
                debug!(%id, "pan upgraded to pinch");
                return GestureOutcome::Began(id);
            }
            state => {
                trace!(%id, ?state, "window already has a gesture");
                return GestureOutcome::Ignored;
            }
        }

        let state = match target {
            HitTarget::Header => match wm.begin_drag(&id, pointer, at) {
                Ok(true) => GestureState::Dragging { pointer },
                Ok(false) => return GestureOutcome::Ignored,
                Err(e) => {
                    trace!(%id, "drag refused: {e}");
                    return GestureOutcome::Ignored;
                }
            },
            HitTarget::Resize(edge) => match wm.begin_resize(&id, edge, pointer, at) {
                Ok(true) => GestureState::Resizing { pointer, edge },
                Ok(false) => return GestureOutcome::Ignored,
                Err(e) => {
                    trace!(%id, "resize refused: {e}");
                    return GestureOutcome::Ignored;
                }
            },
            HitTarget::Content => GestureState::Panning { pointer, last: at },
            HitTarget::Control => return GestureOutcome::Ignored,
        };
        self.owners.insert(pointer, id.clone());
        self.states.insert(id.clone(), state);
        GestureOutcome::Began(id)
    }

    fn on_move(&mut self, wm: &mut WindowManager, pointer: PointerId, at: Point) -> GestureOutcome {
        let Some(id) = self.owners.get(&pointer).cloned() else {
            trace!(?pointer, "move from untracked pointer");
            return GestureOutcome::Ignored;
        };
        let Some(state) = self.states.get_mut(&id) else {
            return GestureOutcome::Ignored;
        };

        match state {
            GestureState::Idle => GestureOutcome::Ignored,
            GestureState::Dragging { .. } => match wm.drag_to(pointer, at) {
                Some(id) => GestureOutcome::Moved(id),
                None => GestureOutcome::Ignored,
            },
            GestureState::Resizing { .. } => match wm.resize_to(pointer, at) {
                Some(id) => GestureOutcome::Moved(id),
                None => GestureOutcome::Ignored,
            },
            GestureState::Panning { last, .. } => {
                let delta = last.delta_to(at);
                *last = at;
                // content follows the finger, so the scroll moves the other way
                match wm.pan_by(&id, Point::new(-delta.x, -delta.y)) {
                    Ok(()) => GestureOutcome::Moved(id),
                    Err(e) => {
                        trace!(%id, "pan refused: {e}");
                        GestureOutcome::Ignored
                    }
                }
            }
            GestureState::Pinching { fingers, last_distance } => {
                for finger in fingers.iter_mut() {
                    if finger.0 == pointer {
                        finger.1 = at;
                    }
                }
                let [(_, a), (_, b)] = *fingers;
                let distance = a.distance(b).max(self.settings.pinch_min_distance);
                let Some(factor) = pinch_factor(&self.settings, *last_distance, distance) else {
                    return GestureOutcome::Ignored;
                };
                *last_distance = distance;

                let Some(window) = wm.window(&id) else { return GestureOutcome::Ignored };
                let local = window.viewport_origin(&wm.chrome()).delta_to(a.midpoint(b));
                match wm.zoom_at(&id, factor, local) {
                    Ok(()) => GestureOutcome::Moved(id),
                    Err(e) => {
                        trace!(%id, "pinch refused: {e}");
                        GestureOutcome::Ignored
                    }
                }
            }
        }
    }

    fn on_up(&mut self, wm: &mut WindowManager, pointer: PointerId, at: Point) -> GestureOutcome {
        let Some(id) = self.end(wm, pointer) else {
            trace!(?pointer, ?at, "release from untracked pointer");
            return GestureOutcome::Ignored;
        };
        GestureOutcome::Committed(id)
    }

    fn on_cancel(&mut self, wm: &mut WindowManager, pointer: PointerId) -> GestureOutcome {
        match self.end(wm, pointer) {
            Some(id) => GestureOutcome::Cancelled(id),
            None => GestureOutcome::Ignored,
        }
    }

    /// Returns the window whose gesture `pointer` ended, back in `Idle`.
    fn end(&mut self, wm: &mut WindowManager, pointer: PointerId) -> Option<ContentId> {
        let id = self.owners.remove(&pointer)?;
        match self.states.remove(&id) {
            Some(GestureState::Dragging { .. }) => {
                wm.end_drag(pointer);
            }
            Some(GestureState::Resizing { .. }) => {
                wm.end_resize(pointer);
            }
            Some(GestureState::Pinching { fingers, .. }) => {
                // lifting either finger ends the pinch
                for (finger, _) in fingers {
                    self.owners.remove(&finger);
                }
            }
            _ => {}
        }
        Some(id)
    }

    pub fn on_wheel(&mut self, wm: &mut WindowManager, event: WheelEvent) -> GestureOutcome {
        let WheelEvent { window: id, at, delta, zoom } = event;
        if !matches!(self.state(&id), GestureState::Idle) {
            trace!(%id, "wheel during active gesture");
            return GestureOutcome::Ignored;
        }
        let result = if zoom {
            if delta.y == 0.0 {
                return GestureOutcome::Ignored;
            }
            let step = self.settings.wheel_zoom_step;
            let factor = if delta.y < 0.0 { 1.0 + step } else { 1.0 - step };
            match wm.window(&id) {
                Some(window) => {
                    let local = window.viewport_origin(&wm.chrome()).delta_to(at);
                    wm.zoom_at(&id, factor, local)
                }
                None => return GestureOutcome::Ignored,
            }
        } else {
            wm.pan_by(&id, delta)
        };
        match result {
            Ok(()) => GestureOutcome::Committed(id),
            Err(e) => {
                trace!(%id, "wheel refused: {e}");
                GestureOutcome::Ignored
            }
        }
    }

    /// Window lost focus: every gesture is dropped back to idle.
    pub fn on_blur(&mut self, wm: &mut WindowManager) -> Vec<ContentId> {
        let mut ids: Vec<ContentId> = self.states.drain().map(|(id, _)| id).collect();
        ids.sort();
        self.owners.clear();
        wm.cancel_gestures();
        if !ids.is_empty() {
            debug!(?ids, "gestures cancelled by blur");
        }
        ids
    }

    /// Drops any gesture state for a window that no longer exists.
    pub fn forget(&mut self, id: &ContentId) {
        self.states.remove(id);
        self.owners.retain(|_, owner| owner != id);
    }
}

/// Per-frame scale multiplier, or `None` when the change is below the
/// jitter threshold.
fn pinch_factor(settings: &GestureSettings, last: f64, current: f64) -> Option<f64> {
    if last <= 0.0 || !current.is_finite() {
        return None;
    }
    let max_step = settings.pinch_max_step;
    let ratio = (current / last).clamp(1.0 - max_step, 1.0 + max_step);
    if (ratio - 1.0).abs() < settings.pinch_epsilon {
        return None;
    }
    Some(ratio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::{GeometrySettings, HostSettings};
    use crate::sys::geometry::{IsWithin, Size};
    use crate::sys::host::GridCanvas;

    const MOUSE: PointerId = PointerId(1);
    const FINGER_A: PointerId = PointerId(10);
    const FINGER_B: PointerId = PointerId(11);

    fn setup() -> (WindowManager, GestureRouter, ContentId) {
        let host = GridCanvas::from_settings(&HostSettings::default());
        let mut wm = WindowManager::new(
            &GeometrySettings::default(),
            &HostSettings::default(),
            Box::new(host),
            Size::new(1920.0, 1080.0),
        );
        let id = ContentId::from("panel-1");
        wm.open(&id, None).unwrap();
        (wm, GestureRouter::new(&GestureSettings::default()), id)
    }

    fn down(pointer: PointerId, kind: PointerKind, id: &ContentId, target: HitTarget, at: Point) -> PointerEvent {
        PointerEvent::Down { pointer, kind, window: id.clone(), target, at }
    }

    #[test]
    fn header_drag_moves_and_commits() {
        let (mut wm, mut router, id) = setup();
        let start = wm.window(&id).unwrap().frame.origin;
        let at = Point::new(100.0, 20.0);

        let outcome =
            router.handle_pointer(&mut wm, down(MOUSE, PointerKind::Mouse, &id, HitTarget::Header, at));
        assert_eq!(outcome, GestureOutcome::Began(id.clone()));
        assert_eq!(router.state(&id), GestureState::Dragging { pointer: MOUSE });

        router.handle_pointer(&mut wm, PointerEvent::Move { pointer: MOUSE, at: at.offset(40.0, 15.0) });
        let outcome =
            router.handle_pointer(&mut wm, PointerEvent::Up { pointer: MOUSE, at: at.offset(40.0, 15.0) });
        assert_eq!(outcome, GestureOutcome::Committed(id.clone()));
        assert_eq!(router.state(&id), GestureState::Idle);
        assert!(!router.is_active());
        assert_eq!(wm.window(&id).unwrap().frame.origin, start.offset(40.0, 15.0));
    }

    #[test]
    fn foreign_pointer_events_are_ignored() {
        let (mut wm, mut router, id) = setup();
        let at = Point::new(100.0, 20.0);
        router.handle_pointer(&mut wm, down(MOUSE, PointerKind::Mouse, &id, HitTarget::Header, at));
        let before = wm.window(&id).unwrap().frame;

        let stray = PointerEvent::Move { pointer: PointerId(99), at: Point::new(900.0, 900.0) };
        assert_eq!(router.handle_pointer(&mut wm, stray), GestureOutcome::Ignored);
        let stray_up = PointerEvent::Up { pointer: PointerId(99), at: Point::ZERO };
        assert_eq!(router.handle_pointer(&mut wm, stray_up), GestureOutcome::Ignored);
        assert_eq!(wm.window(&id).unwrap().frame, before);
        assert_eq!(router.state(&id), GestureState::Dragging { pointer: MOUSE });
    }

    #[test]
    fn content_drag_pans_opposite_to_pointer() {
        let (mut wm, mut router, id) = setup();
        wm.zoom_at(&id, 2.0, Point::ZERO).unwrap();
        let at = Point::new(200.0, 200.0);
        router.handle_pointer(&mut wm, down(MOUSE, PointerKind::Mouse, &id, HitTarget::Content, at));
        router.handle_pointer(&mut wm, PointerEvent::Move { pointer: MOUSE, at: at.offset(-30.0, -10.0) });
        assert_eq!(wm.window(&id).unwrap().scroll, Point::new(30.0, 10.0));
    }

    #[test]
    fn controls_do_not_start_gestures() {
        let (mut wm, mut router, id) = setup();
        let outcome = router.handle_pointer(
            &mut wm,
            down(MOUSE, PointerKind::Mouse, &id, HitTarget::Control, Point::new(30.0, 20.0)),
        );
        assert_eq!(outcome, GestureOutcome::Ignored);
        assert!(!router.is_active());
    }

    #[test]
    fn second_touch_upgrades_pan_to_pinch() {
        let (mut wm, mut router, id) = setup();
        let a = Point::new(100.0, 200.0);
        let b = Point::new(400.0, 200.0);
        router.handle_pointer(&mut wm, down(FINGER_A, PointerKind::Touch, &id, HitTarget::Content, a));
        let outcome =
            router.handle_pointer(&mut wm, down(FINGER_B, PointerKind::Touch, &id, HitTarget::Content, b));
        assert_eq!(outcome, GestureOutcome::Began(id.clone()));
        assert!(matches!(router.state(&id), GestureState::Pinching { last_distance, .. } if last_distance == 300.0));

        // spread the fingers far apart: one frame is capped at +12%
        let before = wm.window(&id).unwrap().scale;
        router.handle_pointer(&mut wm, PointerEvent::Move { pointer: FINGER_B, at: Point::new(900.0, 200.0) });
        let after = wm.window(&id).unwrap().scale;
        assert!(after.is_within(1e-9, before * 1.12));

        // lifting one finger ends the pinch entirely
        let outcome = router.handle_pointer(&mut wm, PointerEvent::Up { pointer: FINGER_A, at: a });
        assert_eq!(outcome, GestureOutcome::Committed(id.clone()));
        assert_eq!(router.state(&id), GestureState::Idle);
        let stale = PointerEvent::Move { pointer: FINGER_B, at: Point::new(950.0, 200.0) };
        assert_eq!(router.handle_pointer(&mut wm, stale), GestureOutcome::Ignored);
    }

    #[test]
    fn close_fingers_with_jitter_do_not_zoom() {
        let (mut wm, mut router, id) = setup();
        wm.zoom_at(&id, 1.5, Point::ZERO).unwrap();
        let a = Point::new(200.0, 200.0);
        let b = Point::new(250.0, 200.0);
        router.handle_pointer(&mut wm, down(FINGER_A, PointerKind::Touch, &id, HitTarget::Content, a));
        router.handle_pointer(&mut wm, down(FINGER_B, PointerKind::Touch, &id, HitTarget::Content, b));

        let before = wm.window(&id).unwrap().scale;
        for x in [251.0, 249.0, 251.0, 250.0] {
            router.handle_pointer(&mut wm, PointerEvent::Move { pointer: FINGER_B, at: Point::new(x, 200.0) });
        }
        let after = wm.window(&id).unwrap().scale;
        assert!((after - before).abs() < GestureSettings::default().pinch_epsilon);
    }

    #[test]
    fn pinch_factor_thresholds() {
        let settings = GestureSettings::default();
        assert_eq!(pinch_factor(&settings, 200.0, 201.0), None);
        let close = |got: Option<f64>, want: f64| got.is_some_and(|f| f.is_within(1e-9, want));
        assert!(close(pinch_factor(&settings, 200.0, 1000.0), 1.12));
        assert!(close(pinch_factor(&settings, 200.0, 10.0), 0.88));
        assert!(close(pinch_factor(&settings, 200.0, 210.0), 1.05));
        assert_eq!(pinch_factor(&settings, 0.0, 10.0), None);
    }

    #[test]
    fn resize_handle_starts_resize_and_release_floors_scale() {
        let (mut wm, mut router, id) = setup();
        let corner = wm.window(&id).unwrap().frame.max();
        router.handle_pointer(
            &mut wm,
            down(MOUSE, PointerKind::Mouse, &id, HitTarget::Resize(ResizeEdge::Corner), corner),
        );
        assert!(wm.is_resizing(&id));
        router.handle_pointer(&mut wm, PointerEvent::Move { pointer: MOUSE, at: corner.offset(200.0, 200.0) });
        router.handle_pointer(&mut wm, PointerEvent::Up { pointer: MOUSE, at: corner.offset(200.0, 200.0) });
        assert!(!wm.is_resizing(&id));
        assert_eq!(wm.window(&id).unwrap().frame.size, Size::new(604.0, 636.0));
        assert!(wm.window(&id).unwrap().scale.is_within(1e-9, 600.0 / 760.0));
    }

    #[test]
    fn locked_window_refuses_resize_but_allows_drag() {
        let (mut wm, mut router, id) = setup();
        wm.set_locked(&id, true).unwrap();
        let corner = wm.window(&id).unwrap().frame.max();
        let outcome = router.handle_pointer(
            &mut wm,
            down(MOUSE, PointerKind::Mouse, &id, HitTarget::Resize(ResizeEdge::Right), corner),
        );
        assert_eq!(outcome, GestureOutcome::Ignored);

        let outcome = router.handle_pointer(
            &mut wm,
            down(MOUSE, PointerKind::Mouse, &id, HitTarget::Header, Point::new(50.0, 20.0)),
        );
        assert_eq!(outcome, GestureOutcome::Began(id.clone()));
    }

    #[test]
    fn blur_resets_everything() {
        let (mut wm, mut router, id) = setup();
        router.handle_pointer(
            &mut wm,
            down(MOUSE, PointerKind::Mouse, &id, HitTarget::Header, Point::new(50.0, 20.0)),
        );
        assert_eq!(router.on_blur(&mut wm), vec![id.clone()]);
        assert!(!router.is_active());
        assert!(!wm.is_dragging(&id));
        let late = PointerEvent::Move { pointer: MOUSE, at: Point::new(500.0, 500.0) };
        assert_eq!(router.handle_pointer(&mut wm, late), GestureOutcome::Ignored);
    }

    #[test]
    fn wheel_zooms_around_cursor_or_pans() {
        let (mut wm, mut router, id) = setup();
        let before = wm.window(&id).unwrap().scale;
        let zoom_in = WheelEvent { window: id.clone(), at: Point::new(200.0, 200.0), delta: Point::new(0.0, -1.0), zoom: true };
        assert_eq!(router.on_wheel(&mut wm, zoom_in), GestureOutcome::Committed(id.clone()));
        assert!(wm.window(&id).unwrap().scale.is_within(1e-9, before * 1.1));

        let pan = WheelEvent { window: id.clone(), at: Point::ZERO, delta: Point::new(5.0, 7.0), zoom: false };
        let scroll = wm.window(&id).unwrap().scroll;
        router.on_wheel(&mut wm, pan);
        assert_eq!(wm.window(&id).unwrap().scroll, scroll.offset(5.0, 7.0));
    }
}

use std::time::Instant;

use tracing::{debug, trace};

use crate::actor::gesture::GestureOutcome;
use crate::actor::reactor::Reactor;
use crate::sys::event::{PointerEvent, WheelEvent};

pub struct InputEventHandler;

impl InputEventHandler {
    pub fn handle_pointer(reactor: &mut Reactor, event: PointerEvent, now: Instant) {
        if let PointerEvent::Down { window, .. } = &event
            && reactor.windows.window(window).is_some()
        {
            reactor.focus.focus(window);
            if let Err(e) = reactor.windows.bring_to_front(window) {
                trace!("raise on press failed: {e}");
            }
        }

        match reactor.gestures.handle_pointer(&mut reactor.windows, event) {
            GestureOutcome::Committed(id) => reactor.mutated(&id, now),
            GestureOutcome::Cancelled(id) => {
                debug!(%id, "gesture cancelled");
                reactor.mutated(&id, now);
            }
            GestureOutcome::Began(_) | GestureOutcome::Moved(_) | GestureOutcome::Ignored => {}
        }
    }

    pub fn handle_wheel(reactor: &mut Reactor, event: WheelEvent, now: Instant) {
        if let GestureOutcome::Committed(id) = reactor.gestures.on_wheel(&mut reactor.windows, event) {
            reactor.mutated(&id, now);
        }
    }
}

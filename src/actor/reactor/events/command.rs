use std::time::Instant;

use tracing::{debug, info, trace};

use crate::actor::focus::{ShortcutAction, ShortcutCommand};
use crate::actor::reactor::{Reactor, WindowCommand};
use crate::layout_engine::WindowError;
use crate::model::window::ContentId;
use crate::sys::geometry::Point;
use crate::sys::keys::Key;

pub struct CommandEventHandler;

impl CommandEventHandler {
    pub fn handle_key(reactor: &mut Reactor, key: Key, now: Instant) {
        let Some(ShortcutAction { window: id, command }) =
            reactor.focus.on_key(key, now, &reactor.windows)
        else {
            return;
        };
        info!(%id, ?command, "shortcut");
        let step = reactor.pan_step;
        let result = match command {
            ShortcutCommand::Maximize => reactor.windows.maximize(&id),
            ShortcutCommand::Restore => reactor.windows.restore(&id),
            ShortcutCommand::FitToSquare => reactor.windows.fit_to_square(&id),
            ShortcutCommand::CloseAll => {
                reactor.close_all(now);
                return;
            }
            ShortcutCommand::PanLeft => reactor.windows.pan_by(&id, Point::new(-step, 0.0)),
            ShortcutCommand::PanRight => reactor.windows.pan_by(&id, Point::new(step, 0.0)),
            ShortcutCommand::PanUp => reactor.windows.pan_by(&id, Point::new(0.0, -step)),
            ShortcutCommand::PanDown => reactor.windows.pan_by(&id, Point::new(0.0, step)),
        };
        Self::finish(reactor, &id, result, now);
    }

    pub fn handle_window_command(
        reactor: &mut Reactor,
        id: &ContentId,
        cmd: WindowCommand,
        now: Instant,
    ) {
        debug!(%id, ?cmd);
        let windows = &mut reactor.windows;
        let result = match cmd {
            WindowCommand::Maximize => windows.maximize(id),
            WindowCommand::Restore => windows.restore(id),
            WindowCommand::FitToSquare => windows.fit_to_square(id),
            WindowCommand::ToggleLock | WindowCommand::Lock | WindowCommand::Unlock => {
                let result = match cmd {
                    WindowCommand::ToggleLock => windows.toggle_lock(id).map(|_| ()),
                    _ => windows.set_locked(id, cmd == WindowCommand::Lock),
                };
                // lock changes are saved even though the window ends up locked
                match result {
                    Ok(()) => reactor.persistence.schedule_save(now),
                    Err(e) => trace!(%id, "lock change failed: {e}"),
                }
                return;
            }
            WindowCommand::BringToFront => windows.bring_to_front(id),
            WindowCommand::Focus => {
                if windows.window(id).is_some() {
                    reactor.focus.focus(id);
                }
                return;
            }
            WindowCommand::MoveBy(delta) => windows.move_by(id, delta),
            WindowCommand::SetScroll(scroll) => match windows.set_scroll(id, scroll) {
                Ok(true) => Ok(()),
                Ok(false) => return,
                Err(e) => Err(e),
            },
            WindowCommand::PanBy(delta) => windows.pan_by(id, delta),
        };
        Self::finish(reactor, id, result, now);
    }

    fn finish(reactor: &mut Reactor, id: &ContentId, result: Result<(), WindowError>, now: Instant) {
        match result {
            Ok(()) => reactor.mutated(id, now),
            Err(WindowError::Locked(_)) => trace!(%id, "ignored on locked window"),
            Err(e) => debug!(%id, "window command failed: {e}"),
        }
    }
}

//! The reactor's job is to turn host input into floating-window state.
//!
//! Everything runs on one thread and one event at a time: the reactor owns
//! the [`WindowManager`] and hands it by reference to the gesture, focus and
//! persistence components. Deferred work is limited to the debounced save
//! deadline, which is polled after every event, and the restore protocol,
//! which advances on [`Event::RenderSettled`].

mod events;
mod replay;

use std::time::Instant;

pub use replay::{Record, replay};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace, warn};

use self::events::command::CommandEventHandler;
use self::events::input::InputEventHandler;
use crate::actor::focus::FocusController;
use crate::actor::gesture::GestureRouter;
use crate::actor::persistence::PersistenceAdapter;
use crate::actor::render;
use crate::common::config::Config;
use crate::layout_engine::WindowManager;
use crate::model::window::ContentId;
use crate::sys::event::{PointerEvent, WheelEvent};
use crate::sys::geometry::{Point, Size};
use crate::sys::host::HostCanvas;
use crate::sys::keys::Key;
use crate::sys::store::KeyValueStore;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Event {
    ScreenResized(Size),
    /// Context-menu request to float a piece of content.
    Detach(ContentId),
    /// Context-menu request to put content back on the canvas.
    Attach(ContentId),
    CloseAll,
    Pointer(PointerEvent),
    Wheel(WheelEvent),
    Key(Key),
    Command {
        id: ContentId,
        cmd: WindowCommand,
    },
    /// The render surface scrolled on its own.
    ScrollNotified {
        id: ContentId,
        scroll: Point,
    },
    ViewportMeasured {
        id: ContentId,
        size: Size,
    },
    /// The host finished a layout and paint pass.
    RenderSettled,
    /// The host window lost focus.
    Blur,
    RestoreSession,
    /// No input; only lets the debounced writer run.
    Tick,
}

/// Requests aimed at one window, typically from its title bar buttons.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum WindowCommand {
    Maximize,
    Restore,
    FitToSquare,
    ToggleLock,
    Lock,
    Unlock,
    BringToFront,
    Focus,
    MoveBy(Point),
    SetScroll(Point),
    PanBy(Point),
}

pub struct Reactor {
    windows: WindowManager,
    gestures: GestureRouter,
    persistence: PersistenceAdapter,
    focus: FocusController,
    pan_step: f64,
    record: Record,
}

// The host canvas and stores are single-threaded shared handles.
static_assertions::assert_not_impl_any!(Reactor: Send);

impl Reactor {
    pub fn new(
        config: Config,
        host: Box<dyn HostCanvas>,
        screen: Size,
        store: Box<dyn KeyValueStore>,
        mut record: Record,
        render_tx: Option<render::Sender>,
    ) -> Reactor {
        record.start(&config, screen);
        let settings = &config.settings;
        let mut windows = WindowManager::new(&settings.geometry, &settings.host, host, screen);
        windows.set_render_sender(render_tx);
        Reactor {
            windows,
            gestures: GestureRouter::new(&settings.gestures),
            persistence: PersistenceAdapter::new(&settings.persistence, store),
            focus: FocusController::new(&settings.focus, &config.keys),
            pan_step: settings.gestures.pan_step,
            record,
        }
    }

    pub fn windows(&self) -> &WindowManager { &self.windows }

    pub fn gestures(&self) -> &GestureRouter { &self.gestures }

    pub fn persistence(&self) -> &PersistenceAdapter { &self.persistence }

    pub fn focus(&self) -> &FocusController { &self.focus }

    pub fn handle_events(&mut self, events: Vec<Event>) {
        for event in events {
            self.handle_event(event);
        }
    }

    pub fn handle_event(&mut self, event: Event) { self.handle_event_at(event, Instant::now()) }

    #[instrument(name = "reactor::handle_event", skip(self, now))]
    pub fn handle_event_at(&mut self, event: Event, now: Instant) {
        self.record.on_event(&event);
        match event {
            Event::ScreenResized(size) => self.windows.set_screen_size(size),
            Event::Detach(id) => self.open_window(&id, now),
            Event::Attach(id) => self.close_window(&id, now),
            Event::CloseAll => self.close_all(now),
            Event::Pointer(event) => InputEventHandler::handle_pointer(self, event, now),
            Event::Wheel(event) => InputEventHandler::handle_wheel(self, event, now),
            Event::Key(key) => CommandEventHandler::handle_key(self, key, now),
            Event::Command { id, cmd } => {
                CommandEventHandler::handle_window_command(self, &id, cmd, now)
            }
            Event::ScrollNotified { id, scroll } => {
                match self.windows.on_scroll_notified(&id, scroll) {
                    Ok(true) => self.mutated(&id, now),
                    Ok(false) => {}
                    Err(e) => trace!("scroll notification dropped: {e}"),
                }
            }
            Event::ViewportMeasured { id, size } => {
                if let Err(e) = self.windows.set_measured_viewport(&id, size) {
                    trace!("viewport measurement dropped: {e}");
                }
            }
            Event::RenderSettled => self.persistence.on_render_settled(&mut self.windows, now),
            Event::Blur => {
                for id in self.gestures.on_blur(&mut self.windows) {
                    self.mutated(&id, now);
                }
            }
            Event::RestoreSession => {
                let saved = self.persistence.load();
                debug!(windows = saved.len(), "restoring session");
                self.persistence.begin_restore(&mut self.windows, saved, now);
            }
            Event::Tick => {}
        }
        if self.persistence.poll(now, &self.windows, self.gestures.is_active()) {
            trace!("debounced save written");
        }
    }

    /// Writes any pending save immediately, e.g. before shutting down.
    pub fn flush(&mut self) -> anyhow::Result<()> { self.persistence.flush(&self.windows) }

    fn open_window(&mut self, id: &ContentId, now: Instant) {
        match self.windows.open(id, None) {
            Ok(()) => {
                self.focus.focus(id);
                self.persistence.schedule_save(now);
            }
            Err(e) => warn!(%id, "cannot open window: {e}"),
        }
    }

    fn close_window(&mut self, id: &ContentId, now: Instant) {
        if let Err(e) = self.windows.close(id) {
            warn!(%id, "cannot close window: {e}");
            return;
        }
        self.forget(id);
        self.persistence.schedule_save(now);
    }

    fn close_all(&mut self, now: Instant) {
        let closed = self.windows.close_all();
        if closed.is_empty() {
            return;
        }
        for id in &closed {
            self.forget(id);
        }
        debug!(count = closed.len(), "closed all windows");
        self.persistence.schedule_save(now);
    }

    fn forget(&mut self, id: &ContentId) {
        self.gestures.forget(id);
        self.persistence.forget(id);
        self.focus.on_window_closed(id, &mut self.windows);
    }

    /// Schedules a save for a window mutation. Locked windows are not
    /// persisted on every change.
    fn mutated(&mut self, id: &ContentId, now: Instant) {
        match self.windows.window(id) {
            Some(window) if window.locked => trace!(%id, "locked window changed, not saving"),
            Some(_) => self.persistence.schedule_save(now),
            None => {}
        }
    }
}

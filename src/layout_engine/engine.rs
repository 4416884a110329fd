use tracing::{debug, trace, warn};

use super::WindowError;
use super::geometry::{self, Anchor, Chrome, ResizeAxis, ResizeEdge, ScaleLimits, ViewState};
use crate::actor::render::{self, RenderCommand, WindowView};
use crate::common::collections::HashMap;
use crate::common::config::{GeometrySettings, HostSettings};
use crate::model::window::{ContentId, FloatingWindow, MAX_Z_INDEX, WindowSnapshot};
use crate::sys::event::PointerId;
use crate::sys::geometry::{Point, Rect, RectExt, Round, SameAs, Size};
use crate::sys::host::{DetachedContent, HostCanvas};

pub type Result<T> = std::result::Result<T, WindowError>;

#[derive(Debug, Clone)]
struct DragTracker {
    window: ContentId,
    pointer: PointerId,
    start_frame: Rect,
    start_pointer: Point,
}

#[derive(Debug, Clone)]
struct ResizeTracker {
    window: ContentId,
    pointer: PointerId,
    edge: ResizeEdge,
    start_frame: Rect,
    start_pointer: Point,
    start_view: ViewState,
    /// Pointer position at gesture start, viewport-local.
    cursor: Point,
}

/// Owns every floating window and the single active drag and resize.
pub struct WindowManager {
    windows: HashMap<ContentId, FloatingWindow>,
    detached: HashMap<ContentId, DetachedContent>,
    host: Box<dyn HostCanvas>,
    screen: Size,
    settings: GeometrySettings,
    host_settings: HostSettings,
    limits: ScaleLimits,
    chrome: Chrome,
    canvas_auto_locked: bool,
    active_drag: Option<DragTracker>,
    active_resize: Option<ResizeTracker>,
    render_tx: Option<render::Sender>,
}

impl WindowManager {
    pub fn new(
        settings: &GeometrySettings,
        host_settings: &HostSettings,
        host: Box<dyn HostCanvas>,
        screen: Size,
    ) -> Self {
        WindowManager {
            windows: HashMap::default(),
            detached: HashMap::default(),
            host,
            screen,
            settings: settings.clone(),
            host_settings: host_settings.clone(),
            limits: settings.scale_limits(),
            chrome: settings.chrome(),
            canvas_auto_locked: false,
            active_drag: None,
            active_resize: None,
            render_tx: None,
        }
    }

    pub fn set_render_sender(&mut self, render_tx: Option<render::Sender>) {
        self.render_tx = render_tx;
    }

    pub fn window(&self, id: &ContentId) -> Option<&FloatingWindow> { self.windows.get(id) }

    pub fn windows(&self) -> impl Iterator<Item = &FloatingWindow> { self.windows.values() }

    pub fn len(&self) -> usize { self.windows.len() }

    pub fn is_empty(&self) -> bool { self.windows.is_empty() }

    pub fn screen(&self) -> Size { self.screen }

    pub fn chrome(&self) -> Chrome { self.chrome }

    pub fn limits(&self) -> ScaleLimits { self.limits }

    pub fn is_canvas_auto_locked(&self) -> bool { self.canvas_auto_locked }

    pub fn is_resizing(&self, id: &ContentId) -> bool {
        self.active_resize.as_ref().is_some_and(|r| &r.window == id)
    }

    pub fn is_dragging(&self, id: &ContentId) -> bool {
        self.active_drag.as_ref().is_some_and(|d| &d.window == id)
    }

    /// Persisted records, bottom-most window first.
    pub fn snapshots(&self) -> Vec<WindowSnapshot> {
        let mut windows: Vec<_> = self.windows.values().collect();
        windows.sort_by(|a, b| a.z_index.cmp(&b.z_index).then_with(|| a.id.cmp(&b.id)));
        windows.into_iter().map(FloatingWindow::snapshot).collect()
    }

    pub fn view_of(&self, window: &FloatingWindow) -> WindowView {
        WindowView {
            id: window.id.clone(),
            frame: window.frame.round(),
            viewport_origin: window.viewport_origin(&self.chrome).round(),
            viewport: window.viewport(&self.chrome),
            scale: window.scale,
            scroll: window.scroll,
            z_index: window.z_index,
            locked: window.locked,
            is_maximized: window.is_maximized,
        }
    }

    fn get(&self, id: &ContentId) -> Result<&FloatingWindow> {
        self.windows.get(id).ok_or_else(|| WindowError::WindowNotFound(id.clone()))
    }

    fn get_mut(&mut self, id: &ContentId) -> Result<&mut FloatingWindow> {
        self.windows.get_mut(id).ok_or_else(|| WindowError::WindowNotFound(id.clone()))
    }

    fn get_unlocked_mut(&mut self, id: &ContentId) -> Result<&mut FloatingWindow> {
        let window = self.get_mut(id)?;
        if window.locked {
            return Err(WindowError::Locked(id.clone()));
        }
        Ok(window)
    }

    fn send(&self, command: RenderCommand) {
        if let Some(tx) = &self.render_tx {
            tx.send(command);
        }
    }

    fn emit(&self, id: &ContentId) {
        if self.render_tx.is_none() {
            return;
        }
        if let Some(window) = self.windows.get(id) {
            self.send(RenderCommand::Update(self.view_of(window)));
        }
    }

    fn next_z_index(&self) -> i32 {
        let base = self.settings.base_z_index;
        self.windows.values().map(|w| w.z_index).max().unwrap_or(base).max(base).saturating_add(1)
    }

    /// Renumbers every window from the base z-index, keeping their stacking
    /// order, once any of them has climbed past [`MAX_Z_INDEX`].
    fn compact_z_order(&mut self) {
        if self.windows.values().all(|w| w.z_index <= MAX_Z_INDEX) {
            return;
        }
        let mut order: Vec<_> =
            self.windows.values().map(|w| (w.z_index, w.id.clone())).collect();
        order.sort();
        let base = self.settings.base_z_index;
        for (z_index, (_, id)) in (base.saturating_add(1)..).zip(&order) {
            if let Some(window) = self.windows.get_mut(id) {
                window.z_index = z_index;
            }
        }
        debug!(count = order.len(), base, "compacted z-order");
        for (_, id) in &order {
            self.emit(id);
        }
    }

    fn min_size(&self) -> f64 { self.settings.min_window_size }

    fn floor_size(&self, size: Size) -> Size {
        Size::new(size.width.max(self.min_size()), size.height.max(self.min_size()))
    }

    /// Default frame: the content's grid cell as it appears at the reference
    /// host zoom, measured from the screen margin.
    fn default_frame(&self, id: &ContentId) -> Rect {
        let host = &self.host_settings;
        let reference = host.min_canvas_scale;
        let viewport = Size::new(host.cell_width, host.cell_height).scaled(reference);
        let size = self.floor_size(self.chrome.outer_for(viewport));
        let center = match self.host.original_grid_position(id) {
            Some(pos) => {
                let margin = self.settings.screen_margin;
                let cell_x = pos.col as f64 * (host.cell_width + host.cell_gap) + host.cell_width * 0.5;
                let cell_y =
                    pos.row as f64 * (host.cell_height + host.cell_gap) + host.cell_height * 0.5;
                Point::new(margin + cell_x * reference, margin + cell_y * reference)
            }
            None => Rect::new(Point::ZERO, self.screen).mid(),
        };
        geometry::clamp_to_screen(Rect::centered_on(center, size), self.screen, self.min_size())
    }

    pub fn open(&mut self, id: &ContentId, restore: Option<&WindowSnapshot>) -> Result<()> {
        if self.windows.contains_key(id) {
            debug!(%id, "window already open, raising it");
            return self.bring_to_front(id);
        }
        let Some(content_size) = self.host.content_size(id) else {
            return Err(WindowError::ContentNotFound(id.clone()));
        };
        if let Some(snapshot) = restore {
            snapshot.validate()?;
        }
        let Some(detached) = self.host.detach_content(id) else {
            return Err(WindowError::ContentNotFound(id.clone()));
        };

        if self.windows.is_empty() {
            self.host.zoom_out();
            if !self.host.is_pan_zoom_locked() {
                self.host.lock_pan_zoom(true);
                self.canvas_auto_locked = true;
                debug!("auto-locked host canvas pan/zoom");
            }
        }

        let min = self.min_size();
        let (frame, default_size, z_index, is_maximized) = match restore {
            Some(snapshot) => (
                geometry::clamp_to_screen(snapshot.frame(), self.screen, min),
                snapshot.default_size(),
                snapshot.z_index,
                snapshot.is_maximized,
            ),
            None => {
                let frame = self.default_frame(id);
                (frame, frame.size, self.next_z_index(), false)
            }
        };
        let viewport = self.chrome.viewport_for(frame.size);
        let scale =
            self.limits.clamp(geometry::contain_scale(content_size, viewport, self.limits.min));

        self.windows.insert(id.clone(), FloatingWindow {
            id: id.clone(),
            frame,
            scale,
            scroll: Point::ZERO,
            locked: false,
            is_maximized,
            z_index,
            default_size,
            content_size,
            committed_scroll: Point::ZERO,
            measured_viewport: None,
        });
        self.detached.insert(id.clone(), detached);
        debug!(%id, ?frame, scale, restored = restore.is_some(), "opened floating window");
        self.emit(id);
        self.compact_z_order();
        Ok(())
    }

    pub fn close(&mut self, id: &ContentId) -> Result<()> {
        if self.windows.remove(id).is_none() {
            return Err(WindowError::WindowNotFound(id.clone()));
        }
        if self.is_dragging(id) {
            self.active_drag = None;
        }
        if self.is_resizing(id) {
            self.active_resize = None;
        }

        match self.detached.remove(id) {
            Some(detached) => {
                if !self.host.reattach_content(id, &detached) {
                    warn!(%id, "content is gone from the host; closing window anyway");
                }
            }
            None => warn!(%id, "no detach record for window"),
        }
        self.send(RenderCommand::Remove(id.clone()));

        if self.windows.is_empty() && self.canvas_auto_locked {
            self.canvas_auto_locked = false;
            if self.host.is_pan_zoom_locked() {
                self.host.lock_pan_zoom(false);
                debug!("released host canvas pan/zoom lock");
            }
        }
        debug!(%id, "closed floating window");
        Ok(())
    }

    /// Closes every window, topmost last. Returns the closed ids.
    pub fn close_all(&mut self) -> Vec<ContentId> {
        let ids: Vec<ContentId> =
            self.snapshots().into_iter().map(|snapshot| snapshot.content_id).collect();
        for id in &ids {
            if let Err(e) = self.close(id) {
                warn!(%id, "close failed: {e}");
            }
        }
        ids
    }

    pub fn bring_to_front(&mut self, id: &ContentId) -> Result<()> {
        let base = self.settings.base_z_index;
        let others_top = self
            .windows
            .values()
            .filter(|w| &w.id != id)
            .map(|w| w.z_index)
            .max()
            .unwrap_or(base)
            .max(base);
        let window = self.get_mut(id)?;
        if window.z_index > others_top {
            return Ok(());
        }
        window.z_index = others_top.max(window.z_index).saturating_add(1);
        trace!(%id, z_index = window.z_index, "raised window");
        self.emit(id);
        self.compact_z_order();
        Ok(())
    }

    pub fn set_screen_size(&mut self, screen: Size) {
        self.screen = screen;
        let bounds = Rect::new(Point::ZERO, screen);
        let offscreen = self.windows.values().filter(|w| !bounds.contains_rect(w.frame)).count();
        // Off-screen windows are reclamped on their next mutation.
        debug!(?screen, offscreen, "screen resized");
    }

    pub fn move_to(&mut self, id: &ContentId, origin: Point) -> Result<()> {
        let screen = self.screen;
        let min = self.min_size();
        let window = self.get_mut(id)?;
        let frame = geometry::clamp_to_screen(Rect::new(origin, window.frame.size), screen, min);
        set_frame(window, frame);
        self.emit(id);
        Ok(())
    }

    pub fn move_by(&mut self, id: &ContentId, delta: Point) -> Result<()> {
        let origin = self.get(id)?.frame.origin.offset(delta.x, delta.y);
        self.move_to(id, origin)
    }

    pub fn begin_drag(&mut self, id: &ContentId, pointer: PointerId, at: Point) -> Result<bool> {
        if let Some(drag) = &self.active_drag {
            trace!(%id, busy = %drag.window, "another drag is active");
            return Ok(false);
        }
        let start_frame = self.get(id)?.frame;
        self.active_drag = Some(DragTracker {
            window: id.clone(),
            pointer,
            start_frame,
            start_pointer: at,
        });
        Ok(true)
    }

    pub fn drag_to(&mut self, pointer: PointerId, at: Point) -> Option<ContentId> {
        let drag = self.active_drag.as_ref().filter(|d| d.pointer == pointer)?.clone();
        let delta = drag.start_pointer.delta_to(at);
        let origin = drag.start_frame.origin.offset(delta.x, delta.y);
        self.move_to(&drag.window, origin).ok()?;
        Some(drag.window)
    }

    pub fn end_drag(&mut self, pointer: PointerId) -> Option<ContentId> {
        if !self.active_drag.as_ref().is_some_and(|d| d.pointer == pointer) {
            return None;
        }
        self.active_drag.take().map(|d| d.window)
    }

    pub fn begin_resize(
        &mut self,
        id: &ContentId,
        edge: ResizeEdge,
        pointer: PointerId,
        at: Point,
    ) -> Result<bool> {
        if let Some(resize) = &self.active_resize {
            trace!(%id, busy = %resize.window, "another resize is active");
            return Ok(false);
        }
        let chrome = self.chrome;
        let window = self.get(id)?;
        if window.locked {
            return Err(WindowError::Locked(id.clone()));
        }
        let tracker = ResizeTracker {
            window: id.clone(),
            pointer,
            edge,
            start_frame: window.frame,
            start_pointer: at,
            start_view: window.view_state(&chrome),
            cursor: window.viewport_origin(&chrome).delta_to(at),
        };
        self.active_resize = Some(tracker);
        debug!(%id, %edge, "resize started");
        Ok(true)
    }

    /// Live resize. Scale follows the size change without the contain floor;
    /// the floor is applied when the gesture ends.
    pub fn resize_to(&mut self, pointer: PointerId, at: Point) -> Option<ContentId> {
        let resize = self.active_resize.as_ref().filter(|r| r.pointer == pointer)?.clone();
        let delta = resize.start_pointer.delta_to(at);
        let min = self.min_size();
        let frame = geometry::clamp_to_screen(
            resize.edge.resize_frame(resize.start_frame, delta, min, self.screen),
            self.screen,
            min,
        );
        let viewport = self.chrome.viewport_for(frame.size);
        let anchor = resize.edge.anchor(resize.start_view.viewport, viewport, resize.cursor);
        let next = geometry::anchor_preserving_resize(
            resize.start_view,
            viewport,
            resize.edge.axis(),
            anchor,
            self.limits,
        );

        let window = self.windows.get_mut(&resize.window)?;
        if window.locked {
            return None;
        }
        set_frame(window, frame);
        window.scale = next.scale;
        window.scroll = next.scroll;
        window.committed_scroll = next.scroll;
        window.is_maximized = false;
        self.emit(&resize.window);
        Some(resize.window)
    }

    pub fn end_resize(&mut self, pointer: PointerId) -> Option<ContentId> {
        if !self.active_resize.as_ref().is_some_and(|r| r.pointer == pointer) {
            return None;
        }
        let resize = self.active_resize.take()?;
        self.finish_resize(&resize.window);
        debug!(id = %resize.window, edge = %resize.edge, "resize finished");
        Some(resize.window)
    }

    fn finish_resize(&mut self, id: &ContentId) {
        let chrome = self.chrome;
        let limits = self.limits;
        let Some(window) = self.windows.get_mut(id) else { return };
        let contain = window.contain_scale(&chrome, limits.min);
        let scale = limits.clamp(window.scale.max(contain));
        let scroll = window.scroll;
        apply_view(window, &chrome, scale, scroll);
        self.emit(id);
    }

    /// Drops the active drag and resize, keeping the geometry applied so far.
    pub fn cancel_gestures(&mut self) {
        self.active_drag = None;
        if let Some(resize) = self.active_resize.take() {
            self.finish_resize(&resize.window);
        }
    }

    /// Scrolls by `delta` in scaled-content pixels.
    pub fn pan_by(&mut self, id: &ContentId, delta: Point) -> Result<()> {
        let chrome = self.chrome;
        let window = self.get_unlocked_mut(id)?;
        let (scale, scroll) = (window.scale, window.scroll.offset(delta.x, delta.y));
        apply_view(window, &chrome, scale, scroll);
        self.emit(id);
        Ok(())
    }

    /// Multiplies the scale by `factor`, keeping the content under the
    /// viewport-local point `at` in place.
    pub fn zoom_at(&mut self, id: &ContentId, factor: f64, at: Point) -> Result<()> {
        let chrome = self.chrome;
        let limits = self.limits;
        let window = self.get_unlocked_mut(id)?;
        let view = window.view_state(&chrome);
        let contain = window.contain_scale(&chrome, limits.min);
        let scale = limits.clamp((view.scale * factor).max(contain));
        let at = Point::new(
            at.x.clamp(0.0, view.viewport.width),
            at.y.clamp(0.0, view.viewport.height),
        );
        let scroll = geometry::rescale_around(view, view.viewport, scale, Anchor::fixed(at));
        apply_view(window, &chrome, scale, scroll);
        trace!(%id, scale, "zoomed");
        self.emit(id);
        Ok(())
    }

    /// Programmatic scroll. A locked window snaps back to its committed
    /// scroll instead; returns whether the new value was accepted.
    pub fn set_scroll(&mut self, id: &ContentId, scroll: Point) -> Result<bool> {
        let chrome = self.chrome;
        let window = self.get_mut(id)?;
        let accepted = if window.locked {
            window.scroll = window.committed_scroll;
            trace!(%id, "reverted scroll on locked window");
            false
        } else {
            let scale = window.scale;
            apply_view(window, &chrome, scale, scroll);
            true
        };
        self.emit(id);
        Ok(accepted)
    }

    /// Scroll change reported by the render surface itself.
    pub fn on_scroll_notified(&mut self, id: &ContentId, scroll: Point) -> Result<bool> {
        let chrome = self.chrome;
        let window = self.get_mut(id)?;
        if window.locked {
            if scroll.same_as(window.committed_scroll) {
                return Ok(false);
            }
            window.scroll = window.committed_scroll;
            trace!(%id, "reverted surface scroll on locked window");
            self.emit(id);
            return Ok(false);
        }
        if scroll.same_as(window.scroll) {
            return Ok(false);
        }
        let scale = window.scale;
        apply_view(window, &chrome, scale, scroll);
        if !window.scroll.same_as(scroll) {
            self.emit(id);
        }
        Ok(true)
    }

    pub fn set_measured_viewport(&mut self, id: &ContentId, viewport: Size) -> Result<()> {
        if !viewport.is_finite() || viewport.is_empty() {
            warn!(%id, ?viewport, "ignoring bogus viewport measurement");
            return Ok(());
        }
        let chrome = self.chrome;
        let limits = self.limits;
        let resizing = self.is_resizing(id);
        let window = self.get_mut(id)?;
        window.measured_viewport = Some(viewport);
        if !resizing && !window.locked {
            let contain = window.contain_scale(&chrome, limits.min);
            let scale = limits.clamp(window.scale.max(contain));
            let scroll = window.scroll;
            apply_view(window, &chrome, scale, scroll);
        }
        self.emit(id);
        Ok(())
    }

    /// Sets the scale directly, floored at the contain scale of the current
    /// viewport. Used when restoring a saved session.
    pub fn apply_scale(&mut self, id: &ContentId, scale: f64) -> Result<()> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(WindowError::InvalidSnapshot(id.clone(), format!("bad scale {scale}")));
        }
        let chrome = self.chrome;
        let limits = self.limits;
        let window = self.get_mut(id)?;
        let contain = window.contain_scale(&chrome, limits.min);
        let scale = limits.clamp(scale.max(contain));
        let scroll = window.scroll;
        apply_view(window, &chrome, scale, scroll);
        self.emit(id);
        Ok(())
    }

    pub fn set_locked(&mut self, id: &ContentId, locked: bool) -> Result<()> {
        if locked && self.is_resizing(id) {
            self.active_resize = None;
            self.finish_resize(id);
        }
        let window = self.get_mut(id)?;
        if window.locked == locked {
            return Ok(());
        }
        window.locked = locked;
        if locked {
            window.committed_scroll = window.scroll;
        }
        debug!(%id, locked, "lock changed");
        self.emit(id);
        Ok(())
    }

    pub fn toggle_lock(&mut self, id: &ContentId) -> Result<bool> {
        let locked = !self.get(id)?.locked;
        self.set_locked(id, locked)?;
        Ok(locked)
    }

    /// Moves to `frame` and rescales proportionally around the viewport
    /// center, never dropping below the contain scale.
    fn rescale_to_frame(&mut self, id: &ContentId, frame: Rect) -> Result<()> {
        let chrome = self.chrome;
        let limits = self.limits;
        let window = self.get_unlocked_mut(id)?;
        let old = window.view_state(&chrome);
        let viewport = chrome.viewport_for(frame.size);
        let contain = geometry::contain_scale(window.content_size, viewport, limits.min);
        let scale =
            limits.clamp((old.scale * ResizeAxis::Both.ratio(old.viewport, viewport)).max(contain));
        let scroll =
            geometry::rescale_around(old, viewport, scale, Anchor::center(old.viewport, viewport));
        set_frame(window, frame);
        apply_view(window, &chrome, scale, scroll);
        Ok(())
    }

    pub fn maximize(&mut self, id: &ContentId) -> Result<()> {
        let min = self.min_size();
        let margin = self.settings.screen_margin;
        let window = self.get(id)?;
        if window.locked {
            return Err(WindowError::Locked(id.clone()));
        }
        // Keep the viewport's aspect, not the outer frame's: the header is fixed height.
        let aspect = window.viewport(&self.chrome).aspect_ratio();
        let available = self.floor_size(Size::new(
            self.screen.width - 2.0 * margin,
            self.screen.height - 2.0 * margin,
        ));
        let viewport = geometry::fit_aspect(self.chrome.viewport_for(available), aspect);
        let center = Rect::new(Point::ZERO, self.screen).mid();
        let frame = geometry::clamp_to_screen(
            Rect::centered_on(center, self.chrome.outer_for(viewport)),
            self.screen,
            min,
        );

        self.rescale_to_frame(id, frame)?;
        self.get_mut(id)?.is_maximized = true;
        debug!(%id, ?frame, "maximized");
        self.emit(id);
        Ok(())
    }

    pub fn restore(&mut self, id: &ContentId) -> Result<()> {
        let min = self.min_size();
        let window = self.get(id)?;
        if window.locked {
            return Err(WindowError::Locked(id.clone()));
        }
        let aspect = window.viewport(&self.chrome).aspect_ratio();
        let viewport = geometry::fit_aspect(self.chrome.viewport_for(window.default_size), aspect);
        let size = self.floor_size(self.chrome.outer_for(viewport));
        let frame = geometry::clamp_to_screen(
            Rect::centered_on(window.frame.mid(), size),
            self.screen,
            min,
        );

        self.rescale_to_frame(id, frame)?;
        self.get_mut(id)?.is_maximized = false;
        debug!(%id, ?frame, "restored");
        self.emit(id);
        Ok(())
    }

    pub fn fit_to_square(&mut self, id: &ContentId) -> Result<()> {
        let chrome = self.chrome;
        let limits = self.limits;
        let screen = self.screen;
        let min = self.min_size();
        let window = self.get(id)?;
        if window.locked {
            return Err(WindowError::Locked(id.clone()));
        }
        let fit = geometry::fit_to_square(window.viewport(&chrome), window.content_size);
        let size = self.floor_size(chrome.outer_for(Size::new(fit.side, fit.side)));
        let frame = geometry::clamp_to_screen(Rect::new(window.frame.origin, size), screen, min);

        let window = self.get_unlocked_mut(id)?;
        set_frame(window, frame);
        let contain = window.contain_scale(&chrome, limits.min);
        apply_view(window, &chrome, limits.clamp(fit.scale.max(contain)), Point::ZERO);
        window.is_maximized = false;
        debug!(%id, side = fit.side, scale = window.scale, "fit to square");
        self.emit(id);
        Ok(())
    }

    /// Hands keyboard focus back to the host canvas.
    pub fn focus_host(&mut self) {
        self.host.focus_canvas();
        self.send(RenderCommand::HostFocus);
    }
}

/// A measured viewport only stays valid while the outer size does.
fn set_frame(window: &mut FloatingWindow, frame: Rect) {
    if !window.frame.size.same_as(frame.size) {
        window.measured_viewport = None;
    }
    window.frame = frame;
}

fn apply_view(window: &mut FloatingWindow, chrome: &Chrome, scale: f64, scroll: Point) {
    let viewport = window.viewport(chrome);
    window.scale = scale;
    window.scroll = geometry::clamp_scroll(scroll, window.content_size, scale, viewport);
    window.committed_scroll = window.scroll;
}

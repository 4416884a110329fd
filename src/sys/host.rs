//! The canvas that owns content while it is not floating.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::common::collections::HashMap;
use crate::common::config::HostSettings;
use crate::model::window::ContentId;
use crate::sys::geometry::Size;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridPosition {
    pub col: u32,
    pub row: u32,
}

/// Where a content node was taken from, so it can be put back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetachedContent {
    pub parent: usize,
    pub original_index: usize,
}

pub trait HostCanvas {
    fn content_size(&self, id: &ContentId) -> Option<Size>;
    fn original_grid_position(&self, id: &ContentId) -> Option<GridPosition>;
    /// Moves the content node out and leaves a placeholder in its slot.
    fn detach_content(&mut self, id: &ContentId) -> Option<DetachedContent>;
    /// Returns `false` if the node no longer exists on the host.
    fn reattach_content(&mut self, id: &ContentId, detached: &DetachedContent) -> bool;
    fn lock_pan_zoom(&mut self, enabled: bool);
    fn is_pan_zoom_locked(&self) -> bool;
    fn zoom_out(&mut self);
    fn focus_canvas(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Panel(ContentId),
    Placeholder(ContentId),
}

#[derive(Debug, Clone)]
struct Panel {
    content_size: Size,
    position: GridPosition,
    rank: usize,
}

#[derive(Debug, Default)]
struct GridState {
    panels: HashMap<ContentId, Panel>,
    /// One container per grid row, children in display order.
    rows: Vec<Vec<Slot>>,
    pan_zoom_locked: bool,
    zoomed_out: bool,
    focused: bool,
}

/// In-memory host canvas laid out as a row-major grid of panels.
///
/// Cloning yields another handle to the same canvas.
#[derive(Debug, Clone, Default)]
pub struct GridCanvas(Rc<RefCell<GridState>>);

impl GridCanvas {
    pub fn new(panel_ids: &[String], columns: u32, content_size: Size) -> Self {
        let columns = columns.max(1);
        let mut state = GridState::default();
        for (rank, id) in panel_ids.iter().enumerate() {
            let position = GridPosition {
                col: rank as u32 % columns,
                row: rank as u32 / columns,
            };
            let row = position.row as usize;
            if state.rows.len() <= row {
                state.rows.resize_with(row + 1, Vec::new);
            }
            state.rows[row].push(Slot::Panel(ContentId::new(id.clone())));
            state.panels.insert(ContentId::new(id.clone()), Panel {
                content_size,
                position,
                rank,
            });
        }
        GridCanvas(Rc::new(RefCell::new(state)))
    }

    pub fn from_settings(settings: &HostSettings) -> Self {
        Self::new(
            &settings.panels,
            settings.columns,
            Size::new(settings.content_width, settings.content_height),
        )
    }

    pub fn children(&self, parent: usize) -> Vec<Slot> {
        self.0.borrow().rows.get(parent).cloned().unwrap_or_default()
    }

    /// `(parent, index)` of the live panel node, if it is attached.
    pub fn slot_of(&self, id: &ContentId) -> Option<(usize, usize)> {
        let state = self.0.borrow();
        state.rows.iter().enumerate().find_map(|(parent, row)| {
            row.iter()
                .position(|slot| *slot == Slot::Panel(id.clone()))
                .map(|index| (parent, index))
        })
    }

    /// Drops a placeholder the way unrelated host code might.
    pub fn remove_placeholder(&self, id: &ContentId) -> bool {
        let mut state = self.0.borrow_mut();
        for row in state.rows.iter_mut() {
            if let Some(index) = row.iter().position(|slot| *slot == Slot::Placeholder(id.clone())) {
                row.remove(index);
                return true;
            }
        }
        false
    }

    /// Removes a panel from the host entirely.
    pub fn remove_panel(&self, id: &ContentId) {
        let mut state = self.0.borrow_mut();
        state.panels.remove(id);
        for row in state.rows.iter_mut() {
            row.retain(|slot| !matches!(slot, Slot::Panel(p) | Slot::Placeholder(p) if p == id));
        }
    }

    pub fn is_zoomed_out(&self) -> bool { self.0.borrow().zoomed_out }

    pub fn has_focus(&self) -> bool { self.0.borrow().focused }
}

impl HostCanvas for GridCanvas {
    fn content_size(&self, id: &ContentId) -> Option<Size> {
        self.0.borrow().panels.get(id).map(|panel| panel.content_size)
    }

    fn original_grid_position(&self, id: &ContentId) -> Option<GridPosition> {
        self.0.borrow().panels.get(id).map(|panel| panel.position)
    }

    fn detach_content(&mut self, id: &ContentId) -> Option<DetachedContent> {
        let (parent, index) = self.slot_of(id)?;
        let mut state = self.0.borrow_mut();
        state.rows[parent][index] = Slot::Placeholder(id.clone());
        state.focused = false;
        debug!(%id, parent, index, "detached content");
        Some(DetachedContent { parent, original_index: index })
    }

    fn reattach_content(&mut self, id: &ContentId, detached: &DetachedContent) -> bool {
        let mut state = self.0.borrow_mut();
        let Some(rank) = state.panels.get(id).map(|panel| panel.rank) else {
            warn!(%id, "cannot reattach: content no longer exists on the host");
            return false;
        };
        let parent = detached.parent.min(state.rows.len().saturating_sub(1));
        if state.rows.is_empty() {
            state.rows.push(Vec::new());
        }
        let placeholder = Slot::Placeholder(id.clone());

        let row = &mut state.rows[parent];
        if row.get(detached.original_index) == Some(&placeholder) {
            row[detached.original_index] = Slot::Panel(id.clone());
            return true;
        }
        if let Some(index) = row.iter().position(|slot| *slot == placeholder) {
            row[index] = Slot::Panel(id.clone());
            return true;
        }

        // Placeholder is gone: derive the slot from canonical panel order.
        let panels = &state.panels;
        let index = state.rows[parent]
            .iter()
            .filter(|slot| {
                let (Slot::Panel(other) | Slot::Placeholder(other)) = slot;
                panels.get(other).is_some_and(|p| p.rank < rank)
            })
            .count();
        debug!(%id, parent, index, "placeholder missing, reinserting by canonical order");
        state.rows[parent].insert(index, Slot::Panel(id.clone()));
        true
    }

    fn lock_pan_zoom(&mut self, enabled: bool) { self.0.borrow_mut().pan_zoom_locked = enabled; }

    fn is_pan_zoom_locked(&self) -> bool { self.0.borrow().pan_zoom_locked }

    fn zoom_out(&mut self) { self.0.borrow_mut().zoomed_out = true; }

    fn focus_canvas(&mut self) { self.0.borrow_mut().focused = true; }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> { (1..=n).map(|i| format!("panel-{i}")).collect() }

    fn canvas() -> GridCanvas { GridCanvas::new(&ids(8), 4, Size::new(760.0, 760.0)) }

    #[test]
    fn lays_out_panels_row_major() {
        let canvas = canvas();
        let id = ContentId::from("panel-6");
        assert_eq!(
            canvas.original_grid_position(&id),
            Some(GridPosition { col: 1, row: 1 })
        );
        assert_eq!(canvas.slot_of(&id), Some((1, 1)));
        assert_eq!(canvas.content_size(&id), Some(Size::new(760.0, 760.0)));
    }

    #[test]
    fn detach_leaves_placeholder_and_reattach_restores_index() {
        let mut canvas = canvas();
        let id = ContentId::from("panel-3");
        let detached = canvas.detach_content(&id).unwrap();
        assert_eq!(detached, DetachedContent { parent: 0, original_index: 2 });
        assert_eq!(canvas.children(0)[2], Slot::Placeholder(id.clone()));
        assert_eq!(canvas.slot_of(&id), None);

        assert!(canvas.reattach_content(&id, &detached));
        assert_eq!(canvas.slot_of(&id), Some((0, 2)));
    }

    #[test]
    fn reattach_falls_back_to_canonical_order_without_placeholder() {
        let mut canvas = canvas();
        let id = ContentId::from("panel-3");
        let detached = canvas.detach_content(&id).unwrap();
        assert!(canvas.remove_placeholder(&id));
        assert_eq!(canvas.children(0).len(), 3);

        assert!(canvas.reattach_content(&id, &detached));
        assert_eq!(canvas.slot_of(&id), Some((0, 2)));
        assert_eq!(canvas.children(0).len(), 4);
    }

    #[test]
    fn reattach_of_removed_content_fails() {
        let mut canvas = canvas();
        let id = ContentId::from("panel-2");
        let detached = canvas.detach_content(&id).unwrap();
        canvas.remove_panel(&id);
        assert!(!canvas.reattach_content(&id, &detached));
    }

    #[test]
    fn detach_unknown_content_is_none() {
        let mut canvas = canvas();
        assert_eq!(canvas.detach_content(&ContentId::from("nope")), None);
    }
}

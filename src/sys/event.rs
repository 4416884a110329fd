//! Pointer and wheel input as delivered by the host's event surface.
//!
//! Positions are screen-space. The surface also reports which part of a
//! floating window was hit, so no hit testing happens on this side.

use serde::{Deserialize, Serialize};

use crate::layout_engine::geometry::ResizeEdge;
use crate::model::window::ContentId;
use crate::sys::geometry::Point;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointerId(pub u32);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Mouse,
    Touch,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Header,
    Content,
    /// Buttons and other interactive controls inside the window.
    Control,
    Resize(ResizeEdge),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum PointerEvent {
    Down {
        pointer: PointerId,
        kind: PointerKind,
        window: ContentId,
        target: HitTarget,
        at: Point,
    },
    Move {
        pointer: PointerId,
        at: Point,
    },
    Up {
        pointer: PointerId,
        at: Point,
    },
    Cancel {
        pointer: PointerId,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WheelEvent {
    pub window: ContentId,
    pub at: Point,
    pub delta: Point,
    /// Zoom modifier held (ctrl-wheel or a trackpad pinch reported as wheel).
    #[serde(default)]
    pub zoom: bool,
}

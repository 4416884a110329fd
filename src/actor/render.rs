//! Commands for whatever surface draws the floating windows.
//!
//! The window manager only produces numbers; a render adapter listening on
//! this channel turns them into transforms, styles or native frames.

use serde::{Deserialize, Serialize};

use crate::actor;
use crate::model::window::ContentId;
use crate::sys::geometry::{Point, Rect, Size};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WindowView {
    pub id: ContentId,
    /// Outer frame, rounded to whole pixels.
    pub frame: Rect,
    pub viewport_origin: Point,
    pub viewport: Size,
    pub scale: f64,
    pub scroll: Point,
    pub z_index: i32,
    pub locked: bool,
    pub is_maximized: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum RenderCommand {
    Update(WindowView),
    Remove(ContentId),
    /// Keyboard focus went back to the host canvas.
    HostFocus,
}

pub type Sender = actor::Sender<RenderCommand>;
pub type Receiver = actor::Receiver<RenderCommand>;

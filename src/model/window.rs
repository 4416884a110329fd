use std::fmt;

use serde::{Deserialize, Serialize};

use crate::layout_engine::WindowError;
use crate::layout_engine::geometry::{self, Chrome, ViewState};
use crate::sys::geometry::{Point, Rect, Size};

/// Highest z-index a window may carry. Stacking above it renumbers every
/// window from the configured base.
pub const MAX_Z_INDEX: i32 = 1 << 24;

/// Opaque identifier of a piece of host content (a canvas panel).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self { ContentId(id.into()) }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&str> for ContentId {
    fn from(id: &str) -> Self { ContentId(id.to_string()) }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatingWindow {
    pub id: ContentId,
    /// Outer frame in screen space, header and border included.
    pub frame: Rect,
    pub scale: f64,
    pub scroll: Point,
    pub locked: bool,
    pub is_maximized: bool,
    pub z_index: i32,
    pub default_size: Size,
    pub content_size: Size,
    /// Scroll a locked window snaps back to.
    pub(crate) committed_scroll: Point,
    /// Viewport size reported by the render surface once laid out.
    pub(crate) measured_viewport: Option<Size>,
}

impl FloatingWindow {
    pub fn viewport(&self, chrome: &Chrome) -> Size {
        self.measured_viewport.unwrap_or_else(|| chrome.viewport_for(self.frame.size))
    }

    pub fn viewport_origin(&self, chrome: &Chrome) -> Point {
        let offset = chrome.viewport_offset();
        self.frame.origin.offset(offset.x, offset.y)
    }

    pub fn view_state(&self, chrome: &Chrome) -> ViewState {
        ViewState {
            scale: self.scale,
            scroll: self.scroll,
            viewport: self.viewport(chrome),
            content: self.content_size,
        }
    }

    pub fn contain_scale(&self, chrome: &Chrome, abs_min: f64) -> f64 {
        geometry::contain_scale(self.content_size, self.viewport(chrome), abs_min)
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            content_id: self.id.clone(),
            x: self.frame.origin.x,
            y: self.frame.origin.y,
            width: self.frame.size.width,
            height: self.frame.size.height,
            scale: self.scale,
            scroll_x: self.scroll.x,
            scroll_y: self.scroll.y,
            z_index: self.z_index,
            locked: self.locked,
            is_maximized: self.is_maximized,
            default_width: self.default_size.width,
            default_height: self.default_size.height,
        }
    }
}

/// One persisted window record. Field names follow the stored layout.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WindowSnapshot {
    pub content_id: ContentId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub scale: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub z_index: i32,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub is_maximized: bool,
    pub default_width: f64,
    pub default_height: f64,
}

impl WindowSnapshot {
    pub fn frame(&self) -> Rect { Rect::from_xywh(self.x, self.y, self.width, self.height) }

    pub fn scroll(&self) -> Point { Point::new(self.scroll_x, self.scroll_y) }

    pub fn default_size(&self) -> Size { Size::new(self.default_width, self.default_height) }

    pub fn validate(&self) -> Result<(), WindowError> {
        let frame = self.frame();
        if !frame.origin.is_finite() || !frame.size.is_finite() || frame.size.is_empty() {
            return Err(WindowError::InvalidSnapshot(
                self.content_id.clone(),
                format!("bad frame {frame:?}"),
            ));
        }
        if !self.default_size().is_finite() || self.default_size().is_empty() {
            return Err(WindowError::InvalidSnapshot(
                self.content_id.clone(),
                "bad default size".to_string(),
            ));
        }
        if !(0..=MAX_Z_INDEX).contains(&self.z_index) {
            return Err(WindowError::InvalidSnapshot(
                self.content_id.clone(),
                format!("z-index {} out of range", self.z_index),
            ));
        }
        Ok(())
    }

    /// Scale and scroll are checked separately since they are applied in
    /// later restoration phases.
    pub fn validate_view(&self) -> Result<(), WindowError> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(WindowError::InvalidSnapshot(
                self.content_id.clone(),
                format!("bad scale {}", self.scale),
            ));
        }
        if !self.scroll().is_finite() {
            return Err(WindowError::InvalidSnapshot(
                self.content_id.clone(),
                "bad scroll offset".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME: Chrome = Chrome { header_height: 32.0, border_size: 2.0 };

    fn window() -> FloatingWindow {
        FloatingWindow {
            id: ContentId::from("panel-1"),
            frame: Rect::from_xywh(100.0, 50.0, 404.0, 336.0),
            scale: 0.5,
            scroll: Point::new(10.0, 20.0),
            locked: false,
            is_maximized: false,
            z_index: 1001,
            default_size: Size::new(404.0, 336.0),
            content_size: Size::new(760.0, 760.0),
            committed_scroll: Point::ZERO,
            measured_viewport: None,
        }
    }

    #[test]
    fn viewport_excludes_header_and_border() {
        let w = window();
        assert_eq!(w.viewport(&CHROME), Size::new(400.0, 300.0));
        assert_eq!(w.viewport_origin(&CHROME), Point::new(102.0, 84.0));
    }

    #[test]
    fn measured_viewport_takes_precedence() {
        let mut w = window();
        w.measured_viewport = Some(Size::new(390.0, 290.0));
        assert_eq!(w.viewport(&CHROME), Size::new(390.0, 290.0));
    }

    #[test]
    fn snapshot_uses_camel_case_layout() {
        let json = serde_json::to_value(window().snapshot()).unwrap();
        assert_eq!(json["contentId"], "panel-1");
        assert_eq!(json["scrollY"], 20.0);
        assert_eq!(json["isMaximized"], false);
        assert_eq!(json["defaultHeight"], 336.0);
    }

    #[test]
    fn validate_rejects_non_finite_geometry() {
        let mut snap = window().snapshot();
        assert!(snap.validate().is_ok());
        snap.width = f64::NAN;
        assert!(snap.validate().is_err());

        let mut snap = window().snapshot();
        snap.scale = 0.0;
        assert!(snap.validate().is_ok());
        assert!(snap.validate_view().is_err());
    }
}

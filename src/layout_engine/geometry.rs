//! Pure scale/scroll math for floating windows.
//!
//! Nothing in here knows about windows, hosts or gestures: every function
//! takes sizes and points and returns new numbers. Scroll offsets are in
//! scaled-content pixels, anchors are in viewport-local pixels.

use serde::{Deserialize, Serialize};

use crate::sys::geometry::{Point, Rect, Size};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleLimits {
    pub min: f64,
    pub max: f64,
}

impl ScaleLimits {
    pub fn clamp(&self, scale: f64) -> f64 {
        if !scale.is_finite() {
            return self.min;
        }
        scale.clamp(self.min, self.max)
    }
}

/// Fixed window decoration around the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chrome {
    pub header_height: f64,
    pub border_size: f64,
}

impl Chrome {
    pub fn viewport_for(&self, outer: Size) -> Size {
        Size::new(
            (outer.width - 2.0 * self.border_size).max(1.0),
            (outer.height - self.header_height - 2.0 * self.border_size).max(1.0),
        )
    }

    pub fn outer_for(&self, viewport: Size) -> Size {
        Size::new(
            viewport.width + 2.0 * self.border_size,
            viewport.height + self.header_height + 2.0 * self.border_size,
        )
    }

    /// Offset of the viewport's top-left corner from the window's top-left corner.
    pub fn viewport_offset(&self) -> Point {
        Point::new(self.border_size, self.header_height + self.border_size)
    }
}

/// Scale at which the whole content is visible inside `viewport`.
pub fn contain_scale(content: Size, viewport: Size, abs_min: f64) -> f64 {
    if content.is_empty() {
        return abs_min.max(1.0);
    }
    let scale = f64::min(viewport.width / content.width, viewport.height / content.height);
    scale.max(abs_min)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitSquare {
    pub side: f64,
    pub scale: f64,
}

pub fn fit_to_square(viewport: Size, content: Size) -> FitSquare {
    let side = f64::min(viewport.width, viewport.height);
    let scale = if content.is_empty() {
        1.0
    } else {
        f64::min(side / content.width, side / content.height)
    };
    FitSquare { side, scale }
}

/// Largest size with the given aspect ratio that fits inside `bounds`.
pub fn fit_aspect(bounds: Size, aspect: f64) -> Size {
    if aspect <= 0.0 || !aspect.is_finite() || bounds.is_empty() {
        return bounds;
    }
    if bounds.width / bounds.height > aspect {
        Size::new(bounds.height * aspect, bounds.height)
    } else {
        Size::new(bounds.width, bounds.width / aspect)
    }
}

/// Overflow below this many pixels is rounding noise, not scrollable room.
const SCROLL_EPSILON: f64 = 1e-6;

pub fn max_scroll(content: Size, scale: f64, viewport: Size) -> Point {
    let room = |content: f64, viewport: f64| {
        let room = content * scale - viewport;
        if room > SCROLL_EPSILON { room } else { 0.0 }
    };
    Point::new(room(content.width, viewport.width), room(content.height, viewport.height))
}

pub fn clamp_scroll(scroll: Point, content: Size, scale: f64, viewport: Size) -> Point {
    let max = max_scroll(content, scale, viewport);
    let x = if scroll.x.is_finite() { scroll.x.clamp(0.0, max.x) } else { 0.0 };
    let y = if scroll.y.is_finite() { scroll.y.clamp(0.0, max.y) } else { 0.0 };
    Point::new(x, y)
}

/// Keeps the window reachable: size within `[min_size, screen]`, origin on screen.
pub fn clamp_to_screen(rect: Rect, screen: Size, min_size: f64) -> Rect {
    let max_w = screen.width.max(min_size);
    let max_h = screen.height.max(min_size);
    let width = rect.size.width.clamp(min_size, max_w);
    let height = rect.size.height.clamp(min_size, max_h);
    let x = rect.origin.x.clamp(0.0, (screen.width - width).max(0.0));
    let y = rect.origin.y.clamp(0.0, (screen.height - height).max(0.0));
    Rect::from_xywh(x, y, width, height)
}

/// Scale and scroll of a window's content relative to its viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub scale: f64,
    pub scroll: Point,
    pub viewport: Size,
    pub content: Size,
}

/// A viewport-local point in the old viewport and where it must land in the new one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub from: Point,
    pub to: Point,
}

impl Anchor {
    pub fn fixed(at: Point) -> Self { Anchor { from: at, to: at } }

    pub fn center(old: Size, new: Size) -> Self {
        Anchor {
            from: Point::new(old.width * 0.5, old.height * 0.5),
            to: Point::new(new.width * 0.5, new.height * 0.5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAxis {
    Width,
    Height,
    Both,
}

impl ResizeAxis {
    pub fn ratio(&self, old: Size, new: Size) -> f64 {
        let w = new.width / old.width.max(1.0);
        let h = new.height / old.height.max(1.0);
        match self {
            ResizeAxis::Width => w,
            ResizeAxis::Height => h,
            ResizeAxis::Both => w.min(h),
        }
    }
}

/// Scroll that keeps `anchor` on the same content point after switching to
/// `new_scale` in `new_viewport`.
pub fn rescale_around(old: ViewState, new_viewport: Size, new_scale: f64, anchor: Anchor) -> Point {
    let old_scale = if old.scale > 0.0 { old.scale } else { 1.0 };
    let content_x = (old.scroll.x + anchor.from.x) / old_scale;
    let content_y = (old.scroll.y + anchor.from.y) / old_scale;
    let scroll = Point::new(
        content_x * new_scale - anchor.to.x,
        content_y * new_scale - anchor.to.y,
    );
    clamp_scroll(scroll, old.content, new_scale, new_viewport)
}

pub fn anchor_preserving_resize(
    old: ViewState,
    new_viewport: Size,
    axis: ResizeAxis,
    anchor: Anchor,
    limits: ScaleLimits,
) -> ViewState {
    let scale = limits.clamp(old.scale * axis.ratio(old.viewport, new_viewport));
    ViewState {
        scale,
        scroll: rescale_around(old, new_viewport, scale, anchor),
        viewport: new_viewport,
        content: old.content,
    }
}

#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResizeEdge {
    /// Bottom-right grip.
    Corner,
    Right,
    Bottom,
    Left,
    Top,
}

impl ResizeEdge {
    pub fn axis(&self) -> ResizeAxis {
        match self {
            ResizeEdge::Corner => ResizeAxis::Both,
            ResizeEdge::Right | ResizeEdge::Left => ResizeAxis::Width,
            ResizeEdge::Bottom | ResizeEdge::Top => ResizeAxis::Height,
        }
    }

    /// Outer frame after dragging this edge by `delta` from `start`.
    pub fn resize_frame(&self, start: Rect, delta: Point, min_size: f64, screen: Size) -> Rect {
        let right = start.max().x;
        let bottom = start.max().y;
        let mut x = start.origin.x;
        let mut y = start.origin.y;
        let mut width = start.size.width;
        let mut height = start.size.height;

        match self {
            ResizeEdge::Corner => {
                width += delta.x;
                height += delta.y;
            }
            ResizeEdge::Right => width += delta.x,
            ResizeEdge::Bottom => height += delta.y,
            ResizeEdge::Left => {
                x += delta.x;
                width -= delta.x;
            }
            ResizeEdge::Top => {
                y += delta.y;
                height -= delta.y;
            }
        }

        match self {
            ResizeEdge::Left => {
                x = x.max(0.0);
                width = (right - x).max(min_size);
                x = right - width;
            }
            ResizeEdge::Top => {
                y = y.max(0.0);
                height = (bottom - y).max(min_size);
                y = bottom - height;
            }
            _ => {
                width = width.clamp(min_size, (screen.width - x).max(min_size));
                height = height.clamp(min_size, (screen.height - y).max(min_size));
            }
        }

        Rect::from_xywh(x, y, width, height)
    }

    /// Corner resizes keep the viewport center fixed. Edge resizes keep the
    /// fixed edge pinned on the resized axis (so left/top anchor to the far
    /// edge) and the cursor pinned on the other axis.
    pub fn anchor(&self, old: Size, new: Size, cursor: Point) -> Anchor {
        let cx = cursor.x.clamp(0.0, old.width);
        let cy = cursor.y.clamp(0.0, old.height);
        match self {
            ResizeEdge::Corner => Anchor::center(old, new),
            ResizeEdge::Right => Anchor::fixed(Point::new(0.0, cy)),
            ResizeEdge::Bottom => Anchor::fixed(Point::new(cx, 0.0)),
            ResizeEdge::Left => Anchor {
                from: Point::new(old.width, cy),
                to: Point::new(new.width, cy),
            },
            ResizeEdge::Top => Anchor {
                from: Point::new(cx, old.height),
                to: Point::new(cx, new.height),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sys::geometry::IsWithin;

    const LIMITS: ScaleLimits = ScaleLimits { min: 0.1, max: 3.0 };
    const CONTENT: Size = Size::new(760.0, 760.0);

    fn view(scale: f64, scroll: Point, viewport: Size) -> ViewState {
        ViewState { scale, scroll, viewport, content: CONTENT }
    }

    #[test]
    fn contain_scale_is_limited_by_the_shorter_axis() {
        let landscape = contain_scale(CONTENT, Size::new(400.0, 300.0), 0.1);
        assert!(landscape.is_within(1e-4, 0.3947));
        assert_eq!(landscape, 300.0 / 760.0);

        let portrait = contain_scale(CONTENT, Size::new(300.0, 600.0), 0.1);
        assert_eq!(portrait, landscape);
    }

    #[test]
    fn contain_scale_respects_absolute_minimum() {
        assert_eq!(contain_scale(CONTENT, Size::new(20.0, 20.0), 0.1), 0.1);
        assert_eq!(contain_scale(Size::ZERO, Size::new(20.0, 20.0), 0.1), 1.0);
    }

    #[test]
    fn fit_to_square_uses_the_short_side() {
        let fit = fit_to_square(Size::new(500.0, 380.0), Size::new(760.0, 380.0));
        assert_eq!(fit.side, 380.0);
        assert_eq!(fit.scale, 0.5);
    }

    #[test]
    fn fit_aspect_picks_limiting_dimension() {
        assert_eq!(fit_aspect(Size::new(1000.0, 500.0), 1.0), Size::new(500.0, 500.0));
        assert_eq!(fit_aspect(Size::new(400.0, 1000.0), 2.0), Size::new(400.0, 200.0));
    }

    #[test]
    fn clamp_scroll_bounds_to_scaled_content() {
        let vp = Size::new(400.0, 300.0);
        let clamped = clamp_scroll(Point::new(900.0, -20.0), CONTENT, 1.0, vp);
        assert_eq!(clamped, Point::new(360.0, 0.0));
        let fits = clamp_scroll(Point::new(50.0, 50.0), CONTENT, 0.2, vp);
        assert_eq!(fits, Point::ZERO);
    }

    #[test]
    fn contain_scale_leaves_no_scroll_room() {
        for height in [367.0, 413.0, 529.0, 1017.0, 998.3] {
            let viewport = Size::new(1800.0, height);
            let scale = contain_scale(CONTENT, viewport, 0.1);
            assert_eq!(max_scroll(CONTENT, scale, viewport).y, 0.0, "height {height}");
            assert_eq!(clamp_scroll(Point::new(30.0, 50.0), CONTENT, scale, viewport), Point::ZERO);
        }
    }

    #[test]
    fn clamp_to_screen_keeps_window_reachable() {
        let screen = Size::new(1920.0, 1080.0);
        let rect = clamp_to_screen(Rect::from_xywh(1800.0, -40.0, 400.0, 100.0), screen, 200.0);
        assert_eq!(rect, Rect::from_xywh(1520.0, 0.0, 400.0, 200.0));

        let huge = clamp_to_screen(Rect::from_xywh(10.0, 10.0, 4000.0, 4000.0), screen, 200.0);
        assert_eq!(huge, Rect::from_xywh(0.0, 0.0, 1920.0, 1080.0));
    }

    #[test]
    fn right_edge_resize_keeps_left_content_edge() {
        let old = view(1.0, Point::new(100.0, 40.0), Size::new(400.0, 300.0));
        let new_vp = Size::new(600.0, 300.0);
        let anchor = ResizeEdge::Right.anchor(old.viewport, new_vp, Point::new(400.0, 150.0));
        let next = anchor_preserving_resize(old, new_vp, ResizeAxis::Width, anchor, LIMITS);
        assert_eq!(next.scale, 1.5);
        // content x at the left viewport edge was 100, still there after the rescale
        assert!(next.scroll.x.is_within(1e-9, 150.0));
    }

    #[test]
    fn left_edge_resize_compensates_scroll_by_size_delta() {
        let old = view(1.0, Point::new(200.0, 0.0), Size::new(400.0, 300.0));
        let new_vp = Size::new(500.0, 300.0);
        let anchor = ResizeEdge::Left.anchor(old.viewport, new_vp, Point::new(0.0, 0.0));
        // same scale: scroll shifts back by exactly the 100px the viewport grew
        let scroll = rescale_around(old, new_vp, 1.0, anchor);
        assert_eq!(scroll, Point::new(100.0, 0.0));
    }

    #[test]
    fn corner_resize_keeps_viewport_center() {
        let old = view(1.0, Point::new(180.0, 230.0), Size::new(400.0, 300.0));
        let new_vp = Size::new(200.0, 150.0);
        let anchor = ResizeEdge::Corner.anchor(old.viewport, new_vp, Point::ZERO);
        let next = anchor_preserving_resize(old, new_vp, ResizeAxis::Both, anchor, LIMITS);
        assert_eq!(next.scale, 0.5);
        let center_before = (old.scroll.x + 200.0) / old.scale;
        let center_after = (next.scroll.x + 100.0) / next.scale;
        assert!(center_before.is_within(1e-9, center_after));
    }

    #[test]
    fn resize_scale_stays_within_limits() {
        let old = view(2.9, Point::ZERO, Size::new(100.0, 100.0));
        let next = anchor_preserving_resize(
            old,
            Size::new(400.0, 400.0),
            ResizeAxis::Both,
            Anchor::fixed(Point::ZERO),
            LIMITS,
        );
        assert_eq!(next.scale, 3.0);
    }

    #[test]
    fn left_resize_frame_moves_origin_and_respects_min_size() {
        let start = Rect::from_xywh(500.0, 100.0, 400.0, 300.0);
        let screen = Size::new(1920.0, 1080.0);
        let grown = ResizeEdge::Left.resize_frame(start, Point::new(-50.0, 0.0), 200.0, screen);
        assert_eq!(grown, Rect::from_xywh(450.0, 100.0, 450.0, 300.0));

        let shrunk = ResizeEdge::Left.resize_frame(start, Point::new(350.0, 0.0), 200.0, screen);
        assert_eq!(shrunk, Rect::from_xywh(700.0, 100.0, 200.0, 300.0));

        let past_screen =
            ResizeEdge::Left.resize_frame(start, Point::new(-800.0, 0.0), 200.0, screen);
        assert_eq!(past_screen.origin.x, 0.0);
        assert_eq!(past_screen.max().x, 900.0);
    }

    #[test]
    fn corner_resize_frame_is_capped_by_screen() {
        let start = Rect::from_xywh(1500.0, 800.0, 300.0, 200.0);
        let screen = Size::new(1920.0, 1080.0);
        let rect = ResizeEdge::Corner.resize_frame(start, Point::new(500.0, 500.0), 200.0, screen);
        assert_eq!(rect, Rect::from_xywh(1500.0, 800.0, 420.0, 280.0));
    }
}

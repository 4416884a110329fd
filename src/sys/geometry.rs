//! screen-space geometry primitives shared by every layer

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self { Point { x, y } }

    pub fn offset(&self, dx: f64, dy: f64) -> Self { Point::new(self.x + dx, self.y + dy) }

    pub fn delta_to(&self, other: Point) -> Point { Point::new(other.x - self.x, other.y - self.y) }

    pub fn distance(&self, other: Point) -> f64 { f64::hypot(other.x - self.x, other.y - self.y) }

    pub fn midpoint(&self, other: Point) -> Point {
        Point::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }

    pub fn is_finite(&self) -> bool { self.x.is_finite() && self.y.is_finite() }
}

impl Size {
    pub const ZERO: Size = Size { width: 0.0, height: 0.0 };

    pub const fn new(width: f64, height: f64) -> Self { Size { width, height } }

    pub fn scaled(&self, factor: f64) -> Self {
        Size::new(self.width * factor, self.height * factor)
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.height <= 0.0 { 1.0 } else { self.width / self.height }
    }

    pub fn is_empty(&self) -> bool { self.width <= 0.0 || self.height <= 0.0 }

    pub fn is_finite(&self) -> bool { self.width.is_finite() && self.height.is_finite() }
}

impl Rect {
    pub const fn new(origin: Point, size: Size) -> Self { Rect { origin, size } }

    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect::new(Point::new(x, y), Size::new(width, height))
    }

    pub fn min(&self) -> Point { self.origin }

    pub fn max(&self) -> Point {
        Point::new(self.origin.x + self.size.width, self.origin.y + self.size.height)
    }

    pub fn mid(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width * 0.5,
            self.origin.y + self.size.height * 0.5,
        )
    }

    pub fn centered_on(center: Point, size: Size) -> Self {
        Rect::new(
            Point::new(center.x - size.width * 0.5, center.y - size.height * 0.5),
            size,
        )
    }
}

pub trait Round {
    fn round(&self) -> Self;
}

impl Round for Rect {
    fn round(&self) -> Self {
        let min_rounded = self.min().round();
        let max_rounded = self.max().round();
        Rect {
            origin: min_rounded,
            size: Size {
                width: max_rounded.x - min_rounded.x,
                height: max_rounded.y - min_rounded.y,
            },
        }
    }
}

impl Round for Point {
    fn round(&self) -> Self { Point { x: self.x.round(), y: self.y.round() } }
}

impl Round for Size {
    fn round(&self) -> Self {
        Size {
            width: self.width.round(),
            height: self.height.round(),
        }
    }
}

pub trait IsWithin {
    fn is_within(&self, how_much: f64, other: Self) -> bool;
}

impl IsWithin for Rect {
    fn is_within(&self, how_much: f64, other: Self) -> bool {
        self.origin.is_within(how_much, other.origin) && self.size.is_within(how_much, other.size)
    }
}

impl IsWithin for Point {
    fn is_within(&self, how_much: f64, other: Self) -> bool {
        self.x.is_within(how_much, other.x) && self.y.is_within(how_much, other.y)
    }
}

impl IsWithin for Size {
    fn is_within(&self, how_much: f64, other: Self) -> bool {
        self.width.is_within(how_much, other.width) && self.height.is_within(how_much, other.height)
    }
}

impl IsWithin for f64 {
    fn is_within(&self, how_much: f64, other: Self) -> bool { (self - other).abs() < how_much }
}

pub trait SameAs: IsWithin + Sized {
    fn same_as(&self, other: Self) -> bool { self.is_within(0.1, other) }
}

impl SameAs for Rect {}
impl SameAs for Point {}
impl SameAs for Size {}

pub trait RectExt {
    fn contains_rect(&self, other: Self) -> bool;
}

impl RectExt for Rect {
    fn contains_rect(&self, other: Self) -> bool {
        self.min().x <= other.min().x
            && self.min().y <= other.min().y
            && self.max().x >= other.max().x
            && self.max().y >= other.max().y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_rect() {
        let rect = Rect::from_xywh(10.4, 20.7, 100.0, 200.0);
        let rounded = rect.round();
        assert_eq!(rounded.origin.x, 10.0);
        assert_eq!(rounded.origin.y, 21.0);
        // size is recomputed as max - min after rounding both corners
        assert_eq!(rounded.size.width, 100.0);
        assert_eq!(rounded.size.height, 200.0);
    }

    #[test]
    fn test_is_within_point() {
        let a = Point::new(10.0, 20.0);
        let b = Point::new(10.05, 20.08);
        assert!(a.is_within(0.1, b));
        assert!(!a.is_within(0.01, b));
    }

    #[test]
    fn test_same_as_rect() {
        let a = Rect::from_xywh(10.0, 20.0, 100.0, 200.0);
        let b = Rect::from_xywh(10.05, 20.05, 100.05, 200.05);
        assert!(a.same_as(b));
    }

    #[test]
    fn test_contains_rect() {
        let rect = Rect::from_xywh(0.0, 0.0, 100.0, 100.0);
        assert!(rect.contains_rect(Rect::from_xywh(10.0, 10.0, 80.0, 80.0)));
        assert!(rect.contains_rect(rect));
        assert!(!rect.contains_rect(Rect::from_xywh(-10.0, -10.0, 120.0, 120.0)));
        assert!(!rect.contains_rect(Rect::from_xywh(90.0, 0.0, 20.0, 20.0)));
    }

    #[test]
    fn test_centered_on_and_mid() {
        let rect = Rect::centered_on(Point::new(50.0, 50.0), Size::new(20.0, 10.0));
        assert_eq!(rect.origin, Point::new(40.0, 45.0));
        assert_eq!(rect.mid(), Point::new(50.0, 50.0));
    }

    #[test]
    fn test_aspect_ratio_handles_degenerate_height() {
        assert_eq!(Size::new(400.0, 200.0).aspect_ratio(), 2.0);
        assert_eq!(Size::new(400.0, 0.0).aspect_ratio(), 1.0);
    }
}

//! Floating-point rectangles used to describe image regions.
//!
//! All coordinates are in pixels of the image the rectangle refers to, with X pointing right and Y
//! pointing down.

use std::fmt;

use nalgebra::{Rotation2, Vector2};

/// An axis-aligned rectangle.
///
/// Rectangles are allowed to have zero height and/or width.
#[derive(Clone, Copy, PartialEq)]
pub struct Rect {
    x: f32,
    y: f32,
    w: f32,
    h: f32,
}

impl Rect {
    /// Creates a rectangle extending outwards from a center point.
    pub fn from_center(x_center: f32, y_center: f32, width: f32, height: f32) -> Self {
        Self {
            x: x_center - width / 2.0,
            y: y_center - height / 2.0,
            w: width,
            h: height,
        }
    }

    /// Creates a rectangle extending downwards and right from a point.
    pub fn from_top_left(top_left_x: f32, top_left_y: f32, width: f32, height: f32) -> Self {
        Self {
            x: top_left_x,
            y: top_left_y,
            w: width,
            h: height,
        }
    }

    /// Computes the axis-aligned bounding rectangle of a set of points.
    ///
    /// Returns [`None`] if `points` is empty.
    pub fn bounding<I: IntoIterator<Item = [f32; 2]>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let [x, y] = iter.next()?;
        let (mut min, mut max) = ([x, y], [x, y]);
        for [x, y] in iter {
            min = [min[0].min(x), min[1].min(y)];
            max = [max[0].max(x), max[1].max(y)];
        }

        Some(Self::from_top_left(
            min[0],
            min[1],
            max[0] - min[0],
            max[1] - min[1],
        ))
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.w
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.h
    }

    #[inline]
    pub fn x_center(&self) -> f32 {
        self.x + self.w / 2.0
    }

    #[inline]
    pub fn y_center(&self) -> f32 {
        self.y + self.h / 2.0
    }

    pub fn center(&self) -> [f32; 2] {
        [self.x_center(), self.y_center()]
    }

    pub fn area(&self) -> f32 {
        self.w * self.h
    }

    /// Scales the width and height of `self` by `scale`, keeping the center in place.
    pub fn scale(&self, scale: f32) -> Self {
        Self::from_center(
            self.x_center(),
            self.y_center(),
            self.w * scale,
            self.h * scale,
        )
    }

    /// Computes the intersection of `self` and `other`.
    ///
    /// Returns [`None`] if the rectangles do not overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x_min = self.x.max(other.x);
        let y_min = self.y.max(other.y);
        let x_max = (self.x + self.w).min(other.x + other.w);
        let y_max = (self.y + self.h).min(other.y + other.h);
        if x_min > x_max || y_min > y_max {
            return None;
        }

        Some(Rect::from_top_left(x_min, y_min, x_max - x_min, y_max - y_min))
    }

    /// Computes the intersection-over-union of two rectangles.
    ///
    /// Returns `0.0` for non-overlapping rectangles and for rectangles without area.
    pub fn iou(&self, other: &Rect) -> f32 {
        let intersection = match self.intersection(other) {
            Some(rect) => rect.area(),
            None => return 0.0,
        };
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }

        intersection / union
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect @ ({:.1},{:.1})/{:.1}x{:.1}",
            self.x, self.y, self.w, self.h
        )
    }
}

/// A [`Rect`], rotated around its center.
///
/// Positive angles rotate clockwise on screen (since Y points down).
#[derive(Clone, Copy, PartialEq)]
pub struct RotatedRect {
    rect: Rect,
    radians: f32,
}

impl RotatedRect {
    pub fn new(rect: Rect, radians: f32) -> Self {
        Self { rect, radians }
    }

    /// Returns the unrotated rectangle.
    #[inline]
    pub fn rect(&self) -> &Rect {
        &self.rect
    }

    #[inline]
    pub fn rotation_radians(&self) -> f32 {
        self.radians
    }

    pub fn center(&self) -> [f32; 2] {
        self.rect.center()
    }

    /// Transforms a point from the rectangle's local coordinate system to the outer coordinate
    /// system.
    ///
    /// The local coordinate system has its origin in the top left corner of the rectangle, and
    /// extends `width` to the right and `height` downwards (before rotation).
    pub fn transform_out(&self, x: f32, y: f32) -> [f32; 2] {
        let half = Vector2::new(self.rect.width(), self.rect.height()) * 0.5;
        let [cx, cy] = self.rect.center();
        let p = Rotation2::new(self.radians) * (Vector2::new(x, y) - half);
        [p.x + cx, p.y + cy]
    }

    /// Returns the axis-aligned bounding rectangle of the four rotated corners.
    pub fn bounding_rect(&self) -> Rect {
        let (w, h) = (self.rect.width(), self.rect.height());
        let corners = [[0.0, 0.0], [w, 0.0], [w, h], [0.0, h]].map(|[x, y]| self.transform_out(x, y));
        // 4 corners are always present
        Rect::bounding(corners).unwrap_or(self.rect)
    }

    /// Computes the rotated rectangle with the given rotation that tightly bounds all `points`.
    ///
    /// Returns [`None`] if `points` is empty.
    pub fn bounding<I: IntoIterator<Item = [f32; 2]>>(radians: f32, points: I) -> Option<Self> {
        // Rotate all points into the rectangle's frame, bound them there, then rotate the center
        // back out.
        let inv = Rotation2::new(-radians);
        let rotated = Rect::bounding(points.into_iter().map(|[x, y]| {
            let p = inv * Vector2::new(x, y);
            [p.x, p.y]
        }))?;
        let [cx, cy] = rotated.center();
        let center = Rotation2::new(radians) * Vector2::new(cx, cy);

        Some(Self::new(
            Rect::from_center(center.x, center.y, rotated.width(), rotated.height()),
            radians,
        ))
    }
}

impl From<Rect> for RotatedRect {
    fn from(rect: Rect) -> Self {
        Self::new(rect, 0.0)
    }
}

impl fmt::Debug for RotatedRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} rotated {:.1}°", self.rect, self.radians.to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_PI_2, PI};

    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn iou() {
        let a = Rect::from_top_left(0.0, 0.0, 2.0, 2.0);
        assert_eq!(a.iou(&a), 1.0);
        assert_eq!(a.iou(&Rect::from_top_left(10.0, 0.0, 2.0, 2.0)), 0.0);

        let b = Rect::from_top_left(1.0, 0.0, 2.0, 2.0);
        assert_relative_eq!(a.iou(&b), 2.0 / 6.0);

        let empty = Rect::from_top_left(0.0, 0.0, 0.0, 0.0);
        assert_eq!(empty.iou(&empty), 0.0);
    }

    #[test]
    fn scale() {
        let r = Rect::from_center(5.0, 5.0, 2.0, 4.0);
        let scaled = r.scale(2.0);
        assert_eq!(scaled.center(), [5.0, 5.0]);
        assert_eq!(scaled.width(), 4.0);
        assert_eq!(scaled.height(), 8.0);
    }

    #[test]
    fn bounding() {
        assert!(Rect::bounding([]).is_none());
        assert_eq!(
            Rect::bounding([[1.0, 5.0], [3.0, 2.0], [2.0, 4.0]]).unwrap(),
            Rect::from_top_left(1.0, 2.0, 2.0, 3.0),
        );
    }

    #[test]
    fn transform_unrotated() {
        let r = RotatedRect::from(Rect::from_top_left(10.0, 20.0, 4.0, 2.0));
        assert_eq!(r.transform_out(0.0, 0.0), [10.0, 20.0]);
        assert_eq!(r.transform_out(4.0, 2.0), [14.0, 22.0]);
        assert_eq!(r.transform_out(2.0, 1.0), [12.0, 21.0]);
    }

    #[test]
    fn transform_rotated() {
        // A quarter turn clockwise on screen maps the local "up" direction to "right".
        let r = RotatedRect::new(Rect::from_center(0.0, 0.0, 2.0, 2.0), FRAC_PI_2);
        let [x, y] = r.transform_out(1.0, 0.0);
        assert_relative_eq!(x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(y, 0.0, epsilon = 1e-6);

        for _ in 0..100 {
            let r = RotatedRect::new(
                Rect::from_center(
                    fastrand::f32() * 100.0,
                    fastrand::f32() * 100.0,
                    fastrand::f32() * 50.0 + 1.0,
                    fastrand::f32() * 50.0 + 1.0,
                ),
                (fastrand::f32() - 0.5) * 2.0 * PI,
            );
            let (w, h) = (r.rect().width(), r.rect().height());
            let [cx, cy] = r.transform_out(w / 2.0, h / 2.0);
            assert_relative_eq!(cx, r.center()[0], epsilon = 1e-3);
            assert_relative_eq!(cy, r.center()[1], epsilon = 1e-3);

            let bounds = r.bounding_rect().scale(1.001);
            let [x, y] = r.transform_out(w, 0.0);
            assert!(x >= bounds.x() && x <= bounds.x() + bounds.width());
            assert!(y >= bounds.y() && y <= bounds.y() + bounds.height());
        }
    }

    #[test]
    fn rotated_bounding() {
        let points = [[0.0, 0.0], [1.0, 1.0]];
        let r = RotatedRect::bounding(0.0, points).unwrap();
        assert_eq!(r, Rect::from_top_left(0.0, 0.0, 1.0, 1.0).into());

        let r = RotatedRect::bounding(FRAC_PI_2, [[0.0, 0.0], [9.0, 9.0]]).unwrap();
        assert_relative_eq!(r.center()[0], 4.5, epsilon = 1e-4);
        assert_relative_eq!(r.center()[1], 4.5, epsilon = 1e-4);
        assert_relative_eq!(r.rect().width(), 9.0, epsilon = 1e-4);
        assert_relative_eq!(r.rect().height(), 9.0, epsilon = 1e-4);
    }
}

//! 2D affine geometry shared by bound construction, hit-testing and
//! selection. All rotation math lives here; callers never multiply matrix
//! components by hand.

/// A point in viewport coordinates (origin top-left, y growing down).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    pub fn distance_sq(&self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// A 2D affine transform `[a, b, c, d, e, f]`:
///
/// ```text
/// x' = a·x + c·y + e
/// y' = b·x + d·y + f
/// ```
///
/// The component layout matches the transform arrays reported by layout
/// engines for text runs and viewports.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Affine(pub [f64; 6]);

impl Affine {
    /// The identity transform.
    pub const IDENTITY: Affine = Affine([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    /// A pure scale transform.
    pub fn scale(s: f64) -> Self {
        Affine([s, 0.0, 0.0, s, 0.0, 0.0])
    }

    /// A rotation frame anchored at `origin`: `[cos, sin, -sin, cos, x, y]`.
    pub fn rotation_at(angle: f64, origin: Point) -> Self {
        let (sin, cos) = angle.sin_cos();
        Affine([cos, sin, -sin, cos, origin.x, origin.y])
    }

    /// Compose with another transform so that `inner` applies first:
    /// `self.compose(inner)` maps `p` to `self(inner(p))`.
    pub fn compose(&self, inner: &Affine) -> Affine {
        let m1 = &self.0;
        let m2 = &inner.0;
        Affine([
            m1[0] * m2[0] + m1[2] * m2[1],
            m1[1] * m2[0] + m1[3] * m2[1],
            m1[0] * m2[2] + m1[2] * m2[3],
            m1[1] * m2[2] + m1[3] * m2[3],
            m1[0] * m2[4] + m1[2] * m2[5] + m1[4],
            m1[1] * m2[4] + m1[3] * m2[5] + m1[5],
        ])
    }

    /// Apply the full transform (rotation/scale and translation) to a point.
    pub fn transform_point(&self, p: Point) -> Point {
        let m = &self.0;
        Point {
            x: m[0] * p.x + m[2] * p.y + m[4],
            y: m[1] * p.x + m[3] * p.y + m[5],
        }
    }

    /// Rotate a point into this frame's local axis system, ignoring the
    /// translation components. For a rotation frame
    /// `[cos, sin, -sin, cos, e, f]` this applies the inverse rotation, so
    /// a rectangle laid out along the frame becomes axis-aligned.
    pub fn rotate_to_local(&self, p: Point) -> Point {
        let m = &self.0;
        Point {
            x: p.x * m[0] + p.y * m[1],
            y: p.x * m[2] + p.y * m[3],
        }
    }

    /// Rotation angle derived from the two rotation components.
    pub fn angle(&self) -> f64 {
        self.0[1].atan2(self.0[0])
    }

    /// Translation components `(e, f)` as a point.
    pub fn origin(&self) -> Point {
        Point {
            x: self.0[4],
            y: self.0[5],
        }
    }
}

/// Axis-aligned box in viewport coordinates (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RectBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl RectBox {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Whether the box, expanded by `buff` on every side, contains `p`.
    pub fn contains(&self, p: Point, buff: f64) -> bool {
        p.x >= self.left - buff
            && p.x <= self.right + buff
            && p.y >= self.top - buff
            && p.y <= self.bottom + buff
    }

    /// The four corners in `[top-left, top-right, bottom-right, bottom-left]`
    /// order.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.left, self.top),
            Point::new(self.right, self.top),
            Point::new(self.right, self.bottom),
            Point::new(self.left, self.bottom),
        ]
    }

    /// The smallest axis-aligned box covering `points`.
    pub fn enclosing(points: &[Point]) -> RectBox {
        let mut left = f64::INFINITY;
        let mut top = f64::INFINITY;
        let mut right = f64::NEG_INFINITY;
        let mut bottom = f64::NEG_INFINITY;
        for p in points {
            left = left.min(p.x);
            top = top.min(p.y);
            right = right.max(p.x);
            bottom = bottom.max(p.y);
        }
        RectBox {
            left,
            top,
            right,
            bottom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn identity_transform_point() {
        let p = Affine::IDENTITY.transform_point(Point::new(3.0, 4.0));
        assert_eq!(p, Point::new(3.0, 4.0));
    }

    #[test]
    fn compose_applies_inner_first() {
        let translate = Affine([1.0, 0.0, 0.0, 1.0, 10.0, 20.0]);
        let scale = Affine::scale(2.0);
        // scale ∘ translate: p -> 2·(p + t)
        let m = scale.compose(&translate);
        let p = m.transform_point(Point::new(1.0, 1.0));
        assert_eq!(p, Point::new(22.0, 42.0));
    }

    #[test]
    fn angle_of_quarter_turn() {
        let m = Affine::rotation_at(FRAC_PI_2, Point::default());
        assert!((m.angle() - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn rotate_to_local_undoes_rotation() {
        let angle = 0.3;
        let frame = Affine::rotation_at(angle, Point::new(5.0, 7.0));
        // A point one unit along the frame's x axis.
        let p = frame.transform_point(Point::new(1.0, 0.0));
        let local = frame.rotate_to_local(p);
        let origin_local = frame.rotate_to_local(frame.origin());
        assert!((local.x - origin_local.x - 1.0).abs() < 1e-12);
        assert!((local.y - origin_local.y).abs() < 1e-12);
    }

    #[test]
    fn rect_contains_with_buffer() {
        let r = RectBox::new(10.0, 10.0, 20.0, 20.0);
        assert!(r.contains(Point::new(15.0, 15.0), 0.0));
        assert!(!r.contains(Point::new(22.0, 15.0), 0.0));
        assert!(r.contains(Point::new(22.0, 15.0), 3.0));
    }

    #[test]
    fn enclosing_box_of_rotated_corners() {
        let pts = [
            Point::new(1.0, 4.0),
            Point::new(3.0, 0.0),
            Point::new(5.0, 2.0),
        ];
        let b = RectBox::enclosing(&pts);
        assert_eq!(b, RectBox::new(1.0, 0.0, 5.0, 4.0));
    }

    #[test]
    fn distance_sq_is_squared_euclidean() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance_sq(b), 25.0);
    }
}

/*
This code is part of the ShapeStore geospatial data library.
Authors: Dr. John Lindsay
Created: 02/10/2026
Last Modified: 12/10/2026
License: MIT
*/
use super::Point2D;
use std::f64;
use std::fmt;

/// An axis-aligned bounding box.
///
/// The empty box has `min > max` on both axes; it overlaps nothing and is the
/// identity element of `expand_to`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// Anything that can report its extent. The spatial index only ever narrows
/// queries by this box.
pub trait Bounded {
    fn bounding_box(&self) -> BoundingBox;
}

impl Bounded for BoundingBox {
    fn bounding_box(&self) -> BoundingBox {
        *self
    }
}

impl Default for BoundingBox {
    fn default() -> BoundingBox {
        BoundingBox::empty()
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "(min_x: {}, min_y: {}, max_x: {}, max_y: {})",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

impl BoundingBox {
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> BoundingBox {
        let (x1, x2) = if min_x < max_x {
            (min_x, max_x)
        } else {
            (max_x, min_x)
        };
        let (y1, y2) = if min_y < max_y {
            (min_y, max_y)
        } else {
            (max_y, min_y)
        };
        BoundingBox {
            min_x: x1,
            min_y: y1,
            max_x: x2,
            max_y: y2,
        }
    }

    pub fn empty() -> BoundingBox {
        BoundingBox {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    pub fn from_point(p: &Point2D) -> BoundingBox {
        BoundingBox {
            min_x: p.x,
            min_y: p.y,
            max_x: p.x,
            max_y: p.y,
        }
    }

    /// The tight box around a set of points; empty for an empty slice.
    pub fn from_points(points: &[Point2D]) -> BoundingBox {
        let mut bb = BoundingBox::empty();
        for p in points {
            bb.expand_to_point(p);
        }
        bb
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn get_height(&self) -> f64 {
        if self.is_empty() {
            return 0f64;
        }
        self.max_y - self.min_y
    }

    pub fn get_width(&self) -> f64 {
        if self.is_empty() {
            return 0f64;
        }
        self.max_x - self.min_x
    }

    pub fn area(&self) -> f64 {
        self.get_width() * self.get_height()
    }

    /// Inclusive overlap test; boxes that only touch along an edge overlap.
    pub fn overlaps(&self, other: BoundingBox) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        if self.max_y < other.min_y
            || self.max_x < other.min_x
            || self.min_y > other.max_y
            || self.min_x > other.max_x
        {
            return false;
        }
        true
    }

    pub fn contains(&self, other: BoundingBox) -> bool {
        other.max_y <= self.max_y
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.min_x >= self.min_x
    }

    pub fn is_point_in_box(&self, x: f64, y: f64) -> bool {
        !(self.max_y < y || self.max_x < x || self.min_y > y || self.min_x > x)
    }

    pub fn expand_to(&mut self, other: BoundingBox) {
        self.max_y = if self.max_y >= other.max_y { self.max_y } else { other.max_y };
        self.max_x = if self.max_x >= other.max_x { self.max_x } else { other.max_x };
        self.min_y = if self.min_y <= other.min_y { self.min_y } else { other.min_y };
        self.min_x = if self.min_x <= other.min_x { self.min_x } else { other.min_x };
    }

    pub fn expand_to_point(&mut self, p: &Point2D) {
        self.expand_to(BoundingBox::from_point(p));
    }

    /// Returns the smallest box covering both boxes.
    pub fn union(&self, other: BoundingBox) -> BoundingBox {
        let mut bb = *self;
        bb.expand_to(other);
        bb
    }

    /// How much this box's area grows if it is expanded to include `other`.
    pub fn enlargement(&self, other: BoundingBox) -> f64 {
        self.union(other).area() - self.area()
    }
}

#[cfg(test)]
mod test {
    use super::BoundingBox;
    use crate::structures::Point2D;

    #[test]
    fn test_new_normalizes_corners() {
        let bb = BoundingBox::new(10.0, 0.0, 5.0, -5.0);
        assert_eq!(bb.min_x, 0.0);
        assert_eq!(bb.max_x, 10.0);
        assert_eq!(bb.min_y, -5.0);
        assert_eq!(bb.max_y, 5.0);
        assert_eq!(bb.area(), 100.0);
    }

    #[test]
    fn test_empty_box() {
        let empty = BoundingBox::empty();
        assert!(empty.is_empty());
        assert_eq!(empty.area(), 0.0);
        assert!(!empty.overlaps(BoundingBox::new(-1e300, 1e300, -1e300, 1e300)));

        let unit = BoundingBox::new(0.0, 1.0, 0.0, 1.0);
        assert_eq!(empty.union(unit), unit);
        assert_eq!(BoundingBox::from_points(&[]), empty);
    }

    #[test]
    fn test_overlaps_is_inclusive() {
        let a = BoundingBox::new(0.0, 10.0, 0.0, 10.0);
        let b = BoundingBox::new(10.0, 20.0, 10.0, 20.0);
        let c = BoundingBox::new(10.5, 20.0, 0.0, 10.0);
        assert!(a.overlaps(b));
        assert!(!a.overlaps(c));
    }

    #[test]
    fn test_enlargement() {
        let a = BoundingBox::new(0.0, 2.0, 0.0, 2.0);
        assert_eq!(a.enlargement(BoundingBox::new(1.0, 1.5, 1.0, 1.5)), 0.0);
        assert_eq!(a.enlargement(BoundingBox::new(3.0, 4.0, 0.0, 2.0)), 4.0);

        let pts = vec![Point2D::new(3.0, -1.0), Point2D::new(-2.0, 4.0)];
        let bb = BoundingBox::from_points(&pts);
        assert_eq!(bb, BoundingBox::new(-2.0, 3.0, -1.0, 4.0));
        assert!(bb.contains(BoundingBox::from_point(&pts[0])));
        assert!(bb.is_point_in_box(0.0, 0.0));
    }
}

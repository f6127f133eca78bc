use crate::structures::Point2D;

/// Shoelace area of a ring. Negative for clockwise rings, positive for
/// counter-clockwise ones. A closing vertex equal to the first contributes
/// nothing, so closed and open rings give the same result.
pub fn signed_ring_area(points: &[Point2D]) -> f64 {
    if points.len() < 3 {
        return 0f64;
    }
    let mut area = 0f64;
    for j in 0..points.len() {
        let p1 = points[j];
        let p2 = points[(j + 1) % points.len()];
        area += p1.x * p2.y - p2.x * p1.y;
    }
    area / 2.0
}

/// Checks whether a sequence of Point2D are in clockwise order. Degenerate
/// rings (fewer than three distinct vertices, or zero area) are not.
pub fn is_clockwise_order(points: &[Point2D]) -> bool {
    signed_ring_area(points) < 0f64
}

#[cfg(test)]
mod test {
    use super::{is_clockwise_order, signed_ring_area};
    use crate::structures::Point2D;
    #[test]
    fn test_is_clockwise_order() {
        let mut points: Vec<Point2D> = Vec::new();
        points.push(Point2D::new(0f64, 0f64));
        points.push(Point2D::new(1f64, 0f64));
        points.push(Point2D::new(1f64, 1f64));
        points.push(Point2D::new(0f64, 1f64));
        points.push(Point2D::new(0f64, 0f64));

        assert_eq!(is_clockwise_order(&points), false);
        assert_eq!(signed_ring_area(&points), 1f64);

        points.reverse();
        assert_eq!(is_clockwise_order(&points), true);
        assert_eq!(signed_ring_area(&points), -1f64);
    }

    #[test]
    fn test_degenerate_ring() {
        let points = vec![Point2D::new(0f64, 0f64), Point2D::new(1f64, 1f64)];
        assert!(!is_clockwise_order(&points));
    }
}

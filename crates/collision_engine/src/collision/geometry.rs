//! Closest-point primitives shared by ray casts and the narrow phase
//!
//! Based on Ericson, "Real-Time Collision Detection", chapter 5.

use crate::foundation::math::{Vec3, EPSILON};

/// Infinite plane `normal . x = distance`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal
    pub normal: Vec3,
    /// Signed distance of the plane from the origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Plane through `point` with the given unit normal
    pub fn from_point_normal(point: &Vec3, normal: Vec3) -> Self {
        Self {
            normal,
            distance: normal.dot(point),
        }
    }

    /// Signed distance from the plane, positive on the normal side
    pub fn signed_distance(&self, point: &Vec3) -> f32 {
        self.normal.dot(point) - self.distance
    }

    /// Orthogonal projection of a point onto the plane
    pub fn project(&self, point: &Vec3) -> Vec3 {
        point - self.normal * self.signed_distance(point)
    }
}

/// Closest point on segment `[a, b]` to `point`, with its parameter in `[0, 1]`
pub fn closest_point_on_segment(point: &Vec3, a: &Vec3, b: &Vec3) -> (Vec3, f32) {
    let ab = b - a;
    let length_squared = ab.norm_squared();
    if length_squared <= EPSILON * EPSILON {
        return (*a, 0.0);
    }
    let t = ((point - a).dot(&ab) / length_squared).clamp(0.0, 1.0);
    (a + ab * t, t)
}

/// Closest points between segments `[p1, q1]` and `[p2, q2]`
///
/// Returns the point on each segment. Parallel segments pick one of the
/// equally close pairs.
pub fn closest_points_between_segments(p1: &Vec3, q1: &Vec3, p2: &Vec3, q2: &Vec3) -> (Vec3, Vec3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.norm_squared();
    let e = d2.norm_squared();
    let f = d2.dot(&r);

    let eps = EPSILON * EPSILON;
    let (s, t) = if a <= eps && e <= eps {
        (0.0, 0.0)
    } else if a <= eps {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(&r);
        if e <= eps {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;
            let mut s = if denom > eps {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };

    (p1 + d1 * s, p2 + d2 * t)
}

/// True if `point`, assumed to lie in the polygon's plane, is inside the
/// convex polygon wound counter-clockwise about `normal`
pub fn point_in_convex_polygon(point: &Vec3, vertices: &[Vec3], normal: &Vec3) -> bool {
    vertices.iter().enumerate().all(|(i, a)| {
        let b = &vertices[(i + 1) % vertices.len()];
        (b - a).cross(&(point - a)).dot(normal) >= -EPSILON
    })
}

/// Closest point on a convex polygon (including its interior) to `point`
pub fn closest_point_on_convex_polygon(point: &Vec3, vertices: &[Vec3], plane: &Plane) -> Vec3 {
    let projected = plane.project(point);
    if point_in_convex_polygon(&projected, vertices, &plane.normal) {
        return projected;
    }

    let mut best = vertices[0];
    let mut best_distance = f32::INFINITY;
    for (i, a) in vertices.iter().enumerate() {
        let b = &vertices[(i + 1) % vertices.len()];
        let (candidate, _) = closest_point_on_segment(point, a, b);
        let distance = (candidate - point).norm_squared();
        if distance < best_distance {
            best_distance = distance;
            best = candidate;
        }
    }
    best
}

/// Closest points between segment `[a, b]` and a convex polygon
///
/// Returns `(point on segment, point on polygon)`. When the segment pierces
/// the polygon both points are the piercing point.
pub fn closest_points_segment_polygon(a: &Vec3, b: &Vec3, vertices: &[Vec3], plane: &Plane) -> (Vec3, Vec3) {
    let da = plane.signed_distance(a);
    let db = plane.signed_distance(b);
    if (da <= 0.0 && db >= 0.0) || (da >= 0.0 && db <= 0.0) {
        let denom = da - db;
        let t = if denom.abs() > EPSILON { da / denom } else { 0.0 };
        let crossing = a + (b - a) * t;
        if point_in_convex_polygon(&crossing, vertices, &plane.normal) {
            return (crossing, crossing);
        }
    }

    let mut best = (*a, closest_point_on_convex_polygon(a, vertices, plane));
    let mut best_distance = (best.1 - best.0).norm_squared();

    let mut consider = |on_segment: Vec3, on_polygon: Vec3| {
        let distance = (on_polygon - on_segment).norm_squared();
        if distance < best_distance {
            best_distance = distance;
            best = (on_segment, on_polygon);
        }
    };

    consider(*b, closest_point_on_convex_polygon(b, vertices, plane));
    for (i, v0) in vertices.iter().enumerate() {
        let v1 = &vertices[(i + 1) % vertices.len()];
        let (on_segment, on_edge) = closest_points_between_segments(a, b, v0, v1);
        consider(on_segment, on_edge);
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> (Vec<Vec3>, Plane) {
        let vertices = vec![
            Vec3::new(-1.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(-1.0, 0.0, -1.0),
        ];
        let plane = Plane::from_point_normal(&vertices[0], Vec3::y());
        (vertices, plane)
    }

    #[test]
    fn test_closest_point_on_segment_clamps() {
        let a = Vec3::zeros();
        let b = Vec3::new(2.0, 0.0, 0.0);

        let (p, t) = closest_point_on_segment(&Vec3::new(1.0, 5.0, 0.0), &a, &b);
        assert_relative_eq!(p, Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(t, 0.5);

        let (p, t) = closest_point_on_segment(&Vec3::new(-3.0, 0.0, 0.0), &a, &b);
        assert_relative_eq!(p, a);
        assert_eq!(t, 0.0);
    }

    #[test]
    fn test_closest_points_between_crossing_segments() {
        let (c1, c2) = closest_points_between_segments(
            &Vec3::new(-1.0, 0.0, 0.0),
            &Vec3::new(1.0, 0.0, 0.0),
            &Vec3::new(0.0, 1.0, -1.0),
            &Vec3::new(0.0, 1.0, 1.0),
        );
        assert_relative_eq!(c1, Vec3::zeros(), epsilon = 1e-6);
        assert_relative_eq!(c2, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_closest_points_between_parallel_segments() {
        let (c1, c2) = closest_points_between_segments(
            &Vec3::new(0.0, 0.0, 0.0),
            &Vec3::new(1.0, 0.0, 0.0),
            &Vec3::new(0.0, 2.0, 0.0),
            &Vec3::new(1.0, 2.0, 0.0),
        );
        assert_relative_eq!((c2 - c1).norm(), 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_point_in_convex_polygon() {
        let (vertices, plane) = unit_square();
        assert!(point_in_convex_polygon(&Vec3::zeros(), &vertices, &plane.normal));
        assert!(!point_in_convex_polygon(&Vec3::new(2.0, 0.0, 0.0), &vertices, &plane.normal));
    }

    #[test]
    fn test_closest_point_on_polygon_interior_and_edge() {
        let (vertices, plane) = unit_square();

        let above = closest_point_on_convex_polygon(&Vec3::new(0.5, 3.0, 0.5), &vertices, &plane);
        assert_relative_eq!(above, Vec3::new(0.5, 0.0, 0.5), epsilon = 1e-6);

        let beside = closest_point_on_convex_polygon(&Vec3::new(3.0, 1.0, 0.0), &vertices, &plane);
        assert_relative_eq!(beside, Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_segment_piercing_polygon() {
        let (vertices, plane) = unit_square();
        let (s, p) = closest_points_segment_polygon(
            &Vec3::new(0.0, 1.0, 0.0),
            &Vec3::new(0.0, -1.0, 0.0),
            &vertices,
            &plane,
        );
        assert_relative_eq!(s, Vec3::zeros(), epsilon = 1e-6);
        assert_relative_eq!(p, Vec3::zeros(), epsilon = 1e-6);
    }

    #[test]
    fn test_segment_above_polygon() {
        let (vertices, plane) = unit_square();
        let (s, p) = closest_points_segment_polygon(
            &Vec3::new(-0.5, 2.0, 0.0),
            &Vec3::new(0.5, 1.0, 0.0),
            &vertices,
            &plane,
        );
        assert_relative_eq!(s, Vec3::new(0.5, 1.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(p, Vec3::new(0.5, 0.0, 0.0), epsilon = 1e-6);
    }
}

//! Debug line generation for collision visualization
//!
//! Based on Game Engine Architecture 3rd Edition, Section 10.2:
//! "Debug drawing for collision detection typically includes visualizations
//! of bounding volumes, collision shapes, and query results."
//!
//! The worker produces plain line lists; drawing them is up to the caller.

use crate::collision::{Aabb, Shape, ShapeGeometry};
use crate::foundation::math::{constants, utils, Vec3};

/// One colored line segment in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderLine {
    /// Start point
    pub a: Vec3,
    /// End point
    pub b: Vec3,
    /// RGB color
    pub color: Vec3,
}

/// Colors used for tree nodes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeColors {
    /// Leaf (fattened shape) boxes
    pub leaf: Vec3,
    /// Internal node boxes
    pub internal: Vec3,
}

impl Default for TreeColors {
    fn default() -> Self {
        Self {
            leaf: Vec3::new(0.0, 1.0, 0.0),   // Green
            internal: Vec3::new(0.0, 0.5, 1.0), // Light blue
        }
    }
}

/// Accumulates debug lines
#[derive(Debug, Clone)]
pub struct DebugLineBuilder {
    lines: Vec<RenderLine>,
    circle_segments: u32,
}

impl DebugLineBuilder {
    /// Builder drawing circles with `circle_segments` segments
    pub fn new(circle_segments: u32) -> Self {
        Self {
            lines: Vec::new(),
            circle_segments: circle_segments.max(3),
        }
    }

    /// Add a single line
    pub fn line(&mut self, a: Vec3, b: Vec3, color: Vec3) {
        self.lines.push(RenderLine { a, b, color });
    }

    /// Add the twelve edges of a box
    pub fn aabb(&mut self, aabb: &Aabb, color: Vec3) {
        self.box_edges(&aabb.corners(), color);
    }

    /// Add a circle around `normal`
    pub fn circle(&mut self, center: Vec3, normal: &Vec3, radius: f32, color: Vec3) {
        let u = utils::any_perpendicular(normal) * radius;
        let v = utils::try_normalize(&normal.cross(&u)).unwrap_or_else(Vec3::zeros) * radius;
        let point_at = |i: u32| {
            let angle = constants::TAU * i as f32 / self.circle_segments as f32;
            center + u * angle.cos() + v * angle.sin()
        };
        let points: Vec<Vec3> = (0..=self.circle_segments).map(point_at).collect();
        for pair in points.windows(2) {
            self.line(pair[0], pair[1], color);
        }
    }

    /// Add a wireframe of a shape in its debug color
    pub fn shape(&mut self, shape: &Shape) {
        let color = shape.debug_color();
        let transform = shape.object_to_world();
        match shape.geometry() {
            ShapeGeometry::Sphere(sphere) => {
                let center = sphere.world_center(transform);
                for axis in [Vec3::x(), Vec3::y(), Vec3::z()] {
                    self.circle(center, &transform.transform_vector(&axis), sphere.radius, color);
                }
            }
            ShapeGeometry::Box(box_shape) => {
                self.box_edges(&box_shape.world_corners(transform), color);
            }
            ShapeGeometry::Capsule(capsule) => {
                let (a, b) = capsule.world_spine(transform);
                let radius = capsule.radius;
                let axis = utils::try_normalize(&(b - a)).unwrap_or_else(Vec3::y);
                let side = utils::any_perpendicular(&axis);
                let other_side = axis.cross(&side);
                self.circle(a, &axis, radius, color);
                self.circle(b, &axis, radius, color);
                for offset in [side, -side, other_side, -other_side] {
                    self.line(a + offset * radius, b + offset * radius, color);
                }
                // Cap outlines
                self.circle(a, &side, radius, color);
                self.circle(b, &side, radius, color);
            }
            ShapeGeometry::Polygon(_) => {
                let vertices = &shape.world_polygon().vertices;
                for (i, &start) in vertices.iter().enumerate() {
                    self.line(start, vertices[(i + 1) % vertices.len()], color);
                }
            }
        }
    }

    /// Add a shape's world bounding box in the inverse of its debug color
    pub fn shape_bounds(&mut self, shape: &Shape) {
        let inverse = Vec3::repeat(1.0) - shape.debug_color();
        self.aabb(shape.world_bounding_box(), inverse);
    }

    /// Number of lines so far
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True if no lines were added
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Finish and take the lines
    pub fn finish(self) -> Vec<RenderLine> {
        self.lines
    }

    /// Corners in `Aabb::corners` order: a ring at min z, then a ring at max z
    fn box_edges(&mut self, corners: &[Vec3; 8], color: Vec3) {
        const EDGES: [(usize, usize); 12] = [
            (0, 1), (1, 2), (2, 3), (3, 0),
            (4, 5), (5, 6), (6, 7), (7, 4),
            (0, 4), (1, 5), (2, 6), (3, 7),
        ];
        for (a, b) in EDGES {
            self.line(corners[a], corners[b], color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_box_edges_have_unit_axis_lengths() {
        let mut builder = DebugLineBuilder::new(8);
        builder.aabb(&Aabb::new(Vec3::zeros(), Vec3::repeat(1.0)), Vec3::x());
        let lines = builder.finish();
        assert_eq!(lines.len(), 12);
        for line in lines {
            assert_relative_eq!((line.b - line.a).norm(), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_circle_points_lie_on_radius() {
        let mut builder = DebugLineBuilder::new(12);
        let center = Vec3::new(1.0, 2.0, 3.0);
        builder.circle(center, &Vec3::z(), 2.0, Vec3::y());
        assert_eq!(builder.len(), 12);
        for line in builder.finish() {
            assert_relative_eq!((line.a - center).norm(), 2.0, epsilon = 1e-5);
            assert_relative_eq!(line.a.z, 3.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_shape_bounds_use_inverse_color() {
        let shape = Shape::sphere(1.0).with_debug_color(Vec3::new(1.0, 0.25, 0.0));
        let mut builder = DebugLineBuilder::new(8);
        builder.shape_bounds(&shape);
        let lines = builder.finish();
        assert_eq!(lines.len(), 12);
        assert_relative_eq!(lines[0].color, Vec3::new(0.0, 0.75, 1.0));
    }

    #[test]
    fn test_polygon_outline_is_closed() {
        let shape = Shape::polygon(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, -1.0),
        ]);
        let mut builder = DebugLineBuilder::new(8);
        builder.shape(&shape);
        let lines = builder.finish();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2].b, lines[0].a);
    }
}

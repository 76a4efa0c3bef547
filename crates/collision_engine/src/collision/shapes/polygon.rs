//! Planar convex polygon geometry
//!
//! Polygons are mostly used for static level geometry (floors, walls and
//! ramps). Vertices wind counter-clockwise when viewed from the side the
//! normal points to.

use serde::{Deserialize, Serialize};

use crate::collision::aabb::Aabb;
use crate::collision::geometry::{point_in_convex_polygon, Plane};
use crate::collision::ray::{Ray, RayHit};
use crate::collision::shape::ShapeValidationError;
use crate::foundation::math::{utils, RigidTransform, Vec3, EPSILON};

/// Convex planar polygon in object space
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polygon {
    vertices: Vec<Vec3>,
}

impl Polygon {
    /// Create a polygon from its vertices
    pub fn new(vertices: Vec<Vec3>) -> Self {
        Self { vertices }
    }

    /// Object-space vertices
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Replace the vertices, reusing the existing allocation
    pub fn set_vertices(&mut self, vertices: &[Vec3]) {
        self.vertices.clear();
        self.vertices.extend_from_slice(vertices);
    }

    /// Drop all vertices, keeping the allocation
    pub fn clear(&mut self) {
        self.vertices.clear();
    }

    /// Normal by Newell's method, `None` when the polygon has no area
    pub fn normal(&self) -> Option<Vec3> {
        newell_normal(&self.vertices)
    }

    /// Polygon must have at least three finite vertices, non-zero area, lie
    /// in one plane and be convex
    pub fn validate(&self) -> Result<(), ShapeValidationError> {
        let count = self.vertices.len();
        if count < 3 {
            return Err(ShapeValidationError::TooFewVertices(count));
        }
        if !self.vertices.iter().all(utils::is_finite) {
            return Err(ShapeValidationError::NonFiniteGeometry);
        }
        let normal = self.normal().ok_or(ShapeValidationError::ZeroArea)?;

        let scale = self
            .vertices
            .iter()
            .map(|v| (v - self.vertices[0]).norm())
            .fold(1.0_f32, f32::max);
        let plane = Plane::from_point_normal(&self.vertices[0], normal);
        if self
            .vertices
            .iter()
            .any(|v| plane.signed_distance(v).abs() > 1e-4 * scale)
        {
            return Err(ShapeValidationError::NonPlanar);
        }

        for i in 0..count {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % count];
            let c = self.vertices[(i + 2) % count];
            if (b - a).cross(&(c - b)).dot(&normal) < -EPSILON * scale * scale {
                return Err(ShapeValidationError::NonConvex);
            }
        }
        Ok(())
    }

    /// World-space vertices
    pub fn world_vertices(&self, object_to_world: &RigidTransform, out: &mut Vec<Vec3>) {
        out.clear();
        out.extend(self.vertices.iter().map(|v| object_to_world.transform_point(v)));
    }
}

/// World-space data derived from a polygon and its transform
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolygonCache {
    /// Vertices in world space
    pub vertices: Vec<Vec3>,
    /// Supporting plane in world space
    pub plane: Option<Plane>,
    /// Average of the world vertices
    pub center: Vec3,
}

impl PolygonCache {
    /// Rebuild from the polygon under a transform
    pub fn update(&mut self, polygon: &Polygon, object_to_world: &RigidTransform) {
        polygon.world_vertices(object_to_world, &mut self.vertices);
        self.plane = newell_normal(&self.vertices)
            .map(|normal| Plane::from_point_normal(&self.vertices[0], normal));
        self.center = if self.vertices.is_empty() {
            Vec3::zeros()
        } else {
            self.vertices.iter().sum::<Vec3>() / self.vertices.len() as f32
        };
    }

    /// World-space bounding box
    pub fn aabb(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices.iter())
    }

    /// Ray against the polygon; both faces can be hit
    pub fn ray_cast(&self, ray: &Ray) -> Option<RayHit> {
        let plane = self.plane?;
        let denom = plane.normal.dot(&ray.direction);
        if denom.abs() < EPSILON {
            return None;
        }
        let alpha = -plane.signed_distance(&ray.origin) / denom;
        if alpha < 0.0 {
            return None;
        }
        let point = ray.point_at(alpha);
        if !point_in_convex_polygon(&point, &self.vertices, &plane.normal) {
            return None;
        }
        let normal = if denom < 0.0 { plane.normal } else { -plane.normal };
        Some(RayHit { alpha, point, normal })
    }
}

fn newell_normal(vertices: &[Vec3]) -> Option<Vec3> {
    let mut normal = Vec3::zeros();
    for (i, current) in vertices.iter().enumerate() {
        let next = vertices[(i + 1) % vertices.len()];
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }
    utils::try_normalize(&normal)
}

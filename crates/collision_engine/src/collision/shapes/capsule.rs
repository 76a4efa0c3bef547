//! Capsule geometry: a line segment swept by a sphere

use serde::{Deserialize, Serialize};

use crate::collision::aabb::Aabb;
use crate::collision::ray::{Ray, RayHit};
use crate::collision::shape::ShapeValidationError;
use crate::collision::shapes::sphere::ray_cast_sphere;
use crate::foundation::math::{utils, RigidTransform, Vec3, EPSILON};

/// Capsule defined by two spine endpoints and a radius
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capsule {
    /// First spine endpoint in object space
    pub vertex_a: Vec3,
    /// Second spine endpoint in object space
    pub vertex_b: Vec3,
    /// Radius, must be positive
    pub radius: f32,
}

impl Default for Capsule {
    fn default() -> Self {
        Self {
            vertex_a: Vec3::new(0.0, -1.0, 0.0),
            vertex_b: Vec3::new(0.0, 1.0, 0.0),
            radius: 0.5,
        }
    }
}

impl Capsule {
    /// Create a new capsule
    pub fn new(vertex_a: Vec3, vertex_b: Vec3, radius: f32) -> Self {
        Self { vertex_a, vertex_b, radius }
    }

    /// Reject zero or non-finite radii and non-finite endpoints
    pub fn validate(&self) -> Result<(), ShapeValidationError> {
        if !(utils::is_finite(&self.vertex_a) && utils::is_finite(&self.vertex_b)) {
            return Err(ShapeValidationError::NonFiniteGeometry);
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(ShapeValidationError::InvalidRadius(self.radius));
        }
        Ok(())
    }

    /// Spine endpoints in world space
    pub fn world_spine(&self, object_to_world: &RigidTransform) -> (Vec3, Vec3) {
        (
            object_to_world.transform_point(&self.vertex_a),
            object_to_world.transform_point(&self.vertex_b),
        )
    }

    /// World-space bounding box
    pub fn world_aabb(&self, object_to_world: &RigidTransform) -> Aabb {
        let (a, b) = self.world_spine(object_to_world);
        Aabb::new(a.inf(&b), a.sup(&b)).expanded(self.radius)
    }

    /// First point where a world-space ray enters the capsule
    ///
    /// The tube is tested as an infinite cylinder clipped to the spine, then
    /// each end cap as a sphere; the nearest entering hit wins.
    pub fn ray_cast(&self, ray: &Ray, object_to_world: &RigidTransform) -> Option<RayHit> {
        let (a, b) = self.world_spine(object_to_world);
        let mut best = ray_cast_tube(ray, &a, &b, self.radius);

        for cap in [a, b] {
            if let Some(hit) = ray_cast_sphere(ray, &cap, self.radius) {
                if best.map_or(true, |current| hit.alpha < current.alpha) {
                    best = Some(hit);
                }
            }
        }
        best
    }
}

fn ray_cast_tube(ray: &Ray, a: &Vec3, b: &Vec3, radius: f32) -> Option<RayHit> {
    let axis = b - a;
    let axis_length = axis.norm();
    if axis_length < EPSILON {
        return None;
    }
    let axis = axis / axis_length;

    // Remove the axial component and solve the 2D circle problem
    let m = ray.origin - a;
    let d_perp = ray.direction - axis * ray.direction.dot(&axis);
    let m_perp = m - axis * m.dot(&axis);

    let qa = d_perp.norm_squared();
    if qa < EPSILON {
        // Parallel to the spine, only the caps can be hit
        return None;
    }
    let qb = 2.0 * d_perp.dot(&m_perp);
    let qc = m_perp.norm_squared() - radius * radius;
    let discriminant = qb * qb - 4.0 * qa * qc;
    if discriminant < 0.0 {
        return None;
    }
    let alpha = (-qb - discriminant.sqrt()) / (2.0 * qa);
    if alpha < 0.0 {
        return None;
    }

    let point = ray.point_at(alpha);
    let along = (point - a).dot(&axis);
    if along < 0.0 || along > axis_length {
        return None;
    }
    let normal = (point - (a + axis * along)) / radius;
    Some(RayHit { alpha, point, normal })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn vertical_capsule() -> Capsule {
        Capsule::new(Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, 1.0, 0.0), 0.5)
    }

    #[test]
    fn test_capsule_validation() {
        assert!(vertical_capsule().validate().is_ok());
        let mut capsule = vertical_capsule();
        capsule.radius = 0.0;
        assert!(matches!(capsule.validate(), Err(ShapeValidationError::InvalidRadius(_))));
    }

    #[test]
    fn test_capsule_world_aabb() {
        let aabb = vertical_capsule().world_aabb(&RigidTransform::from_translation(Vec3::new(1.0, 0.0, 0.0)));
        assert_relative_eq!(aabb.min, Vec3::new(0.5, -1.5, -0.5));
        assert_relative_eq!(aabb.max, Vec3::new(1.5, 1.5, 0.5));
    }

    #[test]
    fn test_capsule_ray_cast_hits_tube() {
        let ray = Ray::new(Vec3::new(5.0, 0.5, 0.0), Vec3::new(-1.0, 0.0, 0.0));
        let hit = vertical_capsule()
            .ray_cast(&ray, &RigidTransform::identity())
            .expect("hit");
        assert_relative_eq!(hit.point, Vec3::new(0.5, 0.5, 0.0), epsilon = 1e-5);
        assert_relative_eq!(hit.normal, Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_capsule_ray_cast_hits_cap() {
        let ray = Ray::new(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        let hit = vertical_capsule()
            .ray_cast(&ray, &RigidTransform::identity())
            .expect("hit");
        assert_relative_eq!(hit.point, Vec3::new(0.0, 1.5, 0.0), epsilon = 1e-5);
        assert_relative_eq!(hit.alpha, 8.5, epsilon = 1e-5);
    }

    #[test]
    fn test_capsule_ray_cast_miss() {
        let ray = Ray::new(Vec3::new(5.0, 3.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
        assert!(vertical_capsule().ray_cast(&ray, &RigidTransform::identity()).is_none());
    }
}

//! Sphere geometry

use serde::{Deserialize, Serialize};

use crate::collision::aabb::Aabb;
use crate::collision::ray::{Ray, RayHit};
use crate::collision::shape::ShapeValidationError;
use crate::foundation::math::{utils, RigidTransform, Vec3};

/// Sphere with an object-space center and a radius
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    /// Center in object space
    pub center: Vec3,
    /// Radius, must be positive
    pub radius: f32,
}

impl Default for Sphere {
    fn default() -> Self {
        Self {
            center: Vec3::zeros(),
            radius: 1.0,
        }
    }
}

impl Sphere {
    /// Create a new sphere
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Reject non-finite centers and non-positive radii
    pub fn validate(&self) -> Result<(), ShapeValidationError> {
        if !utils::is_finite(&self.center) {
            return Err(ShapeValidationError::NonFiniteGeometry);
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(ShapeValidationError::InvalidRadius(self.radius));
        }
        Ok(())
    }

    /// World-space center
    pub fn world_center(&self, object_to_world: &RigidTransform) -> Vec3 {
        object_to_world.transform_point(&self.center)
    }

    /// World-space bounding box
    pub fn world_aabb(&self, object_to_world: &RigidTransform) -> Aabb {
        Aabb::from_center_extents(self.world_center(object_to_world), Vec3::repeat(self.radius))
    }

    /// First point where a world-space ray enters the sphere
    pub fn ray_cast(&self, ray: &Ray, object_to_world: &RigidTransform) -> Option<RayHit> {
        let center = self.world_center(object_to_world);
        ray_cast_sphere(ray, &center, self.radius)
    }
}

/// Ray against a world-space sphere, entering hits only
pub(crate) fn ray_cast_sphere(ray: &Ray, center: &Vec3, radius: f32) -> Option<RayHit> {
    // |o + t*d - c|^2 = r^2 with |d| = 1
    let m = ray.origin - center;
    let b = m.dot(&ray.direction);
    let c = m.norm_squared() - radius * radius;
    if c > 0.0 && b > 0.0 {
        return None;
    }
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let alpha = -b - discriminant.sqrt();
    if alpha < 0.0 {
        // Origin inside the sphere
        return None;
    }
    let point = ray.point_at(alpha);
    Some(RayHit {
        alpha,
        point,
        normal: (point - center) / radius,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sphere_validation() {
        assert!(Sphere::new(Vec3::zeros(), 1.0).validate().is_ok());
        assert!(matches!(
            Sphere::new(Vec3::zeros(), 0.0).validate(),
            Err(ShapeValidationError::InvalidRadius(_))
        ));
        assert!(Sphere::new(Vec3::new(f32::INFINITY, 0.0, 0.0), 1.0).validate().is_err());
    }

    #[test]
    fn test_sphere_world_aabb() {
        let sphere = Sphere::new(Vec3::new(1.0, 0.0, 0.0), 2.0);
        let transform = RigidTransform::from_translation(Vec3::new(0.0, 5.0, 0.0));
        let aabb = sphere.world_aabb(&transform);
        assert_relative_eq!(aabb.min, Vec3::new(-1.0, 3.0, -2.0));
        assert_relative_eq!(aabb.max, Vec3::new(3.0, 7.0, 2.0));
    }

    #[test]
    fn test_sphere_ray_cast() {
        let sphere = Sphere::new(Vec3::zeros(), 1.0);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));

        let hit = sphere.ray_cast(&ray, &RigidTransform::identity()).expect("hit");
        assert_relative_eq!(hit.alpha, 4.0, epsilon = 1e-5);
        assert_relative_eq!(hit.point, Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-5);
        assert_relative_eq!(hit.normal, Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-5);

        let miss = Ray::new(Vec3::new(3.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(sphere.ray_cast(&miss, &RigidTransform::identity()).is_none());
    }
}

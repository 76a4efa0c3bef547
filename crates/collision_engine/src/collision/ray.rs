//! Rays for ray casting

use crate::foundation::math::{utils, Vec3};
use serde::{Deserialize, Serialize};

/// A ray for ray casting and picking
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    /// The origin point of the ray in world space
    pub origin: Vec3,
    /// The direction of the ray (unit length)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray with the given origin and direction
    ///
    /// A zero direction is kept as zero; such a ray hits nothing and
    /// [`Ray::is_valid`] reports it.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: utils::try_normalize(&direction).unwrap_or_else(Vec3::zeros),
        }
    }

    /// Ray from `from` through `to`
    pub fn between(from: Vec3, to: Vec3) -> Self {
        Self::new(from, to - from)
    }

    /// Get a point along the ray at distance `alpha`
    pub fn point_at(&self, alpha: f32) -> Vec3 {
        self.origin + self.direction * alpha
    }

    /// True if the origin is finite and the direction is unit length
    pub fn is_valid(&self) -> bool {
        utils::is_finite(&self.origin) && (self.direction.norm_squared() - 1.0).abs() < 1e-3
    }
}

/// Where a ray struck a surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance along the ray to the hit
    pub alpha: f32,
    /// The point of intersection in world space
    pub point: Vec3,
    /// The surface normal at the intersection point
    pub normal: Vec3,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ray_normalizes_direction() {
        let ray = Ray::new(Vec3::zeros(), Vec3::new(0.0, 0.0, -5.0));
        assert_relative_eq!(ray.direction, Vec3::new(0.0, 0.0, -1.0));
        assert_relative_eq!(ray.point_at(2.0), Vec3::new(0.0, 0.0, -2.0));
        assert!(ray.is_valid());
    }

    #[test]
    fn test_zero_direction_is_invalid() {
        let ray = Ray::new(Vec3::zeros(), Vec3::zeros());
        assert!(!ray.is_valid());
    }
}

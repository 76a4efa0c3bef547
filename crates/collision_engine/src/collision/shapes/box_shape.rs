//! Oriented box geometry
//!
//! The box is centered on its object-space origin; `extents` are half sizes.
//! Orientation and position come entirely from the object-to-world transform.

use serde::{Deserialize, Serialize};

use crate::collision::aabb::Aabb;
use crate::collision::ray::{Ray, RayHit};
use crate::collision::shape::ShapeValidationError;
use crate::foundation::math::{Mat3, RigidTransform, Vec3};

/// Box with half-size extents along its local axes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxShape {
    /// Half sizes, all positive
    pub extents: Vec3,
}

impl Default for BoxShape {
    fn default() -> Self {
        Self {
            extents: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl BoxShape {
    /// Create a new box from half sizes
    pub fn new(extents: Vec3) -> Self {
        Self { extents }
    }

    /// Reject non-finite or non-positive extents
    pub fn validate(&self) -> Result<(), ShapeValidationError> {
        if self.extents.iter().all(|e| e.is_finite() && *e > 0.0) {
            Ok(())
        } else {
            Err(ShapeValidationError::InvalidExtents(self.extents))
        }
    }

    /// The box in its own space
    pub fn local_aabb(&self) -> Aabb {
        Aabb::from_center_extents(Vec3::zeros(), self.extents)
    }

    /// World-space bounding box of the rotated box
    pub fn world_aabb(&self, object_to_world: &RigidTransform) -> Aabb {
        let rotation: Mat3 = object_to_world.rotation.to_rotation_matrix().into_inner();
        let world_extents = rotation.abs() * self.extents;
        Aabb::from_center_extents(object_to_world.translation, world_extents)
    }

    /// The eight world-space corners
    pub fn world_corners(&self, object_to_world: &RigidTransform) -> [Vec3; 8] {
        self.local_aabb()
            .corners()
            .map(|corner| object_to_world.transform_point(&corner))
    }

    /// First point where a world-space ray enters the box
    ///
    /// The ray is carried into object space so the slab test runs against
    /// an axis-aligned box.
    pub fn ray_cast(
        &self,
        ray: &Ray,
        object_to_world: &RigidTransform,
        world_to_object: &RigidTransform,
    ) -> Option<RayHit> {
        let local_ray = Ray {
            origin: world_to_object.transform_point(&ray.origin),
            direction: world_to_object.transform_vector(&ray.direction),
        };

        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        let mut enter_normal = Vec3::zeros();

        for axis in 0..3 {
            let origin = local_ray.origin[axis];
            let direction = local_ray.direction[axis];
            let extent = self.extents[axis];
            if direction.abs() < f32::EPSILON {
                if origin < -extent || origin > extent {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / direction;
            let (mut t0, mut t1) = ((-extent - origin) * inv, (extent - origin) * inv);
            let mut sign = -1.0;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
                sign = 1.0;
            }
            if t0 > t_enter {
                t_enter = t0;
                enter_normal = Vec3::zeros();
                enter_normal[axis] = sign;
            }
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return None;
            }
        }

        // Rays starting inside the box never enter it
        if t_enter < 0.0 || !t_enter.is_finite() {
            return None;
        }

        Some(RayHit {
            alpha: t_enter,
            point: ray.point_at(t_enter),
            normal: object_to_world.transform_vector(&enter_normal),
        })
    }
}

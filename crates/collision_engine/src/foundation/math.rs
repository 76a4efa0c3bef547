//! Math utilities and types
//!
//! Provides the fundamental math types used by shapes, the bounding volume
//! hierarchy and the narrow phase. Everything is `f32`, matching the rest of
//! the engine.

pub use nalgebra::{
    Vector3, Vector4,
    Matrix3, Matrix4,
    Quaternion,
    Unit,
};
use serde::{Deserialize, Serialize};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Tolerance used by geometric predicates throughout the collision code
pub const EPSILON: f32 = 1e-6;

/// Rigid object-to-world transform: a rotation followed by a translation
///
/// Collision shapes never carry scale; sizes live in the shape geometry so
/// that the inverse is always cheap and exact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    /// Rotation quaternion
    pub rotation: Quat,

    /// Translation in world space
    pub translation: Vec3,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self {
            rotation: Quat::identity(),
            translation: Vec3::zeros(),
        }
    }
}

impl RigidTransform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only a translation
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Create a transform with rotation and translation
    pub fn from_rotation_translation(rotation: Quat, translation: Vec3) -> Self {
        Self { rotation, translation }
    }

    /// Convert to a homogeneous transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.translation) * self.rotation.to_homogeneous()
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: &Vec3) -> Vec3 {
        self.rotation * point + self.translation
    }

    /// Apply this transform to a direction (translation is ignored)
    pub fn transform_vector(&self, vector: &Vec3) -> Vec3 {
        self.rotation * vector
    }

    /// Combine two transforms; the result applies `other` first, then `self`
    pub fn combine(&self, other: &Self) -> Self {
        Self {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    /// Get the inverse transform
    pub fn inverse(&self) -> Self {
        let inv_rotation = self.rotation.inverse();
        Self {
            rotation: inv_rotation,
            translation: inv_rotation * (-self.translation),
        }
    }

    /// True if every component is finite
    pub fn is_valid(&self) -> bool {
        self.translation.iter().all(|c| c.is_finite())
            && self.rotation.coords.iter().all(|c| c.is_finite())
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = 2.0 * PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;
}

/// Math utility functions
pub mod utils {
    use super::{Vec3, EPSILON};

    /// True if every component of the vector is finite
    pub fn is_finite(v: &Vec3) -> bool {
        v.iter().all(|c| c.is_finite())
    }

    /// Normalize a vector, or return `None` when it is (nearly) zero length
    pub fn try_normalize(v: &Vec3) -> Option<Vec3> {
        v.try_normalize(EPSILON)
    }

    /// Any unit vector perpendicular to `v`
    pub fn any_perpendicular(v: &Vec3) -> Vec3 {
        let axis = if v.x.abs() < 0.577 {
            Vec3::x()
        } else if v.y.abs() < 0.577 {
            Vec3::y()
        } else {
            Vec3::z()
        };
        v.cross(&axis).try_normalize(EPSILON).unwrap_or_else(Vec3::x)
    }

    /// Linear interpolation between two points
    pub fn lerp(a: &Vec3, b: &Vec3, t: f32) -> Vec3 {
        a + (b - a) * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rigid_transform_inverse_round_trip() {
        let transform = RigidTransform::from_rotation_translation(
            Quat::from_axis_angle(&Vec3::y_axis(), constants::HALF_PI),
            Vec3::new(1.0, 2.0, 3.0),
        );
        let point = Vec3::new(4.0, -1.0, 0.5);

        let world = transform.transform_point(&point);
        let back = transform.inverse().transform_point(&world);

        assert_relative_eq!(back, point, epsilon = 1e-5);
    }

    #[test]
    fn test_rigid_transform_combine_matches_matrix() {
        let a = RigidTransform::from_rotation_translation(
            Quat::from_axis_angle(&Vec3::z_axis(), 0.3),
            Vec3::new(1.0, 0.0, 0.0),
        );
        let b = RigidTransform::from_translation(Vec3::new(0.0, 2.0, 0.0));
        let point = Vec3::new(1.0, 1.0, 1.0);

        let combined = a.combine(&b).transform_point(&point);
        let via_matrix = (a.to_matrix() * b.to_matrix())
            .transform_point(&Point3::from(point))
            .coords;

        assert_relative_eq!(combined, via_matrix, epsilon = 1e-5);
    }

    #[test]
    fn test_invalid_transform_detected() {
        let transform = RigidTransform::from_translation(Vec3::new(f32::NAN, 0.0, 0.0));
        assert!(!transform.is_valid());
        assert!(RigidTransform::identity().is_valid());
    }

    #[test]
    fn test_any_perpendicular_is_orthogonal() {
        for v in [Vec3::x(), Vec3::y(), Vec3::z(), Vec3::new(1.0, 1.0, 1.0).normalize()] {
            let p = utils::any_perpendicular(&v);
            assert!(p.dot(&v).abs() < 1e-5);
            assert_relative_eq!(p.norm(), 1.0, epsilon = 1e-5);
        }
    }
}

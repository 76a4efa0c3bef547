//! Collision geometry and exact shape tests
//!
//! Provides the shape types held by the collision world, the bounding volume
//! and ray primitives they are queried with, and the narrow phase that
//! decides whether two shapes actually touch.

pub mod aabb;
pub mod geometry;
pub mod narrow_phase;
pub mod ray;
pub mod shape;
pub mod shapes;

pub use aabb::Aabb;
pub use narrow_phase::{collide, NarrowPhaseError, PairKind, ShapePairCollisionStatus};
pub use ray::{Ray, RayHit};
pub use shape::{
    Shape, ShapeGeometry, ShapeId, ShapePool, ShapeType, ShapeValidationError, DEFAULT_DEBUG_COLOR,
};
pub use shapes::{BoxShape, Capsule, Polygon, Sphere};

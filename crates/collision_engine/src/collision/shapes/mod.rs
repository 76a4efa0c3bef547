//! Concrete collision shape geometries
//!
//! Each geometry is stored in object space. World-space data is derived from
//! an object-to-world [`RigidTransform`](crate::foundation::math::RigidTransform)
//! by the owning [`Shape`](crate::collision::shape::Shape).

pub mod box_shape;
pub mod capsule;
pub mod polygon;
pub mod sphere;

pub use box_shape::BoxShape;
pub use capsule::Capsule;
pub use polygon::Polygon;
pub use sphere::Sphere;

//! # Collision Engine
//!
//! An asynchronous collision system: shape tests, spatial queries and world
//! mutations run on a background worker while the game thread keeps going.
//!
//! ## Features
//!
//! - **Shapes**: spheres, oriented boxes, capsules and convex polygons
//! - **Broad Phase**: a dynamic bounding volume hierarchy with fattened leaves
//! - **Narrow Phase**: exact pair tests with separation deltas, cached per pair
//! - **Async Tasks**: commands and queries tracked by task id, results claimed once
//! - **Dump/Restore**: the whole world saved to and loaded from a binary file
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use collision_engine::prelude::*;
//!
//! fn main() -> Result<(), CollisionError> {
//!     let errors = ErrorLog::new();
//!     let mut system = CollisionSystem::new(CollisionConfig::default(), errors.clone());
//!     system.initialize(Aabb::from_center_extents(Vec3::zeros(), Vec3::repeat(1000.0)))?;
//!
//!     let ship = system.add_shape(Shape::sphere(1.0), AddFlags::empty());
//!     let rock = system.add_shape(
//!         Shape::cuboid(Vec3::repeat(2.0)).with_position(Vec3::new(2.5, 0.0, 0.0)),
//!         AddFlags::empty(),
//!     );
//!
//!     // Every frame: submit work, then pick up whatever has finished
//!     let contacts = system.make_query(Query::collision(ship));
//!     system.flush_all_tasks();
//!     if let Some(result) = system.obtain_result::<CollisionQueryResult>(contacts) {
//!         for pair in &result.collisions {
//!             assert_eq!(pair.other_shape(ship), Some(rock));
//!         }
//!     }
//!
//!     system.shutdown();
//!     for message in errors.all_error_messages() {
//!         eprintln!("{message}");
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod collision;
pub mod spatial;
pub mod system;

mod error;

pub use error::{CollisionError, ErrorLog};

/// Common imports for collision engine users
pub mod prelude {
    pub use crate::{
        CollisionError, ErrorLog,
        foundation::math::{Quat, RigidTransform, Vec3},
        config::{CollisionConfig, Config},
        collision::{Aabb, Ray, Shape, ShapeId, ShapePairCollisionStatus, ShapeType},
        system::{
            AddFlags, BoolResult, CollisionQueryResult, CollisionSystem, Command, DebugRenderResult,
            DrawFlags, FileResult, NearestGroundResult, ProfileStatsResult, Query, QueryResult,
            RayCastResult, StatsResult, TaskId, TaskState, TransformResult,
        },
    };
}

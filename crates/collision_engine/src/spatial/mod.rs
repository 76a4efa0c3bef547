//! Spatial partitioning data structures
//!
//! Provides the broad phase: a dynamic bounding volume hierarchy used to
//! cull shape pairs and ray candidates before any exact test runs.

pub mod bvh;
pub mod spatial_index;

pub use bvh::DynamicBvh;
pub use spatial_index::{SpatialError, SpatialIndex, SpatialIndexStats};

//! Abstract spatial index interface for broad-phase collision detection
//!
//! Based on Game Engine Architecture 3rd Edition, Section 13.3.2:
//! "Spatial partitioning schemes... allow us to quickly cull out pairs of
//! objects that cannot possibly be colliding."
//!
//! The collision world only talks to this trait, so the partitioning scheme
//! can be swapped without touching command or query handling.

use std::ops::ControlFlow;

use crate::collision::{Aabb, Ray};

/// Errors reported by a spatial index
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialError {
    /// The key is already indexed
    #[error("key is already present in the spatial index")]
    DuplicateKey,
    /// The key is not indexed
    #[error("key is not present in the spatial index")]
    UnknownKey,
    /// The bounding box is inverted or not finite
    #[error("bounding box is not valid")]
    InvalidBounds,
    /// An internal structural check failed
    #[error("spatial index is corrupt: {0}")]
    Corrupt(&'static str),
}

/// Shape of the index, for statistics reporting
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpatialIndexStats {
    /// Number of indexed keys
    pub leaf_count: usize,
    /// Number of nodes including internal ones
    pub node_count: usize,
    /// Longest root-to-leaf path, 0 for an empty or single-leaf tree
    pub height: u32,
    /// Summed surface area of internal nodes (lower is a better tree)
    pub internal_surface_area: f32,
}

/// Broad-phase spatial index over bounding boxes
///
/// GEA 13.3.2: "The broad phase quickly identifies pairs of objects that might
/// be colliding using some kind of spatial partitioning scheme."
pub trait SpatialIndex<K>: Send {
    /// Index `key` with bounding box `aabb`
    fn insert(&mut self, key: K, aabb: &Aabb) -> Result<(), SpatialError>;

    /// Remove `key` from the index
    fn remove(&mut self, key: K) -> Result<(), SpatialError>;

    /// Move `key` to a new bounding box
    ///
    /// Returns `true` if the structure changed.
    fn update(&mut self, key: K, aabb: &Aabb) -> Result<bool, SpatialError>;

    /// True if `key` is indexed
    fn contains(&self, key: K) -> bool;

    /// Visit every key whose stored bounds overlap `aabb` until the visitor breaks
    fn query_aabb(&self, aabb: &Aabb, visitor: &mut dyn FnMut(K) -> ControlFlow<()>);

    /// Visit keys whose stored bounds are hit by `ray`, nearest first
    ///
    /// The visitor receives the entry distance of the key's bounds and
    /// returns the new maximum distance; bounds entered beyond it are skipped.
    fn query_ray(&self, ray: &Ray, max_alpha: f32, visitor: &mut dyn FnMut(K, f32) -> f32);

    /// Visit every node's bounds with its depth and whether it is a leaf
    fn for_each_bound(&self, visitor: &mut dyn FnMut(&Aabb, u32, bool));

    /// Remove every key
    fn clear(&mut self);

    /// Number of indexed keys
    fn len(&self) -> usize;

    /// True if nothing is indexed
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Structural statistics
    fn stats(&self) -> SpatialIndexStats;
}

//! Collision shapes, their identities and their pools
//!
//! A [`Shape`] couples an object-space [`ShapeGeometry`] with an
//! object-to-world transform, user flags and a debug color. World-space data
//! (bounding box, inverse transform, world polygon) is cached and refreshed
//! eagerly whenever the transform or geometry changes, so reads never see
//! stale bounds.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::collision::aabb::Aabb;
use crate::collision::ray::{Ray, RayHit};
use crate::collision::shapes::polygon::PolygonCache;
use crate::collision::shapes::{BoxShape, Capsule, Polygon, Sphere};
use crate::foundation::collections::{new_key_type, FreeList, Key};
use crate::foundation::math::{RigidTransform, Vec3};

new_key_type! {
    /// Generation-checked slot key backing a [`ShapeId`]
    pub struct ShapeKey;
}

/// Handle to a shape living in the collision world
///
/// The handle carries a slot index and a generation counter, so a handle to
/// a removed shape never resolves to whatever shape reuses the slot later.
/// [`ShapeId::none`] (also the `Default`) stands for "no shape".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ShapeId(ShapeKey);

impl ShapeId {
    /// The invalid handle
    pub fn none() -> Self {
        Self(ShapeKey::null())
    }

    pub(crate) fn from_key(key: ShapeKey) -> Self {
        Self(key)
    }

    pub(crate) fn key(self) -> ShapeKey {
        self.0
    }

    /// True for the invalid handle
    pub fn is_none(self) -> bool {
        self.0.is_null()
    }

    /// True for any handle other than [`ShapeId::none`]
    pub fn is_some(self) -> bool {
        !self.is_none()
    }

    /// Opaque integer form, zero for [`ShapeId::none`]
    pub fn to_raw(self) -> u64 {
        if self.is_none() {
            0
        } else {
            self.0.data().as_ffi()
        }
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "shape#none")
        } else {
            write!(f, "shape#{:x}", self.to_raw())
        }
    }
}

/// Concrete shape kinds
///
/// The declaration order is the canonical pair order used by the narrow
/// phase dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShapeType {
    /// See [`Sphere`]
    Sphere = 0,
    /// See [`BoxShape`]
    Box = 1,
    /// See [`Capsule`]
    Capsule = 2,
    /// See [`Polygon`]
    Polygon = 3,
}

impl ShapeType {
    /// Every shape type, in canonical order
    pub const ALL: [Self; 4] = [Self::Sphere, Self::Box, Self::Capsule, Self::Polygon];

    /// Dense index in `0..4`
    pub fn index(self) -> usize {
        self as usize
    }

    /// Human readable name
    pub fn name(self) -> &'static str {
        match self {
            Self::Sphere => "sphere",
            Self::Box => "box",
            Self::Capsule => "capsule",
            Self::Polygon => "polygon",
        }
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reasons a shape is rejected when added
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ShapeValidationError {
    /// Transform contains NaN or infinity
    #[error("object-to-world transform is not finite")]
    InvalidTransform,

    /// Geometry contains NaN or infinity
    #[error("geometry is not finite")]
    NonFiniteGeometry,

    /// Radius must be positive and finite
    #[error("radius must be positive and finite, got {0}")]
    InvalidRadius(f32),

    /// Box half sizes must be positive and finite
    #[error("box extents must be positive and finite, got {0:?}")]
    InvalidExtents(Vec3),

    /// Polygons need three or more vertices
    #[error("polygon needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),

    /// All polygon vertices are collinear or coincident
    #[error("polygon has zero area")]
    ZeroArea,

    /// Polygon vertices do not share one plane
    #[error("polygon is not planar")]
    NonPlanar,

    /// Polygon is concave or wound inconsistently
    #[error("polygon is not convex")]
    NonConvex,
}

/// Type-specific object-space geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeGeometry {
    /// Sphere
    Sphere(Sphere),
    /// Oriented box
    Box(BoxShape),
    /// Capsule
    Capsule(Capsule),
    /// Convex planar polygon
    Polygon(Polygon),
}

impl ShapeGeometry {
    /// The kind of geometry
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Self::Sphere(_) => ShapeType::Sphere,
            Self::Box(_) => ShapeType::Box,
            Self::Capsule(_) => ShapeType::Capsule,
            Self::Polygon(_) => ShapeType::Polygon,
        }
    }

    /// Default geometry for a type
    pub fn default_for(shape_type: ShapeType) -> Self {
        match shape_type {
            ShapeType::Sphere => Self::Sphere(Sphere::default()),
            ShapeType::Box => Self::Box(BoxShape::default()),
            ShapeType::Capsule => Self::Capsule(Capsule::default()),
            ShapeType::Polygon => Self::Polygon(Polygon::default()),
        }
    }

    fn validate(&self) -> Result<(), ShapeValidationError> {
        match self {
            Self::Sphere(sphere) => sphere.validate(),
            Self::Box(box_shape) => box_shape.validate(),
            Self::Capsule(capsule) => capsule.validate(),
            Self::Polygon(polygon) => polygon.validate(),
        }
    }
}

/// Default debug color for new shapes (red)
pub const DEFAULT_DEBUG_COLOR: Vec3 = Vec3::new(1.0, 0.0, 0.0);

#[derive(Debug, Clone, PartialEq)]
struct ShapeCache {
    world_to_object: RigidTransform,
    world_aabb: Aabb,
    polygon: PolygonCache,
}

impl Default for ShapeCache {
    fn default() -> Self {
        Self {
            world_to_object: RigidTransform::identity(),
            world_aabb: Aabb::new(Vec3::zeros(), Vec3::zeros()),
            polygon: PolygonCache::default(),
        }
    }
}

/// A collision shape
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    geometry: ShapeGeometry,
    object_to_world: RigidTransform,
    user_flags: u64,
    debug_color: Vec3,
    revision: u64,
    cache: ShapeCache,
}

impl Shape {
    /// Create a shape from geometry with an identity transform
    pub fn new(geometry: ShapeGeometry) -> Self {
        let mut shape = Self {
            geometry,
            object_to_world: RigidTransform::identity(),
            user_flags: 0,
            debug_color: DEFAULT_DEBUG_COLOR,
            revision: 0,
            cache: ShapeCache::default(),
        };
        shape.refresh_cache();
        shape
    }

    /// Sphere centered at its object-space origin
    pub fn sphere(radius: f32) -> Self {
        Self::new(ShapeGeometry::Sphere(Sphere::new(Vec3::zeros(), radius)))
    }

    /// Box with the given half sizes
    pub fn cuboid(extents: Vec3) -> Self {
        Self::new(ShapeGeometry::Box(BoxShape::new(extents)))
    }

    /// Capsule between two object-space points
    pub fn capsule(vertex_a: Vec3, vertex_b: Vec3, radius: f32) -> Self {
        Self::new(ShapeGeometry::Capsule(Capsule::new(vertex_a, vertex_b, radius)))
    }

    /// Convex polygon from object-space vertices
    pub fn polygon(vertices: Vec<Vec3>) -> Self {
        Self::new(ShapeGeometry::Polygon(Polygon::new(vertices)))
    }

    /// Builder: set the object-to-world transform
    #[must_use]
    pub fn with_transform(mut self, object_to_world: RigidTransform) -> Self {
        self.set_object_to_world(object_to_world);
        self
    }

    /// Builder: place the shape at a world position
    #[must_use]
    pub fn with_position(self, position: Vec3) -> Self {
        self.with_transform(RigidTransform::from_translation(position))
    }

    /// Builder: set user flags
    #[must_use]
    pub fn with_user_flags(mut self, user_flags: u64) -> Self {
        self.user_flags = user_flags;
        self
    }

    /// Builder: set the debug render color
    #[must_use]
    pub fn with_debug_color(mut self, color: Vec3) -> Self {
        self.debug_color = color;
        self
    }

    /// The kind of shape
    pub fn shape_type(&self) -> ShapeType {
        self.geometry.shape_type()
    }

    /// Object-space geometry
    pub fn geometry(&self) -> &ShapeGeometry {
        &self.geometry
    }

    /// Mutate the geometry; caches are refreshed afterwards
    pub fn edit_geometry<R>(&mut self, edit: impl FnOnce(&mut ShapeGeometry) -> R) -> R {
        let result = edit(&mut self.geometry);
        self.touch();
        result
    }

    /// Object-to-world transform
    pub fn object_to_world(&self) -> &RigidTransform {
        &self.object_to_world
    }

    /// Cached inverse of the object-to-world transform
    pub fn world_to_object(&self) -> &RigidTransform {
        &self.cache.world_to_object
    }

    /// Replace the transform and refresh cached world data
    pub fn set_object_to_world(&mut self, object_to_world: RigidTransform) {
        self.object_to_world = object_to_world;
        self.touch();
    }

    /// Cached world-space bounding box
    pub fn world_bounding_box(&self) -> &Aabb {
        &self.cache.world_aabb
    }

    /// World-space polygon data (empty unless this is a polygon)
    pub fn world_polygon(&self) -> &PolygonCache {
        &self.cache.polygon
    }

    /// Application-defined flag bits
    pub fn user_flags(&self) -> u64 {
        self.user_flags
    }

    /// Replace the user flags
    pub fn set_user_flags(&mut self, user_flags: u64) {
        self.user_flags = user_flags;
        self.revision += 1;
    }

    /// True if the shape passes a query flag mask (a zero mask matches everything)
    pub fn matches_mask(&self, mask: u64) -> bool {
        mask == 0 || self.user_flags & mask != 0
    }

    /// Color used when drawing this shape
    pub fn debug_color(&self) -> Vec3 {
        self.debug_color
    }

    /// Replace the debug render color
    pub fn set_debug_color(&mut self, color: Vec3) {
        self.debug_color = color;
    }

    /// Bumped on every change to geometry, transform or flags
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Check geometry and transform
    pub fn validate(&self) -> Result<(), ShapeValidationError> {
        if !self.object_to_world.is_valid() {
            return Err(ShapeValidationError::InvalidTransform);
        }
        self.geometry.validate()
    }

    /// First point where a world-space ray enters this shape
    pub fn ray_cast(&self, ray: &Ray) -> Option<RayHit> {
        match &self.geometry {
            ShapeGeometry::Sphere(sphere) => sphere.ray_cast(ray, &self.object_to_world),
            ShapeGeometry::Box(box_shape) => {
                box_shape.ray_cast(ray, &self.object_to_world, &self.cache.world_to_object)
            }
            ShapeGeometry::Capsule(capsule) => capsule.ray_cast(ray, &self.object_to_world),
            ShapeGeometry::Polygon(_) => self.cache.polygon.ray_cast(ray),
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.refresh_cache();
    }

    fn refresh_cache(&mut self) {
        let transform = &self.object_to_world;
        self.cache.world_to_object = transform.inverse();
        self.cache.world_aabb = match &self.geometry {
            ShapeGeometry::Sphere(sphere) => sphere.world_aabb(transform),
            ShapeGeometry::Box(box_shape) => box_shape.world_aabb(transform),
            ShapeGeometry::Capsule(capsule) => capsule.world_aabb(transform),
            ShapeGeometry::Polygon(polygon) => {
                self.cache.polygon.update(polygon, transform);
                self.cache
                    .polygon
                    .aabb()
                    .unwrap_or_else(|| Aabb::new(transform.translation, transform.translation))
            }
        };
        if !matches!(self.geometry, ShapeGeometry::Polygon(_)) {
            self.cache.polygon.vertices.clear();
            self.cache.polygon.plane = None;
        }
    }

    /// Return the shape to a freshly constructed state of the same type,
    /// keeping heap allocations
    fn reset(&mut self) {
        match &mut self.geometry {
            ShapeGeometry::Polygon(polygon) => polygon.clear(),
            other => *other = ShapeGeometry::default_for(other.shape_type()),
        }
        self.object_to_world = RigidTransform::identity();
        self.user_flags = 0;
        self.debug_color = DEFAULT_DEBUG_COLOR;
        self.revision = 0;
        self.refresh_cache();
    }
}

/// Per-type pool of retired shapes
///
/// Levels add and remove many shapes of the same kinds over and over; shapes
/// released here are reset and handed back out by [`ShapePool::acquire`].
#[derive(Debug)]
pub struct ShapePool {
    lists: [FreeList<Shape>; 4],
}

impl ShapePool {
    /// Pool keeping up to `capacity` shapes of each type
    pub fn new(capacity: usize) -> Self {
        Self {
            lists: std::array::from_fn(|_| FreeList::with_capacity(capacity)),
        }
    }

    /// A fresh shape of the given type, recycled when possible
    pub fn acquire(&mut self, shape_type: ShapeType) -> Shape {
        self.lists[shape_type.index()]
            .acquire(|| Shape::new(ShapeGeometry::default_for(shape_type)))
    }

    /// Give a shape back for reuse
    pub fn release(&mut self, mut shape: Shape) {
        shape.reset();
        self.lists[shape.shape_type().index()].release(shape);
    }

    /// Pooled shapes of one type
    pub fn pooled(&self, shape_type: ShapeType) -> usize {
        self.lists[shape_type.index()].len()
    }

    /// Acquisitions served from the pool across all types
    pub fn reused(&self) -> u64 {
        self.lists.iter().map(FreeList::reused).sum()
    }

    /// Drop every pooled shape
    pub fn clear(&mut self) {
        self.lists.iter_mut().for_each(FreeList::clear);
    }
}

impl Default for ShapePool {
    fn default() -> Self {
        Self::new(64)
    }
}

//! Query results
//!
//! Each query produces exactly one [`QueryResult`], held by the task table
//! until the submitter claims it. Claiming moves the result out; it can only
//! be claimed once.

use std::fmt;
use std::path::PathBuf;

use crate::collision::{ShapeId, ShapePairCollisionStatus, ShapeType};
use crate::foundation::math::{RigidTransform, Vec3};
use crate::spatial::SpatialIndexStats;
use crate::system::debug_render::RenderLine;
use crate::system::profile::ProfileData;

/// Discriminant of [`QueryResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultKind {
    /// [`RayCastResult`]
    RayCast,
    /// [`CollisionQueryResult`]
    Collision,
    /// [`BoolResult`]
    Bool,
    /// [`TransformResult`]
    Transform,
    /// [`StatsResult`]
    Stats,
    /// [`ProfileStatsResult`]
    ProfileStats,
    /// [`DebugRenderResult`]
    DebugRender,
    /// [`FileResult`]
    File,
    /// [`NearestGroundResult`]
    NearestGround,
}

/// Answer to one query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// Answer to `Query::RayCast`
    RayCast(RayCastResult),
    /// Answer to `Query::Collision`
    Collision(CollisionQueryResult),
    /// Answer to `Query::ShapeInBounds`
    Bool(BoolResult),
    /// Answer to `Query::ObjectToWorld`
    Transform(TransformResult),
    /// Answer to `Query::Stats`
    Stats(StatsResult),
    /// Answer to `Query::ProfileStats`
    ProfileStats(ProfileStatsResult),
    /// Answer to `Query::DebugRender`
    DebugRender(DebugRenderResult),
    /// Answer to `Query::File`
    File(FileResult),
    /// Answer to `Query::NearestGround`
    NearestGround(NearestGroundResult),
}

impl QueryResult {
    /// Which variant this is
    pub fn kind(&self) -> ResultKind {
        match self {
            Self::RayCast(_) => ResultKind::RayCast,
            Self::Collision(_) => ResultKind::Collision,
            Self::Bool(_) => ResultKind::Bool,
            Self::Transform(_) => ResultKind::Transform,
            Self::Stats(_) => ResultKind::Stats,
            Self::ProfileStats(_) => ResultKind::ProfileStats,
            Self::DebugRender(_) => ResultKind::DebugRender,
            Self::File(_) => ResultKind::File,
            Self::NearestGround(_) => ResultKind::NearestGround,
        }
    }
}

/// A concrete result type that can be claimed directly
pub trait TypedResult: Sized {
    /// The variant carrying this type
    const KIND: ResultKind;

    /// Unwrap the variant, `None` if it is a different one
    fn from_result(result: QueryResult) -> Option<Self>;
}

macro_rules! typed_result {
    ($ty:ty, $variant:ident) => {
        impl TypedResult for $ty {
            const KIND: ResultKind = ResultKind::$variant;

            fn from_result(result: QueryResult) -> Option<Self> {
                match result {
                    QueryResult::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

typed_result!(RayCastResult, RayCast);
typed_result!(CollisionQueryResult, Collision);
typed_result!(BoolResult, Bool);
typed_result!(TransformResult, Transform);
typed_result!(StatsResult, Stats);
typed_result!(ProfileStatsResult, ProfileStats);
typed_result!(DebugRenderResult, DebugRender);
typed_result!(FileResult, File);
typed_result!(NearestGroundResult, NearestGround);

/// Nearest ray hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCastResult {
    /// Shape hit, or none on a miss
    pub shape_id: ShapeId,
    /// World-space hit point
    pub point: Vec3,
    /// Surface normal at the hit point
    pub normal: Vec3,
    /// Distance along the ray
    pub alpha: f32,
}

impl RayCastResult {
    /// Result for a ray that hit nothing
    pub fn miss() -> Self {
        Self {
            shape_id: ShapeId::none(),
            point: Vec3::zeros(),
            normal: Vec3::zeros(),
            alpha: f32::INFINITY,
        }
    }

    /// True if something was hit
    pub fn hit(&self) -> bool {
        self.shape_id.is_some()
    }
}

/// Everything overlapping one shape
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionQueryResult {
    /// The queried shape
    pub shape_id: ShapeId,
    /// Its transform when the query ran; `None` if the shape does not exist
    pub object_to_world: Option<RigidTransform>,
    /// One entry per colliding shape, each with `shape_a == shape_id`
    pub collisions: Vec<ShapePairCollisionStatus>,
}

impl CollisionQueryResult {
    /// True if anything overlaps the shape
    pub fn is_colliding(&self) -> bool {
        !self.collisions.is_empty()
    }

    /// The deepest collision
    pub fn most_egregious_collision(&self) -> Option<&ShapePairCollisionStatus> {
        self.collisions
            .iter()
            .max_by(|a, b| a.separation_delta_length().total_cmp(&b.separation_delta_length()))
    }

    /// Mean of the separation deltas, zero when nothing collides
    pub fn average_separation_delta(&self) -> Vec3 {
        if self.collisions.is_empty() {
            return Vec3::zeros();
        }
        let sum: Vec3 = self.collisions.iter().map(|status| status.separation_delta).sum();
        sum / self.collisions.len() as f32
    }
}

/// Yes/no answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoolResult {
    /// The answer
    pub value: bool,
}

/// A shape's transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformResult {
    /// Shape asked about
    pub shape_id: ShapeId,
    /// Its transform; `None` if the shape does not exist
    pub object_to_world: Option<RigidTransform>,
}

/// World and tree statistics
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatsResult {
    /// Live shapes per type, indexed by [`ShapeType::index`]
    pub shapes_by_type: [usize; 4],
    /// Shapes inside the world bounds
    pub shapes_in_bounds: usize,
    /// Bounding volume tree layout
    pub tree: SpatialIndexStats,
    /// Entries in the narrow phase pair cache
    pub cached_pairs: usize,
    /// Cached pairs currently overlapping
    pub colliding_pairs: usize,
    /// Retired shapes waiting for reuse
    pub pooled_shapes: usize,
    /// Worker ticks since start-up
    pub tick: u64,
}

impl StatsResult {
    /// All live shapes
    pub fn shape_count(&self) -> usize {
        self.shapes_by_type.iter().sum()
    }

    /// Live shapes of one type
    pub fn count_of(&self, shape_type: ShapeType) -> usize {
        self.shapes_by_type[shape_type.index()]
    }
}

impl fmt::Display for StatsResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Collision world at tick {}", self.tick)?;
        write!(f, "  shapes: {} (", self.shape_count())?;
        for (i, shape_type) in ShapeType::ALL.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", self.count_of(*shape_type), shape_type)?;
        }
        writeln!(f, "), {} in bounds", self.shapes_in_bounds)?;
        writeln!(
            f,
            "  tree: {} leaves, {} nodes, height {}, internal area {:.1}",
            self.tree.leaf_count, self.tree.node_count, self.tree.height, self.tree.internal_surface_area
        )?;
        writeln!(f, "  pairs: {} cached, {} colliding", self.cached_pairs, self.colliding_pairs)?;
        write!(f, "  pooled shapes: {}", self.pooled_shapes)
    }
}

/// Worker profile snapshot
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProfileStatsResult {
    /// Timings and counters since the last reset
    pub profile: ProfileData,
}

impl fmt::Display for ProfileStatsResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.profile, f)
    }
}

/// Lines to draw
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DebugRenderResult {
    /// World-space colored segments
    pub lines: Vec<RenderLine>,
}

/// Which file operation a [`FileResult`] reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileAction {
    /// Every shape written to a new file
    Dump,
    /// World replaced with the shapes in a file
    Restore,
}

/// Outcome of a dump or restore
#[derive(Debug, Clone, PartialEq)]
pub struct FileResult {
    /// Dump or restore
    pub action: FileAction,
    /// File written or read
    pub path: PathBuf,
    /// True if the operation finished
    pub success: bool,
    /// Shapes written or restored
    pub shape_count: usize,
    /// IDs given to restored shapes, in file order
    pub shape_ids: Vec<ShapeId>,
    /// Why the operation failed
    pub error: Option<String>,
}

/// First shape below a point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestGroundResult {
    /// Shape found, or none
    pub shape_id: ShapeId,
    /// Ground point
    pub point: Vec3,
    /// Ground normal
    pub normal: Vec3,
    /// Drop from the query point to the ground
    pub distance: f32,
}

impl NearestGroundResult {
    /// True if ground was found
    pub fn found(&self) -> bool {
        self.shape_id.is_some()
    }
}

impl From<RayCastResult> for NearestGroundResult {
    fn from(hit: RayCastResult) -> Self {
        Self {
            shape_id: hit.shape_id,
            point: hit.point,
            normal: hit.normal,
            distance: hit.alpha,
        }
    }
}

//! Queries: read-only questions answered by the worker thread

use std::path::PathBuf;

use bitflags::bitflags;

use crate::collision::{Ray, ShapeId};
use crate::foundation::math::Vec3;
use crate::system::result::ResultKind;

bitflags! {
    /// What a debug render query should draw
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DrawFlags: u32 {
        /// Shape wireframes in each shape's debug color
        const SHAPES      = 1 << 0;
        /// World bounding boxes of shapes, in the inverse of the debug color
        const SHAPE_BOXES = 1 << 1;
        /// Every node of the bounding volume tree
        const AABB_TREE   = 1 << 2;
    }
}

/// A question about the collision world
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Nearest shape hit by a ray
    RayCast {
        /// World-space ray
        ray: Ray,
        /// Farthest accepted hit; `None` uses the configured default
        max_distance: Option<f32>,
        /// Only shapes sharing a bit with this mask are hit (0 matches all)
        user_flags_mask: u64,
    },
    /// Every shape overlapping the given one
    Collision {
        /// Shape being tested
        shape_id: ShapeId,
        /// Only shapes sharing a bit with this mask are reported (0 matches all)
        user_flags_mask: u64,
    },
    /// Whether a shape lies inside the world bounds
    ShapeInBounds {
        /// Shape to check
        shape_id: ShapeId,
    },
    /// A shape's current transform
    ObjectToWorld {
        /// Shape to look up
        shape_id: ShapeId,
    },
    /// Shape and tree statistics
    Stats,
    /// Worker timings and counters
    ProfileStats,
    /// Line list for debug drawing
    DebugRender {
        /// What to draw
        draw_flags: DrawFlags,
    },
    /// Write every shape to a new file, as seen after this tick's commands
    File {
        /// Destination; must not exist
        path: PathBuf,
    },
    /// First shape straight below a point
    NearestGround {
        /// Where to look down from
        point: Vec3,
        /// How far down to look
        max_distance: f32,
        /// Only shapes sharing a bit with this mask count as ground (0 matches all)
        user_flags_mask: u64,
    },
}

impl Query {
    /// Ray cast against every shape, up to the configured distance
    pub fn ray_cast(ray: Ray) -> Self {
        Self::RayCast {
            ray,
            max_distance: None,
            user_flags_mask: 0,
        }
    }

    /// Collision query against every shape
    pub fn collision(shape_id: ShapeId) -> Self {
        Self::Collision {
            shape_id,
            user_flags_mask: 0,
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::RayCast { .. } => "RayCast",
            Self::Collision { .. } => "Collision",
            Self::ShapeInBounds { .. } => "ShapeInBounds",
            Self::ObjectToWorld { .. } => "ObjectToWorld",
            Self::Stats => "Stats",
            Self::ProfileStats => "ProfileStats",
            Self::DebugRender { .. } => "DebugRender",
            Self::File { .. } => "File",
            Self::NearestGround { .. } => "NearestGround",
        }
    }

    /// Kind of result this query produces
    pub fn result_kind(&self) -> ResultKind {
        match self {
            Self::RayCast { .. } => ResultKind::RayCast,
            Self::Collision { .. } => ResultKind::Collision,
            Self::ShapeInBounds { .. } => ResultKind::Bool,
            Self::ObjectToWorld { .. } => ResultKind::Transform,
            Self::Stats => ResultKind::Stats,
            Self::ProfileStats => ResultKind::ProfileStats,
            Self::DebugRender { .. } => ResultKind::DebugRender,
            Self::File { .. } => ResultKind::File,
            Self::NearestGround { .. } => ResultKind::NearestGround,
        }
    }
}

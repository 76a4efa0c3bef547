//! The asynchronous collision system
//!
//! Callers submit [`Command`]s and [`Query`]s through a [`CollisionSystem`];
//! a worker thread applies them against the collision world tick by tick,
//! and results are claimed later by [`TaskId`].

pub mod collision_system;
pub mod command;
pub mod debug_render;
pub mod dump;
pub mod profile;
pub mod query;
pub mod result;
pub mod task;

mod registry;
mod worker;
mod world;

pub use collision_system::CollisionSystem;
pub use command::{AddFlags, Command};
pub use debug_render::{DebugLineBuilder, RenderLine, TreeColors};
pub use dump::{DumpError, DUMP_MAGIC, DUMP_VERSION};
pub use profile::ProfileData;
pub use query::{DrawFlags, Query};
pub use result::{
    BoolResult, CollisionQueryResult, DebugRenderResult, FileAction, FileResult, NearestGroundResult,
    ProfileStatsResult, QueryResult, RayCastResult, ResultKind, StatsResult, TransformResult,
    TypedResult,
};
pub use task::{TaskId, TaskState};

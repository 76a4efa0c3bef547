//! The collision world owned by the worker thread
//!
//! Holds every shape, the broad-phase index and the narrow-phase pair cache.
//! Nothing here is shared with the caller's thread except the handle
//! registry, the shape pool and the error log.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::collision::narrow_phase::{collide, NarrowPhaseError};
use crate::collision::shape::ShapeKey;
use crate::collision::{Aabb, Ray, Shape, ShapeId, ShapePairCollisionStatus, ShapePool, ShapeType};
use crate::config::CollisionConfig;
use crate::error::ErrorLog;
use crate::foundation::collections::SecondaryMap;
use crate::foundation::math::{RigidTransform, Vec3};
use crate::foundation::time::Stopwatch;
use crate::spatial::{DynamicBvh, SpatialIndex};
use crate::system::command::{AddFlags, Command, QueuedCommand};
use crate::system::debug_render::{DebugLineBuilder, TreeColors};
use crate::system::dump;
use crate::system::profile::ProfileData;
use crate::system::query::{DrawFlags, Query};
use crate::system::registry::ShapeRegistry;
use crate::system::result::{
    BoolResult, CollisionQueryResult, DebugRenderResult, FileAction, FileResult, ProfileStatsResult, QueryResult,
    RayCastResult, StatsResult, TransformResult,
};
use crate::system::task::TaskId;

/// Unordered shape pair, smaller id first
type PairKey = (ShapeId, ShapeId);

fn pair_key(a: ShapeId, b: ShapeId) -> PairKey {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Narrow phase outcome, valid while both shapes keep these revisions
#[derive(Debug, Clone, Copy)]
struct CachedPair {
    revisions: (u64, u64),
    outcome: Result<ShapePairCollisionStatus, NarrowPhaseError>,
}

/// What one tick produced
#[derive(Debug, Default)]
pub(crate) struct TickOutcome {
    /// Every processed task, commands with no result
    pub(crate) completed: Vec<(TaskId, Option<QueryResult>)>,
    /// An exit command was applied
    pub(crate) exit: bool,
}

pub(crate) struct CollisionWorld {
    config: CollisionConfig,
    world_bounds: Aabb,
    shapes: SecondaryMap<ShapeKey, Shape>,
    index: Box<dyn SpatialIndex<ShapeId>>,
    /// Shapes added or moved since the last collision pass
    dirty: Vec<ShapeId>,
    pair_cache: HashMap<PairKey, CachedPair>,
    registry: ShapeRegistry,
    pool: Arc<Mutex<ShapePool>>,
    errors: ErrorLog,
    profile: ProfileData,
    tick: u64,
}

impl CollisionWorld {
    pub(crate) fn new(
        config: CollisionConfig,
        world_bounds: Aabb,
        registry: ShapeRegistry,
        pool: Arc<Mutex<ShapePool>>,
        errors: ErrorLog,
    ) -> Self {
        let index: Box<dyn SpatialIndex<ShapeId>> = Box::new(DynamicBvh::new(config.fat_margin));
        Self {
            config,
            world_bounds,
            shapes: SecondaryMap::new(),
            index,
            dirty: Vec::new(),
            pair_cache: HashMap::new(),
            registry,
            pool,
            errors,
            profile: ProfileData::default(),
            tick: 0,
        }
    }

    pub(crate) fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub(crate) fn note_reclaimed(&mut self, count: usize) {
        self.profile.results_reclaimed += count as u64;
    }

    /// Apply commands in order, run the collision pass, then answer queries
    pub(crate) fn run_tick(
        &mut self,
        commands: Vec<(TaskId, QueuedCommand)>,
        queries: Vec<(TaskId, Query)>,
    ) -> TickOutcome {
        self.tick += 1;
        let tick_timer = Stopwatch::start_new();
        let mut outcome = TickOutcome {
            completed: Vec::with_capacity(commands.len() + queries.len()),
            exit: false,
        };

        let timer = Stopwatch::start_new();
        for (task_id, command) in commands {
            log::trace!("Tick {}: applying {} ({task_id})", self.tick, command.name());
            let result = match command {
                QueuedCommand::Exit => {
                    outcome.exit = true;
                    None
                }
                QueuedCommand::AddShape { shape_id, shape, flags } => {
                    self.add_shape(shape_id, *shape, flags);
                    None
                }
                QueuedCommand::Apply(command) => self.apply(command),
            };
            self.profile.commands_applied += 1;
            outcome.completed.push((task_id, result));
        }
        self.profile.commands.record(timer.elapsed());

        let timer = Stopwatch::start_new();
        self.collision_pass();
        self.profile.collision_pass.record(timer.elapsed());

        let timer = Stopwatch::start_new();
        for (task_id, query) in queries {
            log::trace!("Tick {}: answering {} ({task_id})", self.tick, query.name());
            let result = self.answer(query);
            self.profile.queries_answered += 1;
            outcome.completed.push((task_id, Some(result)));
        }
        self.profile.queries.record(timer.elapsed());

        self.profile.ticks.record(tick_timer.elapsed());
        outcome
    }

    /// Remove every shape and return them to the pool
    pub(crate) fn release_all(&mut self) {
        let count = self.shapes.len();
        self.remove_all_shapes();
        log::debug!("Released {count} shapes");
    }

    // =========== Commands ===========

    /// Only file commands produce a result
    fn apply(&mut self, command: Command) -> Option<QueryResult> {
        match command {
            Command::RemoveShape { shape_id } => self.remove_shape(shape_id),
            Command::RemoveAllShapes => self.remove_all_shapes(),
            Command::SetObjectToWorld { shape_id, object_to_world } => {
                self.set_object_to_world(shape_id, object_to_world);
            }
            Command::SetDebugRenderColor { shape_id, color } => {
                if let Some(shape) = self.shape_mut(shape_id, "SetDebugRenderColor") {
                    shape.set_debug_color(color);
                }
            }
            Command::SetUserFlags { shape_id, user_flags } => {
                if let Some(shape) = self.shape_mut(shape_id, "SetUserFlags") {
                    shape.set_user_flags(user_flags);
                }
            }
            Command::ResetProfileData => self.profile.reset(),
            Command::Dump { path } => return Some(QueryResult::File(self.dump(&path))),
            Command::Restore { path } => return Some(QueryResult::File(self.restore(&path))),
        }
        None
    }

    fn add_shape(&mut self, shape_id: ShapeId, shape: Shape, flags: AddFlags) {
        if flags.contains(AddFlags::ALLOW_SPLIT) {
            log::debug!("{shape_id} requested splitting; shapes are indexed whole");
        }
        if self.shapes.contains_key(shape_id.key()) {
            self.errors.add_error_message(format!("AddShape: {shape_id} already exists"));
            return;
        }
        self.shapes.insert(shape_id.key(), shape);
        self.refresh_index(shape_id);
        self.dirty.push(shape_id);
    }

    fn remove_shape(&mut self, shape_id: ShapeId) {
        let Some(shape) = self.shapes.remove(shape_id.key()) else {
            self.errors.add_error_message(format!("RemoveShape: unknown shape {shape_id}"));
            return;
        };
        if self.index.contains(shape_id) {
            if let Err(e) = self.index.remove(shape_id) {
                self.errors.add_error_message(format!("RemoveShape: {shape_id}: {e}"));
            }
        }
        self.pair_cache.retain(|&(a, b), _| a != shape_id && b != shape_id);
        self.registry.retire(shape_id);
        lock_pool(&self.pool).release(shape);
    }

    fn remove_all_shapes(&mut self) {
        let mut pool = lock_pool(&self.pool);
        for (key, shape) in self.shapes.drain() {
            self.registry.retire(ShapeId::from_key(key));
            pool.release(shape);
        }
        self.index.clear();
        self.pair_cache.clear();
        self.dirty.clear();
    }

    fn set_object_to_world(&mut self, shape_id: ShapeId, object_to_world: RigidTransform) {
        if !object_to_world.is_valid() {
            self.errors
                .add_error_message(format!("SetObjectToWorld: non-finite transform for {shape_id}"));
            return;
        }
        if let Some(shape) = self.shape_mut(shape_id, "SetObjectToWorld") {
            shape.set_object_to_world(object_to_world);
            self.refresh_index(shape_id);
            self.dirty.push(shape_id);
        }
    }

    /// Bring the index in line with the shape's current bounds.
    /// Shapes outside the world bounds are kept but not indexed.
    fn refresh_index(&mut self, shape_id: ShapeId) {
        let Some(shape) = self.shapes.get(shape_id.key()) else {
            return;
        };
        let aabb = *shape.world_bounding_box();
        let inside = self.world_bounds.contains(&aabb);

        let result = match (inside, self.index.contains(shape_id)) {
            (true, true) => self.index.update(shape_id, &aabb).map(|reinserted| {
                if reinserted {
                    self.profile.bvh_reinserts += 1;
                }
            }),
            (true, false) => self.index.insert(shape_id, &aabb),
            (false, true) => {
                log::debug!("{shape_id} left the world bounds");
                self.index.remove(shape_id)
            }
            (false, false) => {
                log::debug!("{shape_id} is outside the world bounds and will not be indexed");
                Ok(())
            }
        };
        if let Err(e) = result {
            self.errors
                .add_error_message(format!("Spatial index update for {shape_id} failed: {e}"));
        }
    }

    // =========== Collision pass ===========

    /// Broad and narrow phase for every shape that moved or appeared
    fn collision_pass(&mut self) {
        if self.dirty.is_empty() {
            return;
        }
        let mut dirty = std::mem::take(&mut self.dirty);
        dirty.sort_unstable();
        dirty.dedup();

        let mut candidates = Vec::new();
        for &shape_id in &dirty {
            if !self.index.contains(shape_id) {
                continue;
            }
            let Some(shape) = self.shapes.get(shape_id.key()) else {
                continue;
            };
            let aabb = *shape.world_bounding_box();
            self.index.query_aabb(&aabb, &mut |other| {
                if other != shape_id {
                    candidates.push(pair_key(shape_id, other));
                }
                ControlFlow::Continue(())
            });
        }
        candidates.sort_unstable();
        candidates.dedup();

        for (a, b) in candidates {
            self.test_pair(a, b);
        }

        let shapes = &self.shapes;
        self.pair_cache
            .retain(|&(a, b), cached| current_revisions(shapes, a, b) == Some(cached.revisions));

        dirty.clear();
        self.dirty = dirty;
    }

    /// Narrow phase for a canonical pair, served from the cache when fresh
    fn test_pair(&mut self, a: ShapeId, b: ShapeId) -> Option<ShapePairCollisionStatus> {
        let (Some(shape_a), Some(shape_b)) = (self.shapes.get(a.key()), self.shapes.get(b.key())) else {
            return None;
        };
        let revisions = (shape_a.revision(), shape_b.revision());
        if let Some(cached) = self.pair_cache.get(&(a, b)) {
            if cached.revisions == revisions {
                self.profile.pair_cache_hits += 1;
                return cached.outcome.ok();
            }
        }

        let outcome = collide(a, shape_a, b, shape_b);
        self.profile.pairs_tested += 1;
        if let Err(e) = &outcome {
            self.errors.add_error_message(format!("Narrow phase for {a} and {b}: {e}"));
        }
        self.pair_cache.insert((a, b), CachedPair { revisions, outcome });
        outcome.ok()
    }

    // =========== Queries ===========

    fn answer(&mut self, query: Query) -> QueryResult {
        match query {
            Query::RayCast { ray, max_distance, user_flags_mask } => {
                let max_distance = max_distance.unwrap_or(self.config.ray_cast_max_distance);
                QueryResult::RayCast(self.ray_cast(&ray, max_distance, user_flags_mask))
            }
            Query::Collision { shape_id, user_flags_mask } => {
                QueryResult::Collision(self.collision_query(shape_id, user_flags_mask))
            }
            Query::ShapeInBounds { shape_id } => QueryResult::Bool(BoolResult {
                value: self.shape_ref(shape_id, "ShapeInBounds").is_some() && self.index.contains(shape_id),
            }),
            Query::ObjectToWorld { shape_id } => QueryResult::Transform(TransformResult {
                shape_id,
                object_to_world: self
                    .shape_ref(shape_id, "ObjectToWorld")
                    .map(|shape| *shape.object_to_world()),
            }),
            Query::Stats => QueryResult::Stats(self.stats()),
            Query::ProfileStats => QueryResult::ProfileStats(ProfileStatsResult { profile: self.profile }),
            Query::DebugRender { draw_flags } => QueryResult::DebugRender(self.debug_render(draw_flags)),
            Query::File { path } => QueryResult::File(self.dump(&path)),
            Query::NearestGround { point, max_distance, user_flags_mask } => {
                let down = Ray::new(point, -Vec3::y());
                QueryResult::NearestGround(self.ray_cast(&down, max_distance, user_flags_mask).into())
            }
        }
    }

    fn ray_cast(&self, ray: &Ray, max_distance: f32, user_flags_mask: u64) -> RayCastResult {
        if !ray.is_valid() {
            self.errors.add_error_message("RayCast: ray has no direction or is not finite");
            return RayCastResult::miss();
        }

        let mut best = RayCastResult::miss();
        let mut best_alpha = max_distance;
        let shapes = &self.shapes;
        self.index.query_ray(ray, max_distance, &mut |shape_id, _entry_alpha| {
            let hit = shapes
                .get(shape_id.key())
                .filter(|shape| shape.matches_mask(user_flags_mask))
                .and_then(|shape| shape.ray_cast(ray));
            if let Some(hit) = hit {
                if hit.alpha < best_alpha || (!best.hit() && hit.alpha <= best_alpha) {
                    best_alpha = hit.alpha;
                    best = RayCastResult {
                        shape_id,
                        point: hit.point,
                        normal: hit.normal,
                        alpha: hit.alpha,
                    };
                }
            }
            best_alpha
        });
        best
    }

    fn collision_query(&mut self, shape_id: ShapeId, user_flags_mask: u64) -> CollisionQueryResult {
        let Some((object_to_world, aabb)) = self
            .shape_ref(shape_id, "Collision")
            .map(|shape| (*shape.object_to_world(), *shape.world_bounding_box()))
        else {
            return CollisionQueryResult {
                shape_id,
                object_to_world: None,
                collisions: Vec::new(),
            };
        };

        let mut others = Vec::new();
        if self.index.contains(shape_id) {
            let shapes = &self.shapes;
            self.index.query_aabb(&aabb, &mut |other| {
                let matches = shapes
                    .get(other.key())
                    .is_some_and(|shape| shape.matches_mask(user_flags_mask));
                if other != shape_id && matches {
                    others.push(other);
                }
                ControlFlow::Continue(())
            });
        }

        let collisions = others
            .into_iter()
            .filter_map(|other| {
                let (a, b) = pair_key(shape_id, other);
                self.test_pair(a, b)
            })
            .filter(|status| status.in_collision)
            .map(|status| status.oriented_for(shape_id))
            .collect();

        CollisionQueryResult {
            shape_id,
            object_to_world: Some(object_to_world),
            collisions,
        }
    }

    fn stats(&self) -> StatsResult {
        let mut shapes_by_type = [0; 4];
        for shape in self.shapes.values() {
            shapes_by_type[shape.shape_type().index()] += 1;
        }
        let pool = lock_pool(&self.pool);
        StatsResult {
            shapes_by_type,
            shapes_in_bounds: self.index.len(),
            tree: self.index.stats(),
            cached_pairs: self.pair_cache.len(),
            colliding_pairs: self
                .pair_cache
                .values()
                .filter(|cached| cached.outcome.is_ok_and(|status| status.in_collision))
                .count(),
            pooled_shapes: ShapeType::ALL.iter().map(|&shape_type| pool.pooled(shape_type)).sum(),
            tick: self.tick,
        }
    }

    fn debug_render(&self, draw_flags: DrawFlags) -> DebugRenderResult {
        let mut builder = DebugLineBuilder::new(self.config.debug_sphere_segments);
        if draw_flags.contains(DrawFlags::SHAPES) {
            for shape in self.shapes.values() {
                builder.shape(shape);
            }
        }
        if draw_flags.contains(DrawFlags::SHAPE_BOXES) {
            for shape in self.shapes.values() {
                builder.shape_bounds(shape);
            }
        }
        if draw_flags.contains(DrawFlags::AABB_TREE) {
            let colors = TreeColors::default();
            self.index.for_each_bound(&mut |aabb, _depth, is_leaf| {
                builder.aabb(aabb, if is_leaf { colors.leaf } else { colors.internal });
            });
        }
        DebugRenderResult { lines: builder.finish() }
    }

    fn dump(&self, path: &Path) -> FileResult {
        let (shape_ids, shapes): (Vec<ShapeId>, Vec<&Shape>) = self
            .shapes
            .iter()
            .map(|(key, shape)| (ShapeId::from_key(key), shape))
            .unzip();

        match dump::dump_to_path(path, shapes) {
            Ok(shape_count) => {
                log::info!("Dumped {shape_count} shapes to {}", path.display());
                FileResult {
                    action: FileAction::Dump,
                    path: path.to_path_buf(),
                    success: true,
                    shape_count,
                    shape_ids,
                    error: None,
                }
            }
            Err(e) => self.file_failure(FileAction::Dump, path, &e),
        }
    }

    /// Replace every shape with the file's contents; a bad file leaves the
    /// world untouched
    fn restore(&mut self, path: &Path) -> FileResult {
        let shapes = match dump::restore_from_path(path) {
            Ok(shapes) => shapes,
            Err(e) => return self.file_failure(FileAction::Restore, path, &e),
        };

        self.remove_all_shapes();
        let shape_ids: Vec<ShapeId> = shapes
            .into_iter()
            .map(|shape| {
                let shape_id = self.registry.mint(shape.shape_type());
                self.add_shape(shape_id, shape, AddFlags::empty());
                shape_id
            })
            .collect();

        log::info!("Restored {} shapes from {}", shape_ids.len(), path.display());
        FileResult {
            action: FileAction::Restore,
            path: path.to_path_buf(),
            success: true,
            shape_count: shape_ids.len(),
            shape_ids,
            error: None,
        }
    }

    fn file_failure(&self, action: FileAction, path: &Path, error: &dump::DumpError) -> FileResult {
        self.errors
            .add_error_message(format!("{action:?} of {} failed: {error}", path.display()));
        FileResult {
            action,
            path: path.to_path_buf(),
            success: false,
            shape_count: 0,
            shape_ids: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    // =========== Lookup helpers ===========

    fn shape_ref(&self, shape_id: ShapeId, operation: &str) -> Option<&Shape> {
        let shape = self.shapes.get(shape_id.key());
        if shape.is_none() {
            self.errors.add_error_message(format!("{operation}: unknown shape {shape_id}"));
        }
        shape
    }

    fn shape_mut(&mut self, shape_id: ShapeId, operation: &str) -> Option<&mut Shape> {
        if !self.shapes.contains_key(shape_id.key()) {
            self.errors.add_error_message(format!("{operation}: unknown shape {shape_id}"));
            return None;
        }
        self.shapes.get_mut(shape_id.key())
    }
}

fn current_revisions(shapes: &SecondaryMap<ShapeKey, Shape>, a: ShapeId, b: ShapeId) -> Option<(u64, u64)> {
    Some((shapes.get(a.key())?.revision(), shapes.get(b.key())?.revision()))
}

fn lock_pool(pool: &Mutex<ShapePool>) -> MutexGuard<'_, ShapePool> {
    pool.lock().unwrap_or_else(PoisonError::into_inner)
}

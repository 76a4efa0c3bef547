//! Public handle to the asynchronous collision system
//!
//! The caller's thread submits commands and queries and later claims the
//! results; a single worker thread owns the world and does all the work.
//!
//! ```rust,no_run
//! use collision_engine::prelude::*;
//!
//! let mut system = CollisionSystem::new(CollisionConfig::default(), ErrorLog::new());
//! system.initialize(Aabb::from_center_extents(Vec3::zeros(), Vec3::repeat(500.0)))?;
//!
//! let crate_id = system.add_shape(Shape::cuboid(Vec3::repeat(1.0)), AddFlags::empty());
//! let ray = system.make_query(Query::ray_cast(Ray::new(Vec3::new(0.0, 0.0, 10.0), -Vec3::z())));
//!
//! system.flush_all_tasks();
//! if let Some(hit) = system.obtain_result::<RayCastResult>(ray) {
//!     assert_eq!(hit.shape_id, crate_id);
//! }
//! system.shutdown();
//! # Ok::<(), CollisionError>(())
//! ```

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crate::collision::{Aabb, Shape, ShapeId, ShapePool, ShapeType};
use crate::config::CollisionConfig;
use crate::error::{CollisionError, ErrorLog};
use crate::foundation::math::RigidTransform;
use crate::system::command::{AddFlags, Command, QueuedCommand};
use crate::system::query::Query;
use crate::system::registry::ShapeRegistry;
use crate::system::result::{QueryResult, TypedResult};
use crate::system::task::{TaskId, TaskState};
use crate::system::worker::{run_worker, Shared};
use crate::system::world::CollisionWorld;

/// Asynchronous collision system
///
/// Submissions return immediately with a [`TaskId`]. Results are claimed
/// with [`obtain_query_result`](Self::obtain_query_result), which never
/// blocks, or after a [`flush_all_tasks`](Self::flush_all_tasks) barrier.
/// Failures that happen on the worker are recorded in the [`ErrorLog`]
/// passed to [`new`](Self::new).
pub struct CollisionSystem {
    config: CollisionConfig,
    errors: ErrorLog,
    shared: Arc<Shared>,
    registry: ShapeRegistry,
    pool: Arc<Mutex<ShapePool>>,
    worker: Option<JoinHandle<()>>,
}

impl CollisionSystem {
    /// Create a stopped system; call [`initialize`](Self::initialize) to start it
    pub fn new(config: CollisionConfig, errors: ErrorLog) -> Self {
        let pool = ShapePool::new(config.shape_pool_capacity);
        Self {
            config,
            errors,
            shared: Arc::new(Shared::new()),
            registry: ShapeRegistry::default(),
            pool: Arc::new(Mutex::new(pool)),
            worker: None,
        }
    }

    /// Set the world bounds and start the worker thread
    ///
    /// Shapes whose bounding box leaves `world_bounds` are kept but not
    /// indexed, so queries stop seeing them.
    pub fn initialize(&mut self, world_bounds: Aabb) -> Result<(), CollisionError> {
        if self.worker.is_some() {
            return Err(CollisionError::AlreadyInitialized);
        }
        if !world_bounds.is_valid() {
            return Err(CollisionError::InvalidWorldBounds);
        }
        self.config.validate()?;

        let world = CollisionWorld::new(
            self.config.clone(),
            world_bounds,
            self.registry.clone(),
            Arc::clone(&self.pool),
            self.errors.clone(),
        );
        let shared = Arc::clone(&self.shared);
        let config = self.config.clone();
        let handle = thread::Builder::new()
            .name(self.config.worker_thread_name.clone())
            .spawn(move || run_worker(shared, world, config))
            .map_err(CollisionError::WorkerSpawn)?;
        self.worker = Some(handle);

        log::info!(
            "Collision system initialized with world bounds {:?} to {:?}",
            world_bounds.min,
            world_bounds.max
        );
        Ok(())
    }

    /// Stop the worker and release every shape and task
    ///
    /// Results not yet claimed are dropped. Does nothing when not running.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };
        self.shared.submit_command(QueuedCommand::Exit);
        if handle.join().is_err() {
            self.errors.add_error_message("Collision worker panicked");
        }
        self.shared.clear();
        self.registry.clear();
        log::info!("Collision system shut down");
    }

    /// True between `initialize` and `shutdown`
    pub fn is_initialized(&self) -> bool {
        self.worker.is_some()
    }

    /// Configuration the system was built with
    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    /// The error accumulator shared with the worker
    pub fn errors(&self) -> &ErrorLog {
        &self.errors
    }

    // =========== Shapes ===========

    /// A default shape of `shape_type`, recycled from removed shapes when possible
    pub fn create_shape(&self, shape_type: ShapeType) -> Shape {
        self.pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .acquire(shape_type)
    }

    /// Validate `shape` and queue it for insertion
    ///
    /// The returned handle is usable immediately; commands and queries that
    /// name it are processed after the insertion.
    pub fn try_add_shape(&self, shape: Shape, flags: AddFlags) -> Result<ShapeId, CollisionError> {
        if !self.is_initialized() {
            return Err(CollisionError::NotInitialized);
        }
        if AddFlags::from_bits(flags.bits()).is_none() {
            return Err(CollisionError::InvalidAddFlags(flags.bits()));
        }
        shape.validate()?;

        let shape_id = self.registry.mint(shape.shape_type());
        self.shared.submit_command(QueuedCommand::AddShape {
            shape_id,
            shape: Box::new(shape),
            flags,
        });
        Ok(shape_id)
    }

    /// Like [`try_add_shape`](Self::try_add_shape), recording failures in the
    /// error log and returning [`ShapeId::none`]
    pub fn add_shape(&self, shape: Shape, flags: AddFlags) -> ShapeId {
        self.try_add_shape(shape, flags).unwrap_or_else(|e| {
            self.errors.add_error_message(format!("AddShape: {e}"));
            ShapeId::none()
        })
    }

    /// Queue removal of a live shape
    pub fn remove_shape(&self, shape_id: ShapeId) -> TaskId {
        if self.registry.shape_type(shape_id).is_none() {
            self.errors
                .add_error_message(format!("RemoveShape: {}", CollisionError::UnknownShape(shape_id)));
            return TaskId::NONE;
        }
        self.issue_command(Command::RemoveShape { shape_id })
    }

    /// Queue a new object-to-world transform for a shape
    pub fn set_object_to_world(&self, shape_id: ShapeId, object_to_world: RigidTransform) -> TaskId {
        self.issue_command(Command::SetObjectToWorld { shape_id, object_to_world })
    }

    /// Queue removal of every shape; the worker keeps running
    pub fn clear(&self) -> TaskId {
        self.issue_command(Command::RemoveAllShapes)
    }

    /// Type of a live shape, `None` once it has been removed
    pub fn shape_type(&self, shape_id: ShapeId) -> Option<ShapeType> {
        self.registry.shape_type(shape_id)
    }

    /// Handles minted and not yet removed, including queued insertions
    pub fn live_shape_count(&self) -> usize {
        self.registry.len()
    }

    // =========== Tasks ===========

    /// Queue a command, returning [`TaskId::NONE`] if the system is not running
    pub fn issue_command(&self, command: Command) -> TaskId {
        self.submit(QueuedCommand::Apply(command))
    }

    /// Queue a query, returning [`TaskId::NONE`] if the system is not running
    pub fn make_query(&self, query: Query) -> TaskId {
        if !self.is_initialized() {
            self.errors
                .add_error_message(format!("{}: {}", query.name(), CollisionError::NotInitialized));
            return TaskId::NONE;
        }
        self.shared.submit_query(query)
    }

    /// Queue a dump of every shape to `path`; answered with a `FileResult`
    pub fn dump_to_file(&self, path: impl Into<PathBuf>) -> TaskId {
        self.make_query(Query::File { path: path.into() })
    }

    /// Queue replacing every shape with the contents of `path`
    ///
    /// Runs as a command, in submission order with every other command. The
    /// task still completes with a `FileResult`.
    pub fn restore_from_file(&self, path: impl Into<PathBuf>) -> TaskId {
        self.issue_command(Command::Restore { path: path.into() })
    }

    /// Claim a finished query result. Never blocks.
    ///
    /// `None` if the task is still pending, was a command without a result,
    /// was already claimed, or is unknown. `Dump` and `Restore` commands
    /// complete with a `FileResult`.
    pub fn obtain_query_result(&self, task_id: TaskId) -> Option<QueryResult> {
        self.shared.lock_tasks().claim(task_id)
    }

    /// Claim a finished result of type `R`
    ///
    /// A result of another type is left in place.
    pub fn obtain_result<R: TypedResult>(&self, task_id: TaskId) -> Option<R> {
        self.shared
            .lock_tasks()
            .claim_kind(task_id, R::KIND)
            .and_then(R::from_result)
    }

    /// Where a task is in its lifecycle, `None` for ids never issued
    pub fn task_state(&self, task_id: TaskId) -> Option<TaskState> {
        self.shared.lock_tasks().state(task_id)
    }

    /// Block until every task submitted before this call has completed
    ///
    /// Returns false if the system is not running or the worker died.
    pub fn flush_all_tasks(&self) -> bool {
        let Some(handle) = &self.worker else {
            return false;
        };
        let last = self.shared.lock_tasks().last_issued();
        self.shared.wait_flushed(last, || !handle.is_finished())
    }

    fn submit(&self, command: QueuedCommand) -> TaskId {
        if !self.is_initialized() {
            self.errors
                .add_error_message(format!("{}: {}", command.name(), CollisionError::NotInitialized));
            return TaskId::NONE;
        }
        self.shared.submit_command(command)
    }
}

impl Drop for CollisionSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

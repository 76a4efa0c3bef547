//! Work queues shared with the caller and the worker thread loop

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::config::CollisionConfig;
use crate::system::command::QueuedCommand;
use crate::system::query::Query;
use crate::system::task::{TaskId, TaskTable};
use crate::system::world::CollisionWorld;

/// How often a blocked flush re-checks that the worker is still alive
const FLUSH_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
pub(crate) struct WorkQueues {
    commands: VecDeque<(TaskId, QueuedCommand)>,
    queries: VecDeque<(TaskId, Query)>,
}

impl WorkQueues {
    fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.queries.is_empty()
    }

    /// Everything queued right now, capped per queue (0 means no cap).
    ///
    /// A query never runs ahead of a command submitted before it, so when
    /// commands are left over only the queries older than them are taken.
    fn take_batch(
        &mut self,
        max_commands: usize,
        max_queries: usize,
    ) -> (Vec<(TaskId, QueuedCommand)>, Vec<(TaskId, Query)>) {
        let commands = drain_bounded(&mut self.commands, max_commands);
        let query_limit = match self.commands.front() {
            Some(&(oldest_command, _)) => {
                let eligible = self.queries.iter().take_while(|(id, _)| *id < oldest_command).count();
                if max_queries == 0 { eligible } else { eligible.min(max_queries) }
            }
            None => max_queries,
        };
        let queries = if self.commands.is_empty() || query_limit > 0 {
            drain_bounded(&mut self.queries, query_limit)
        } else {
            Vec::new()
        };
        (commands, queries)
    }
}

fn drain_bounded<T>(queue: &mut VecDeque<T>, limit: usize) -> Vec<T> {
    let count = if limit == 0 { queue.len() } else { limit.min(queue.len()) };
    queue.drain(..count).collect()
}

/// State shared between the caller's thread and the worker
///
/// Lock order is always queues, then tasks.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    queues: Mutex<WorkQueues>,
    work_available: Condvar,
    tasks: Mutex<TaskTable>,
    tasks_done: Condvar,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock_queues(&self) -> MutexGuard<'_, WorkQueues> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn lock_tasks(&self) -> MutexGuard<'_, TaskTable> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn submit_command(&self, command: QueuedCommand) -> TaskId {
        let mut queues = self.lock_queues();
        let task_id = self.lock_tasks().begin();
        queues.commands.push_back((task_id, command));
        drop(queues);
        self.work_available.notify_one();
        task_id
    }

    pub(crate) fn submit_query(&self, query: Query) -> TaskId {
        let mut queues = self.lock_queues();
        let task_id = self.lock_tasks().begin();
        queues.queries.push_back((task_id, query));
        drop(queues);
        self.work_available.notify_one();
        task_id
    }

    /// Block until no task up to `last` is pending.
    ///
    /// Returns false if `worker_alive` reports the worker gone first.
    pub(crate) fn wait_flushed(&self, last: TaskId, worker_alive: impl Fn() -> bool) -> bool {
        let mut tasks = self.lock_tasks();
        loop {
            if tasks.is_flushed_through(last) {
                return true;
            }
            if !worker_alive() {
                log::warn!("Collision worker exited with {} tasks pending", tasks.pending_count());
                return false;
            }
            tasks = self
                .tasks_done
                .wait_timeout(tasks, FLUSH_POLL_INTERVAL)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Drop everything queued and every task record
    pub(crate) fn clear(&self) {
        let mut queues = self.lock_queues();
        queues.commands.clear();
        queues.queries.clear();
        self.lock_tasks().clear();
    }
}

/// Worker thread body: sleep until work arrives, run a tick, publish results
pub(crate) fn run_worker(shared: Arc<Shared>, mut world: CollisionWorld, config: CollisionConfig) {
    log::info!("Collision worker started");

    loop {
        let (commands, queries) = {
            let mut queues = shared.lock_queues();
            while queues.is_empty() {
                queues = shared
                    .work_available
                    .wait(queues)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            queues.take_batch(config.max_commands_per_tick, config.max_queries_per_tick)
        };

        let outcome = world.run_tick(commands, queries);
        let tick = world.tick();

        let reclaimed = {
            let mut tasks = shared.lock_tasks();
            for (task_id, result) in outcome.completed {
                tasks.complete(task_id, result, tick);
            }
            tasks.reclaim(tick, config.result_horizon_ticks)
        };
        world.note_reclaimed(reclaimed);
        shared.tasks_done.notify_all();

        if outcome.exit {
            break;
        }
    }

    world.release_all();
    log::info!("Collision worker stopped after {} ticks", world.tick());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{Aabb, Shape, ShapePool};
    use crate::error::ErrorLog;
    use crate::foundation::math::Vec3;
    use crate::system::command::{AddFlags, Command};
    use crate::system::registry::ShapeRegistry;
    use crate::system::result::QueryResult;
    use crate::system::task::TaskState;

    #[test]
    fn test_drain_bounded() {
        let mut queue: VecDeque<u32> = (0..5).collect();
        assert_eq!(drain_bounded(&mut queue, 2), vec![0, 1]);
        assert_eq!(drain_bounded(&mut queue, 0), vec![2, 3, 4]);
        assert!(drain_bounded(&mut queue, 3).is_empty());
    }

    #[test]
    fn test_capped_batch_keeps_queries_behind_older_commands() {
        let shared = Shared::new();
        let first = shared.submit_command(QueuedCommand::Apply(Command::ResetProfileData));
        let early_query = shared.submit_query(Query::Stats);
        shared.submit_command(QueuedCommand::Apply(Command::ResetProfileData));
        shared.submit_query(Query::Stats);

        let (commands, queries) = shared.lock_queues().take_batch(1, 0);
        assert_eq!(commands.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![first]);
        assert_eq!(queries.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![early_query]);

        let (commands, queries) = shared.lock_queues().take_batch(1, 0);
        assert_eq!(commands.len(), 1);
        assert_eq!(queries.len(), 1);
        assert!(shared.lock_queues().is_empty());
    }

    #[test]
    fn test_worker_honors_per_tick_command_limit() {
        let config = CollisionConfig::default().with_max_commands_per_tick(1);
        let registry = ShapeRegistry::default();
        let world = CollisionWorld::new(
            config.clone(),
            Aabb::from_center_extents(Vec3::zeros(), Vec3::repeat(100.0)),
            registry.clone(),
            Arc::new(Mutex::new(ShapePool::default())),
            ErrorLog::new(),
        );
        let shared = Arc::new(Shared::new());
        let handle = {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || run_worker(shared, world, config))
        };

        for _ in 0..3 {
            let shape = Shape::sphere(1.0);
            shared.submit_command(QueuedCommand::AddShape {
                shape_id: registry.mint(shape.shape_type()),
                shape: Box::new(shape),
                flags: AddFlags::empty(),
            });
        }
        let stats = shared.submit_query(Query::Stats);
        assert!(shared.wait_flushed(stats, || !handle.is_finished()));

        let result = shared.lock_tasks().claim(stats);
        let Some(QueryResult::Stats(stats)) = result else {
            panic!("expected stats, got {result:?}");
        };
        assert_eq!(stats.shape_count(), 3);
        assert!(stats.tick >= 3);

        let exit = shared.submit_command(QueuedCommand::Exit);
        handle.join().expect("worker joins");
        assert_eq!(shared.lock_tasks().state(exit), Some(TaskState::Completed));
    }
}

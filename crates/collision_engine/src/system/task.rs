//! Task identifiers and the table tracking their lifecycle
//!
//! Every submitted command or query gets a [`TaskId`]. A task moves through
//! `Pending` (queued or being processed), `Completed` (result stored, waiting
//! to be claimed) and `Claimed` (result handed out, or discarded).

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::system::result::{QueryResult, ResultKind};

/// Handle correlating a submission with its result
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TaskId(u64);

impl TaskId {
    /// "No task", returned when a submission was rejected
    pub const NONE: Self = Self(0);

    /// True for [`TaskId::NONE`]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    /// Raw value, strictly increasing in submission order
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Submitted, not yet processed
    Pending,
    /// Processed, result waiting to be claimed
    Completed,
    /// Result taken by the caller or reclaimed
    Claimed,
}

#[derive(Debug)]
struct CompletedTask {
    /// `None` for commands
    result: Option<QueryResult>,
    completed_tick: u64,
}

/// Bookkeeping for every task that has not been claimed yet
#[derive(Debug)]
pub(crate) struct TaskTable {
    next_id: u64,
    pending: BTreeSet<TaskId>,
    completed: HashMap<TaskId, CompletedTask>,
}

impl Default for TaskTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskTable {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 1,
            pending: BTreeSet::new(),
            completed: HashMap::new(),
        }
    }

    /// Mint the next id and mark it pending
    pub(crate) fn begin(&mut self) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.pending.insert(id);
        id
    }

    /// Most recently minted id, or `NONE` if nothing was ever submitted
    pub(crate) fn last_issued(&self) -> TaskId {
        TaskId(self.next_id - 1)
    }

    pub(crate) fn complete(&mut self, id: TaskId, result: Option<QueryResult>, tick: u64) {
        if self.pending.remove(&id) {
            self.completed.insert(id, CompletedTask { result, completed_tick: tick });
        } else {
            log::warn!("Completed {id} which was not pending");
        }
    }

    /// Take whatever a completed task produced
    pub(crate) fn claim(&mut self, id: TaskId) -> Option<QueryResult> {
        self.completed.remove(&id).and_then(|task| task.result)
    }

    /// Take a completed result only if it is of the requested kind
    pub(crate) fn claim_kind(&mut self, id: TaskId, kind: ResultKind) -> Option<QueryResult> {
        let matches = self
            .completed
            .get(&id)
            .and_then(|task| task.result.as_ref())
            .is_some_and(|result| result.kind() == kind);
        if matches {
            self.claim(id)
        } else {
            None
        }
    }

    pub(crate) fn state(&self, id: TaskId) -> Option<TaskState> {
        if id.is_none() || id.0 >= self.next_id {
            None
        } else if self.pending.contains(&id) {
            Some(TaskState::Pending)
        } else if self.completed.contains_key(&id) {
            Some(TaskState::Completed)
        } else {
            Some(TaskState::Claimed)
        }
    }

    /// True once no task up to and including `last` is still pending
    pub(crate) fn is_flushed_through(&self, last: TaskId) -> bool {
        self.pending.first().map_or(true, |&oldest| oldest > last)
    }

    /// Discard results completed more than `horizon` ticks before `tick`
    pub(crate) fn reclaim(&mut self, tick: u64, horizon: u64) -> usize {
        let before = self.completed.len();
        self.completed.retain(|id, task| {
            let keep = tick.saturating_sub(task.completed_tick) <= horizon;
            if !keep {
                log::debug!("Reclaiming unclaimed result of {id} completed at tick {}", task.completed_tick);
            }
            keep
        });
        before - self.completed.len()
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Drop all pending and completed tasks; ids keep increasing
    pub(crate) fn clear(&mut self) {
        self.pending.clear();
        self.completed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::result::BoolResult;

    fn bool_result(value: bool) -> Option<QueryResult> {
        Some(QueryResult::Bool(BoolResult { value }))
    }

    #[test]
    fn test_ids_increase_and_none_is_reserved() {
        let mut table = TaskTable::new();
        assert!(table.last_issued().is_none());
        let first = table.begin();
        let second = table.begin();
        assert!(!first.is_none());
        assert!(first < second);
        assert_eq!(table.last_issued(), second);
        assert_eq!(table.state(TaskId::NONE), None);
        assert_eq!(table.state(TaskId(99)), None);
    }

    #[test]
    fn test_lifecycle_and_claim_once() {
        let mut table = TaskTable::new();
        let id = table.begin();
        assert_eq!(table.state(id), Some(TaskState::Pending));
        assert!(table.claim(id).is_none());

        table.complete(id, bool_result(true), 1);
        assert_eq!(table.state(id), Some(TaskState::Completed));

        assert_eq!(table.claim(id).map(|r| r.kind()), Some(ResultKind::Bool));
        assert_eq!(table.state(id), Some(TaskState::Claimed));
        assert!(table.claim(id).is_none());
    }

    #[test]
    fn test_claim_kind_leaves_mismatched_result() {
        let mut table = TaskTable::new();
        let id = table.begin();
        table.complete(id, bool_result(false), 1);

        assert!(table.claim_kind(id, ResultKind::Stats).is_none());
        assert_eq!(table.state(id), Some(TaskState::Completed));
        assert!(table.claim_kind(id, ResultKind::Bool).is_some());
    }

    #[test]
    fn test_flush_tracking() {
        let mut table = TaskTable::new();
        let a = table.begin();
        let b = table.begin();
        assert!(!table.is_flushed_through(a));

        table.complete(a, None, 1);
        assert!(table.is_flushed_through(a));
        assert!(!table.is_flushed_through(b));

        let c = table.begin();
        table.complete(b, None, 1);
        assert!(table.is_flushed_through(b));
        assert!(!table.is_flushed_through(c));
        assert_eq!(table.pending_count(), 1);
    }

    #[test]
    fn test_reclaim_after_horizon() {
        let mut table = TaskTable::new();
        let old = table.begin();
        let fresh = table.begin();
        table.complete(old, bool_result(true), 1);
        table.complete(fresh, bool_result(true), 5);

        assert_eq!(table.reclaim(4, 3), 0);
        assert_eq!(table.reclaim(5, 3), 1);
        assert_eq!(table.state(old), Some(TaskState::Claimed));
        assert_eq!(table.state(fresh), Some(TaskState::Completed));
        assert_eq!(table.completed_count(), 1);
    }
}

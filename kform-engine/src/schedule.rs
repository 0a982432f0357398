//! Debounce timers.
//!
//! A [`Scheduler`] runs a callback after a delay and can cancel it before it
//! fires. Form instances schedule one commit per debouncing field and cancel
//! the previous one on every keystroke.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Handle of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// A delayed callback.
pub type Task = Box<dyn FnOnce()>;

/// Timer owner used by form instances.
pub trait Scheduler {
    /// Runs `task` once `delay` has elapsed.
    fn schedule(&self, delay: Duration, task: Task) -> TaskId;

    /// Cancels a pending task. Returns false if it already ran or was
    /// cancelled.
    fn cancel(&self, id: TaskId) -> bool;
}

// ── ManualScheduler ──────────────────────────────────────────────

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_id: u64,
    /// Ordered by due time, then by scheduling order.
    pending: BTreeMap<(Duration, u64), Task>,
}

/// Scheduler driven by an explicit clock. Tasks run inside
/// [`advance`](ManualScheduler::advance).
#[derive(Default)]
pub struct ManualScheduler {
    state: RefCell<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current clock value.
    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Moves the clock forward and runs every task that became due, in due
    /// order. Tasks may schedule or cancel other tasks.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state.borrow().now + by;
        let mut ran = 0;
        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                let due = state.pending.first_key_value().map(|(&(due, _), _)| due);
                match due {
                    Some(due) if due <= target => {
                        state.now = due;
                        state.pending.pop_first()
                    }
                    _ => None,
                }
            };
            let Some((_, task)) = next else {
                break;
            };
            task();
            ran += 1;
        }
        self.state.borrow_mut().now = target;
        ran
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TaskId {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        let due = state.now + delay;
        state.pending.insert((due, id), task);
        TaskId(id)
    }

    fn cancel(&self, id: TaskId) -> bool {
        let removed = {
            let mut state = self.state.borrow_mut();
            let key = state.pending.keys().find(|(_, seq)| *seq == id.0).copied();
            key.and_then(|key| state.pending.remove(&key))
        };
        // Dropped outside the borrow: the task may own handles to this scheduler.
        removed.is_some()
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ManualScheduler")
            .field("now", &state.now)
            .field("pending", &state.pending.len())
            .finish()
    }
}

// ── TokioScheduler ───────────────────────────────────────────────

/// Scheduler backed by tokio timers.
///
/// Tasks are spawned with [`tokio::task::spawn_local`], so the scheduler must
/// be used from inside a [`tokio::task::LocalSet`].
#[derive(Default)]
pub struct TokioScheduler {
    next_id: Cell<u64>,
    tasks: Rc<RefCell<HashMap<TaskId, JoinHandle<()>>>>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks that have neither run nor been cancelled.
    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TaskId {
        let id = TaskId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        let tasks = Rc::clone(&self.tasks);
        let handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            tasks.borrow_mut().remove(&id);
            task();
        });
        self.tasks.borrow_mut().insert(id, handle);
        id
    }

    fn cancel(&self, id: TaskId) -> bool {
        let handle = self.tasks.borrow_mut().remove(&id);
        match handle {
            Some(handle) => {
                handle.abort();
                debug!(task = id.0, "Timer cancelled");
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("pending", &self.tasks.borrow().len())
            .finish()
    }
}

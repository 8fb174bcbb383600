//! Merge queue for pending item changes.
//!
//! Producers report item changes from any thread; the queue coalesces them per
//! token until the next tick drains it. Collisions are resolved by a fixed
//! priority `Update < Add < Remove`: a lower-priority existing task is kept,
//! equal kinds merge their property sets, and anything else is replaced by the
//! incoming task.
//!
//! Draining yields tasks in the order their tokens were first enqueued since
//! the previous drain.

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::property::{PropertyIdSet, Token};

/// The kind of a pending change. Declaration order is merge priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum TaskKind {
    /// Properties of a listed item changed.
    Update = 0,
    /// The item should enter the list.
    Add = 1,
    /// The item should leave the list.
    Remove = 2,
}

/// A pending change for one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeTask {
    /// What happened to the item.
    pub kind: TaskKind,
    /// Properties reported as changed (only meaningful for updates).
    pub updated_properties: PropertyIdSet,
}

impl MergeTask {
    /// Creates a task without changed properties.
    pub fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            updated_properties: PropertyIdSet::new(),
        }
    }

    /// Creates an update task.
    pub fn update(updated_properties: PropertyIdSet) -> Self {
        Self {
            kind: TaskKind::Update,
            updated_properties,
        }
    }

    /// Merges a later task for the same token into this one.
    pub fn merge(&mut self, incoming: MergeTask) {
        // Ignore
        if self.kind < incoming.kind {
            return;
        }

        // Merge
        if self.kind == incoming.kind {
            self.updated_properties.extend(incoming.updated_properties);
            return;
        }

        // Replace
        *self = incoming;
    }
}

/// A pending task together with the latest reported item.
#[derive(Debug, Clone)]
pub struct PendingTask<T> {
    /// The most recently reported version of the item.
    pub item: T,
    /// The coalesced change.
    pub task: MergeTask,
}

/// Drained tasks in first-touched order.
pub type TaskMap<T> = IndexMap<Token, PendingTask<T>>;

struct QueueState<T> {
    tasks: TaskMap<T>,
    updated_properties: PropertyIdSet,
}

impl<T> Default for QueueState<T> {
    fn default() -> Self {
        Self {
            tasks: TaskMap::new(),
            updated_properties: PropertyIdSet::new(),
        }
    }
}

/// Thread-safe per-token coalescing buffer.
pub struct MergeQueue<T> {
    state: Mutex<QueueState<T>>,
}

impl<T> Default for MergeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MergeQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
        }
    }

    /// Enqueues an addition.
    pub fn add_item(&self, token: Token, item: T) {
        self.push(token, item, MergeTask::new(TaskKind::Add));
    }

    /// Enqueues a removal.
    pub fn remove_item(&self, token: Token, item: T) {
        self.push(token, item, MergeTask::new(TaskKind::Remove));
    }

    /// Enqueues a property update.
    ///
    /// The properties are also recorded in the interval-wide set returned by
    /// [`drain`](Self::drain), even when the task itself is merged away.
    pub fn update_item(&self, token: Token, item: T, updated_properties: PropertyIdSet) {
        let mut state = self.state.lock();
        state.updated_properties.extend(updated_properties.iter().copied());
        Self::merge_into(&mut state.tasks, token, item, MergeTask::update(updated_properties));
    }

    fn push(&self, token: Token, item: T, task: MergeTask) {
        let mut state = self.state.lock();
        Self::merge_into(&mut state.tasks, token, item, task);
    }

    fn merge_into(tasks: &mut TaskMap<T>, token: Token, item: T, task: MergeTask) {
        match tasks.get_mut(&token) {
            Some(pending) => {
                pending.item = item;
                pending.task.merge(task);
            }
            None => {
                tasks.insert(token, PendingTask { item, task });
            }
        }
    }

    /// Atomically takes every pending task and the accumulated set of updated
    /// properties, leaving the queue empty.
    pub fn drain(&self) -> (TaskMap<T>, PropertyIdSet) {
        let mut state = self.state.lock();
        let tasks = std::mem::take(&mut state.tasks);
        let updated = std::mem::take(&mut state.updated_properties);
        (tasks, updated)
    }

    /// Discards everything.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.tasks.clear();
        state.updated_properties.clear();
    }

    /// Whether no task is pending.
    pub fn is_empty(&self) -> bool {
        self.state.lock().tasks.is_empty()
    }

    /// Number of tokens with a pending task.
    pub fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }
}

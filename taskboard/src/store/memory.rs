//! In-process task store for testing and embedding.
//!
//! [`MemoryStore`] answers requests from a local [`TaskTable`], so it behaves
//! like the hosted store without any network. Tests can additionally inject
//! failures, hold writes open to observe optimistic state, and count calls.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};
use taskboard_proto::table::TaskTable;
use taskboard_proto::task::{Category, NewTask, Task, TaskFormData, TaskId, position_index};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock as AsyncRwLock};

use super::{StoreError, TaskStore};

/// Number of calls received per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    /// `list` calls.
    pub list: usize,
    /// `max_order_index` calls.
    pub max_order_index: usize,
    /// `insert` calls.
    pub insert: usize,
    /// `update` calls.
    pub update: usize,
    /// `update_order_index` calls.
    pub update_order_index: usize,
    /// `delete` calls.
    pub delete: usize,
}

impl StoreCalls {
    /// Sum over all operations.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.list
            + self.max_order_index
            + self.insert
            + self.update
            + self.update_order_index
            + self.delete
    }
}

#[derive(Default)]
struct Counters {
    list: AtomicUsize,
    max_order_index: AtomicUsize,
    insert: AtomicUsize,
    update: AtomicUsize,
    update_order_index: AtomicUsize,
    delete: AtomicUsize,
}

#[derive(Default)]
struct Faults {
    reads: Option<String>,
    writes: Option<String>,
    order_updates: HashSet<TaskId>,
}

/// Keeps every write to a [`MemoryStore`] suspended until dropped or released.
pub struct WriteHold(OwnedRwLockWriteGuard<()>);

impl WriteHold {
    /// Lets the suspended writes proceed.
    pub fn release(self) {
        drop(self.0);
    }
}

/// In-process [`TaskStore`] backed by a [`TaskTable`].
#[derive(Default)]
pub struct MemoryStore {
    table: RwLock<TaskTable>,
    faults: Mutex<Faults>,
    gate: Arc<AsyncRwLock<()>>,
    counters: Counters,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts tasks with titles `titles` into `category` at positions 0..N.
    ///
    /// Seeding bypasses call counting and fault injection.
    pub fn seed(&self, category: Category, titles: &[&str]) -> Vec<Task> {
        let mut table = self.table.write();
        let start = table.max_order_index(category).map_or(0, |m| m + 1);
        titles
            .iter()
            .enumerate()
            .filter_map(|(i, title)| {
                table
                    .insert(NewTask {
                        category,
                        title: (*title).to_string(),
                        description: None,
                        order_index: start + position_index(i),
                    })
                    .ok()
            })
            .collect()
    }

    /// The stored rows of a category, without counting a call.
    #[must_use]
    pub fn peek(&self, category: Category) -> Vec<Task> {
        self.table.read().list(category)
    }

    /// Calls received so far.
    #[must_use]
    pub fn calls(&self) -> StoreCalls {
        let c = &self.counters;
        StoreCalls {
            list: c.list.load(Ordering::Relaxed),
            max_order_index: c.max_order_index.load(Ordering::Relaxed),
            insert: c.insert.load(Ordering::Relaxed),
            update: c.update.load(Ordering::Relaxed),
            update_order_index: c.update_order_index.load(Ordering::Relaxed),
            delete: c.delete.load(Ordering::Relaxed),
        }
    }

    /// Makes every read fail with `reason` (or succeed again with `None`).
    pub fn set_read_failure(&self, reason: Option<&str>) {
        self.faults.lock().reads = reason.map(str::to_string);
    }

    /// Makes every write fail with `reason` (or succeed again with `None`).
    pub fn set_write_failure(&self, reason: Option<&str>) {
        self.faults.lock().writes = reason.map(str::to_string);
    }

    /// Makes `update_order_index` fail for the given task.
    pub fn fail_order_update_for(&self, id: &TaskId) {
        self.faults.lock().order_updates.insert(id.clone());
    }

    /// Removes all injected failures.
    pub fn clear_faults(&self) {
        *self.faults.lock() = Faults::default();
    }

    /// Suspends all writes until the returned hold is released.
    pub async fn hold_writes(&self) -> WriteHold {
        WriteHold(Arc::clone(&self.gate).write_owned().await)
    }

    fn check_read(&self) -> Result<(), StoreError> {
        match &self.faults.lock().reads {
            Some(reason) => Err(StoreError::Fetch(reason.clone())),
            None => Ok(()),
        }
    }

    fn check_write(&self) -> Result<(), StoreError> {
        match &self.faults.lock().writes {
            Some(reason) => Err(StoreError::Write(reason.clone())),
            None => Ok(()),
        }
    }

    async fn wait_for_gate(&self) {
        drop(self.gate.read().await);
    }
}

fn write_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Write(e.to_string())
}

impl TaskStore for MemoryStore {
    async fn list(&self, category: Category) -> Result<Vec<Task>, StoreError> {
        self.counters.list.fetch_add(1, Ordering::Relaxed);
        self.check_read()?;
        Ok(self.table.read().list(category))
    }

    async fn max_order_index(&self, category: Category) -> Result<Option<i64>, StoreError> {
        self.counters.max_order_index.fetch_add(1, Ordering::Relaxed);
        self.check_read()?;
        Ok(self.table.read().max_order_index(category))
    }

    async fn insert(&self, task: NewTask) -> Result<Task, StoreError> {
        self.counters.insert.fetch_add(1, Ordering::Relaxed);
        self.wait_for_gate().await;
        self.check_write()?;
        self.table.write().insert(task).map_err(write_err)
    }

    async fn update(&self, id: &TaskId, form: TaskFormData) -> Result<Task, StoreError> {
        self.counters.update.fetch_add(1, Ordering::Relaxed);
        self.wait_for_gate().await;
        self.check_write()?;
        self.table.write().update(id, form).map_err(write_err)
    }

    async fn update_order_index(&self, id: &TaskId, order_index: i64) -> Result<Task, StoreError> {
        self.counters.update_order_index.fetch_add(1, Ordering::Relaxed);
        self.wait_for_gate().await;
        self.check_write()?;
        if self.faults.lock().order_updates.contains(id) {
            return Err(StoreError::Write(format!("order update rejected for {id}")));
        }
        self.table
            .write()
            .update_order_index(id, order_index)
            .map_err(write_err)
    }

    async fn delete(&self, id: &TaskId) -> Result<(), StoreError> {
        self.counters.delete.fetch_add(1, Ordering::Relaxed);
        self.wait_for_gate().await;
        self.check_write()?;
        self.table.write().delete(id).map_err(write_err)
    }
}

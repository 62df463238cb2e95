//! Task store client abstraction for `Taskboard`.
//!
//! Defines the [`TaskStore`] trait that every store client must satisfy.
//! Concrete implementations include:
//! - [`remote::RemoteStore`]: WebSocket client for the hosted store server
//! - [`memory::MemoryStore`]: in-process store for tests and embedding

pub mod memory;
pub mod remote;

use std::future::Future;

use taskboard_proto::task::{Category, NewTask, Task, TaskFormData, TaskId};

/// Errors that can occur during store operations.
///
/// Reads fail with [`StoreError::Fetch`]; inserts, updates, order changes and
/// deletes fail with [`StoreError::Write`]. The message is meant for display.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Loading tasks failed.
    #[error("failed to load tasks: {0}")]
    Fetch(String),

    /// Saving a change failed.
    #[error("failed to save changes: {0}")]
    Write(String),
}

/// Async task store client.
///
/// Every operation is one independent request; there is no transaction
/// spanning several calls.
pub trait TaskStore: Send + Sync {
    /// All tasks of a category, sorted ascending by `order_index`.
    fn list(&self, category: Category)
    -> impl Future<Output = Result<Vec<Task>, StoreError>> + Send;

    /// Highest `order_index` in the category, `None` when it has no tasks.
    fn max_order_index(
        &self,
        category: Category,
    ) -> impl Future<Output = Result<Option<i64>, StoreError>> + Send;

    /// Creates a task; the store assigns id and timestamps.
    fn insert(&self, task: NewTask) -> impl Future<Output = Result<Task, StoreError>> + Send;

    /// Replaces a task's title and description.
    fn update(
        &self,
        id: &TaskId,
        form: TaskFormData,
    ) -> impl Future<Output = Result<Task, StoreError>> + Send;

    /// Moves a task to a new `order_index`.
    fn update_order_index(
        &self,
        id: &TaskId,
        order_index: i64,
    ) -> impl Future<Output = Result<Task, StoreError>> + Send;

    /// Removes a task.
    fn delete(&self, id: &TaskId) -> impl Future<Output = Result<(), StoreError>> + Send;
}

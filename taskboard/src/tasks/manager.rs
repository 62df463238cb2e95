//! Category task manager: list state, CRUD and optimistic reordering for one
//! category.
//!
//! `CategoryTaskManager` owns the in-memory task list of a single category and
//! publishes it as a [`CategoryState`] through a watch channel. Every mutation
//! goes to the [`TaskStore`] first and is followed by a refresh, except
//! reordering, which is shown immediately and only re-fetched on failure.

use std::sync::Arc;

use taskboard_proto::task::{Category, MAX_TASK_TITLE_LENGTH, NewTask, Task, TaskFormData, TaskId};
use tokio::sync::watch;

use super::TaskError;
use super::reorder::{self, assign_positions, persist_order};
use crate::store::TaskStore;

/// Where a category's list is in its load cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadStatus {
    /// Never loaded.
    #[default]
    Idle,
    /// A fetch is outstanding.
    Loading,
    /// The last fetch succeeded.
    Ready,
    /// The last fetch failed; tasks are stale.
    Error,
}

/// Snapshot of one category's list as shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryState {
    /// Tasks in display order.
    pub tasks: Vec<Task>,
    /// Load cycle status.
    pub status: LoadStatus,
    /// Message of the most recent failure, cleared when the next operation starts.
    pub error: Option<String>,
}

impl CategoryState {
    /// Whether a fetch is outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status == LoadStatus::Loading
    }
}

/// Manages the task list of one category.
///
/// Cloning is cheap: clones share the store and the published state, so an
/// operation can run on a spawned task while the UI keeps reading snapshots.
pub struct CategoryTaskManager<S> {
    category: Category,
    store: Arc<S>,
    state: Arc<watch::Sender<CategoryState>>,
    max_title_len: usize,
}

impl<S> Clone for CategoryTaskManager<S> {
    fn clone(&self) -> Self {
        Self {
            category: self.category,
            store: Arc::clone(&self.store),
            state: Arc::clone(&self.state),
            max_title_len: self.max_title_len,
        }
    }
}

impl<S: TaskStore> CategoryTaskManager<S> {
    /// Creates an idle manager with an empty list.
    #[must_use]
    pub fn new(category: Category, store: Arc<S>) -> Self {
        let (state, _) = watch::channel(CategoryState::default());
        Self {
            category,
            store,
            state: Arc::new(state),
            max_title_len: MAX_TASK_TITLE_LENGTH,
        }
    }

    /// Overrides the maximum title length in characters.
    #[must_use]
    pub const fn with_max_title_len(mut self, max: usize) -> Self {
        self.max_title_len = max;
        self
    }

    /// The category this manager is scoped to.
    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    /// The current state.
    #[must_use]
    pub fn snapshot(&self) -> CategoryState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CategoryState> {
        self.state.subscribe()
    }

    /// Re-fetches the category's tasks from the store.
    ///
    /// On failure the stale tasks stay visible alongside the error.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Store`] if the list cannot be fetched.
    pub async fn refresh(&self) -> Result<(), TaskError> {
        self.clear_error();
        self.load().await
    }

    /// Creates a task at the end of the category.
    ///
    /// The new task's `order_index` is the current maximum plus one, or 0 in
    /// an empty category. Reading the maximum and inserting are two separate
    /// calls, so two concurrent adds can pick the same index.
    ///
    /// A failure of the follow-up refresh is recorded in the state but does
    /// not fail the add.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::TitleEmpty`] or [`TaskError::TitleTooLong`]
    /// without calling the store, or [`TaskError::Store`] if reading the
    /// maximum or inserting fails.
    pub async fn add(&self, form: TaskFormData) -> Result<Task, TaskError> {
        self.clear_error();
        let form = self.checked(form)?;
        let created = match self.insert_last(form).await {
            Ok(task) => task,
            Err(e) => return Err(self.fail(e)),
        };
        tracing::info!(
            category = %self.category,
            task_id = %created.id,
            order_index = created.order_index,
            "task added"
        );
        self.reload_after_write().await;
        Ok(created)
    }

    /// Replaces the title and description of a task.
    ///
    /// # Errors
    ///
    /// Returns a validation error without calling the store, or
    /// [`TaskError::Store`] if the update is rejected.
    pub async fn update(&self, id: &TaskId, form: TaskFormData) -> Result<Task, TaskError> {
        self.clear_error();
        let form = self.checked(form)?;
        let updated = match self.store.update(id, form).await {
            Ok(task) => task,
            Err(e) => return Err(self.fail(e.into())),
        };
        tracing::info!(category = %self.category, task_id = %id, "task updated");
        self.reload_after_write().await;
        Ok(updated)
    }

    /// Deletes a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Store`] if the delete is rejected, including for
    /// an id the store does not know. The list is left unchanged.
    pub async fn delete(&self, id: &TaskId) -> Result<(), TaskError> {
        self.clear_error();
        if let Err(e) = self.store.delete(id).await {
            return Err(self.fail(e.into()));
        }
        tracing::info!(category = %self.category, task_id = %id, "task deleted");
        self.reload_after_write().await;
        Ok(())
    }

    /// Replaces the list with `new_order` and persists every position.
    ///
    /// The new order is published before any store call completes. If every
    /// `order_index` write succeeds it stays as is; if any fails, the list is
    /// re-fetched so it shows the order the store actually holds, and the
    /// first failure is reported. An unchanged order makes no store calls
    /// and leaves the state as it was, including any error.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::InvalidReorder`] if `new_order` is not a
    /// permutation of the current tasks, or [`TaskError::Store`] with the
    /// first failed write.
    pub async fn reorder(&self, new_order: Vec<Task>) -> Result<(), TaskError> {
        let current = self.state.borrow().tasks.clone();
        if let Err(e) = reorder::validate(&current, &new_order) {
            return Err(self.fail(e));
        }
        if reorder::same_order(&current, &new_order) {
            tracing::debug!(category = %self.category, "reorder unchanged, skipping");
            return Ok(());
        }
        self.clear_error();

        let mut optimistic = new_order;
        assign_positions(&mut optimistic);
        self.state.send_modify(|s| s.tasks.clone_from(&optimistic));

        match persist_order(&*self.store, &optimistic).await {
            Ok(()) => {
                tracing::info!(category = %self.category, count = optimistic.len(), "tasks reordered");
                self.state.send_modify(|s| s.status = LoadStatus::Ready);
                Ok(())
            }
            Err(e) => {
                let err = TaskError::from(e);
                if let Err(refresh_err) = self.load().await {
                    tracing::warn!(
                        category = %self.category,
                        error = %refresh_err,
                        "could not recover order after failed reorder"
                    );
                }
                Err(self.fail(err))
            }
        }
    }

    /// Drops `active` onto the position of `over` and persists the result.
    ///
    /// Dropping a task onto itself, or naming a task that is not in the list,
    /// changes nothing and makes no store calls.
    ///
    /// # Errors
    ///
    /// Same as [`Self::reorder`].
    pub async fn move_task(&self, active: &TaskId, over: &TaskId) -> Result<(), TaskError> {
        let moved = reorder::move_task(&self.state.borrow().tasks, active, over);
        match moved {
            Some(new_order) => self.reorder(new_order).await,
            None => Ok(()),
        }
    }

    async fn load(&self) -> Result<(), TaskError> {
        self.state.send_modify(|s| s.status = LoadStatus::Loading);
        match self.store.list(self.category).await {
            Ok(tasks) => {
                tracing::debug!(category = %self.category, count = tasks.len(), "tasks loaded");
                self.state.send_modify(|s| {
                    s.tasks = tasks;
                    s.status = LoadStatus::Ready;
                });
                Ok(())
            }
            Err(e) => {
                let err = TaskError::from(e);
                tracing::warn!(category = %self.category, error = %err, "task refresh failed");
                let message = err.to_string();
                self.state.send_modify(|s| {
                    s.status = LoadStatus::Error;
                    s.error = Some(message);
                });
                Err(err)
            }
        }
    }

    async fn reload_after_write(&self) {
        if let Err(e) = self.load().await {
            tracing::debug!(category = %self.category, error = %e, "refresh after write failed");
        }
    }

    async fn insert_last(&self, form: TaskFormData) -> Result<Task, TaskError> {
        let next = self
            .store
            .max_order_index(self.category)
            .await?
            .map_or(0, |max| max.saturating_add(1));
        let task = self
            .store
            .insert(NewTask {
                category: self.category,
                title: form.title,
                description: form.description,
                order_index: next,
            })
            .await?;
        Ok(task)
    }

    /// Normalizes the form and checks the title.
    fn checked(&self, form: TaskFormData) -> Result<TaskFormData, TaskError> {
        let form = form.normalized();
        if form.title.is_empty() {
            return Err(self.fail(TaskError::TitleEmpty));
        }
        if form.title.chars().count() > self.max_title_len {
            return Err(self.fail(TaskError::TitleTooLong {
                max: self.max_title_len,
            }));
        }
        Ok(form)
    }

    /// Records `err` as the category's error and hands it back.
    fn fail(&self, err: TaskError) -> TaskError {
        tracing::warn!(category = %self.category, error = %err, "task operation failed");
        let message = err.to_string();
        self.state.send_modify(|s| s.error = Some(message));
        err
    }

    fn clear_error(&self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }
}

//! Row semantics of the task store.
//!
//! [`TaskTable`] is the single definition of how the store answers each
//! query. The server wraps it behind its connection handler and the client
//! crate's in-process store wraps it directly, so both behave identically.

use std::collections::HashMap;

use crate::task::{Category, NewTask, Task, TaskFormData, TaskId, Timestamp};

/// Errors produced by table writes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// No row with the given id exists.
    #[error("task not found: {0}")]
    NotFound(TaskId),
    /// The title was empty after trimming.
    #[error("task title cannot be empty")]
    TitleEmpty,
}

/// In-memory task rows keyed by id.
#[derive(Debug, Clone, Default)]
pub struct TaskTable {
    rows: HashMap<TaskId, Task>,
}

impl TaskTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from existing rows (e.g. a loaded snapshot).
    #[must_use]
    pub fn from_rows(rows: impl IntoIterator<Item = Task>) -> Self {
        Self {
            rows: rows.into_iter().map(|t| (t.id.clone(), t)).collect(),
        }
    }

    /// Total number of rows across all categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Looks up a row by id.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.rows.get(id)
    }

    /// All rows of a category ordered by `order_index` ascending.
    ///
    /// Equal indices (never produced by this crate's writers, but possible
    /// with concurrent inserts) fall back to creation time, then id.
    #[must_use]
    pub fn list(&self, category: Category) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .rows
            .values()
            .filter(|t| t.category == category)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| {
            a.order_index
                .cmp(&b.order_index)
                .then(a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        tasks
    }

    /// Highest `order_index` in the category, or `None` if it is empty.
    #[must_use]
    pub fn max_order_index(&self, category: Category) -> Option<i64> {
        self.rows
            .values()
            .filter(|t| t.category == category)
            .map(|t| t.order_index)
            .max()
    }

    /// Inserts a new row, assigning its id and timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::TitleEmpty`] if the title is blank.
    pub fn insert(&mut self, new: NewTask) -> Result<Task, TableError> {
        if new.title.trim().is_empty() {
            return Err(TableError::TitleEmpty);
        }
        let now = Timestamp::now();
        let task = Task {
            id: TaskId::new(),
            category: new.category,
            title: new.title,
            description: new.description,
            order_index: new.order_index,
            created_at: now,
            updated_at: now,
        };
        self.rows.insert(task.id.clone(), task.clone());
        Ok(task)
    }

    /// Replaces a row's title and description.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::NotFound`] for an unknown id, or
    /// [`TableError::TitleEmpty`] if the new title is blank.
    pub fn update(&mut self, id: &TaskId, form: TaskFormData) -> Result<Task, TableError> {
        if form.title.trim().is_empty() {
            return Err(TableError::TitleEmpty);
        }
        let task = self
            .rows
            .get_mut(id)
            .ok_or_else(|| TableError::NotFound(id.clone()))?;
        task.title = form.title;
        task.description = form.description;
        task.updated_at = Timestamp::now();
        Ok(task.clone())
    }

    /// Moves a row to a new `order_index`.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::NotFound`] for an unknown id.
    pub fn update_order_index(
        &mut self,
        id: &TaskId,
        order_index: i64,
    ) -> Result<Task, TableError> {
        let task = self
            .rows
            .get_mut(id)
            .ok_or_else(|| TableError::NotFound(id.clone()))?;
        task.order_index = order_index;
        task.updated_at = Timestamp::now();
        Ok(task.clone())
    }

    /// Removes a row.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::NotFound`] for an unknown id.
    pub fn delete(&mut self, id: &TaskId) -> Result<(), TableError> {
        self.rows
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| TableError::NotFound(id.clone()))
    }

    /// Iterates over all rows in no particular order.
    pub fn rows(&self) -> impl Iterator<Item = &Task> {
        self.rows.values()
    }
}

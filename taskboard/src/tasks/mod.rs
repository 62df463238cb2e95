//! Per-category task list state for `Taskboard`.
//!
//! Each category's list is owned by one [`CategoryTaskManager`], which drives
//! the task store and publishes [`CategoryState`] snapshots for rendering.
//! Reordering is applied optimistically and reconciled by re-fetching when
//! the store rejects any part of it.

pub mod manager;
pub mod reorder;

pub use manager::{CategoryState, CategoryTaskManager, LoadStatus};
pub use reorder::{assign_positions, move_task, persist_order};

use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur during task operations.
///
/// The `Display` text is what the category shows as its error line.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    /// Task title cannot be empty.
    #[error("task title cannot be empty")]
    TitleEmpty,
    /// Task title exceeds the maximum length.
    #[error("task title too long (max {max} characters)")]
    TitleTooLong {
        /// Configured maximum in characters.
        max: usize,
    },
    /// The requested order is not a permutation of the current list.
    #[error("invalid reorder: {0}")]
    InvalidReorder(String),
    /// The task store rejected a call.
    #[error(transparent)]
    Store(#[from] StoreError),
}

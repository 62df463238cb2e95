//! The task board: one manager per category, driven by commands from the UI.
//!
//! The TUI event loop is synchronous, so it never awaits a manager directly.
//! It sends a [`BoardCommand`] to [`TaskBoard::dispatch`], which runs the
//! operation on a spawned tokio task and reports a [`BoardEvent`] when done.
//! The lists themselves are read back through each manager's snapshot.
//!
//! ```text
//! TUI (main thread)  ── BoardCommand →  spawned manager operation
//!                    ←── BoardEvent ──
//! ```

use std::sync::Arc;

use futures_util::future::join_all;
use taskboard_proto::task::{Category, Task, TaskFormData, TaskId};
use tokio::sync::mpsc;

use crate::store::TaskStore;
use crate::tasks::{CategoryState, CategoryTaskManager, TaskError};

/// Default capacity of the board event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Operations the UI can request on a category.
#[derive(Debug, Clone)]
pub enum BoardCommand {
    /// Re-fetch one category.
    Refresh(Category),
    /// Re-fetch every category.
    RefreshAll,
    /// Create a task at the end of a category.
    Add {
        /// Target category.
        category: Category,
        /// Entered title and description.
        form: TaskFormData,
        /// Echoed back in the [`BoardEvent`] so the caller can tell its
        /// submissions apart.
        ticket: u64,
    },
    /// Edit a task's title and description.
    Update {
        /// Category holding the task.
        category: Category,
        /// Task to edit.
        id: TaskId,
        /// Entered title and description.
        form: TaskFormData,
        /// Echoed back in the [`BoardEvent`].
        ticket: u64,
    },
    /// Delete a task.
    Delete {
        /// Category holding the task.
        category: Category,
        /// Task to delete.
        id: TaskId,
    },
    /// Drop `active` onto the position of `over`.
    Move {
        /// Category holding both tasks.
        category: Category,
        /// The dragged task.
        active: TaskId,
        /// The task it was dropped on.
        over: TaskId,
    },
    /// Replace a category's order with a full permutation.
    Reorder {
        /// Category to reorder.
        category: Category,
        /// Every task of the category in the new order.
        tasks: Vec<Task>,
    },
}

/// Kind of operation a [`BoardEvent`] reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardAction {
    /// A refresh.
    Refresh,
    /// An add.
    Add,
    /// An edit.
    Update,
    /// A delete.
    Delete,
    /// A move or full reorder.
    Reorder,
}

impl BoardAction {
    /// Past-tense verb for status messages.
    #[must_use]
    pub const fn done_label(self) -> &'static str {
        match self {
            Self::Refresh => "refreshed",
            Self::Add => "added",
            Self::Update => "updated",
            Self::Delete => "deleted",
            Self::Reorder => "reordered",
        }
    }
}

/// Completion report of a dispatched operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardEvent {
    /// Category the operation ran on.
    pub category: Category,
    /// What ran.
    pub action: BoardAction,
    /// `Err` carries the message also shown in the category's error line.
    pub outcome: Result<(), String>,
    /// Ticket of the add or edit this reports on.
    pub ticket: Option<u64>,
}

/// The three category managers, indexed by [`Category::index`].
pub struct TaskBoard<S> {
    managers: [CategoryTaskManager<S>; 3],
}

impl<S> Clone for TaskBoard<S> {
    fn clone(&self) -> Self {
        Self {
            managers: self.managers.clone(),
        }
    }
}

impl<S: TaskStore + 'static> TaskBoard<S> {
    /// Creates one manager per category over a shared store.
    #[must_use]
    pub fn new(store: Arc<S>, max_title_len: usize) -> Self {
        Self {
            managers: Category::ALL.map(|category| {
                CategoryTaskManager::new(category, Arc::clone(&store))
                    .with_max_title_len(max_title_len)
            }),
        }
    }

    /// The manager of `category`.
    #[must_use]
    pub const fn manager(&self, category: Category) -> &CategoryTaskManager<S> {
        &self.managers[category.index()]
    }

    /// Current state of `category`.
    #[must_use]
    pub fn snapshot(&self, category: Category) -> CategoryState {
        self.manager(category).snapshot()
    }

    /// Refreshes every category concurrently.
    ///
    /// Returns one result per category in [`Category::ALL`] order.
    pub async fn refresh_all(&self) -> Vec<Result<(), TaskError>> {
        join_all(self.managers.iter().map(|m| m.refresh())).await
    }

    /// Runs `command` on a background task.
    ///
    /// Each affected category reports one [`BoardEvent`] on `events` when its
    /// operation finishes. Must be called from within a tokio runtime.
    pub fn dispatch(&self, command: BoardCommand, events: &mpsc::Sender<BoardEvent>) {
        if matches!(command, BoardCommand::RefreshAll) {
            for category in Category::ALL {
                self.dispatch(BoardCommand::Refresh(category), events);
            }
            return;
        }

        let board = self.clone();
        let events = events.clone();
        tokio::spawn(async move {
            let Some(event) = board.run(command).await else {
                return;
            };
            if events.send(event).await.is_err() {
                tracing::debug!("board event receiver dropped");
            }
        });
    }

    async fn run(&self, command: BoardCommand) -> Option<BoardEvent> {
        let mut ticket = None;
        let (category, action, result) = match command {
            BoardCommand::RefreshAll => return None,
            BoardCommand::Refresh(category) => (
                category,
                BoardAction::Refresh,
                self.manager(category).refresh().await,
            ),
            BoardCommand::Add {
                category,
                form,
                ticket: t,
            } => {
                ticket = Some(t);
                (
                    category,
                    BoardAction::Add,
                    self.manager(category).add(form).await.map(|_| ()),
                )
            }
            BoardCommand::Update {
                category,
                id,
                form,
                ticket: t,
            } => {
                ticket = Some(t);
                (
                    category,
                    BoardAction::Update,
                    self.manager(category).update(&id, form).await.map(|_| ()),
                )
            }
            BoardCommand::Delete { category, id } => (
                category,
                BoardAction::Delete,
                self.manager(category).delete(&id).await,
            ),
            BoardCommand::Move {
                category,
                active,
                over,
            } => (
                category,
                BoardAction::Reorder,
                self.manager(category).move_task(&active, &over).await,
            ),
            BoardCommand::Reorder { category, tasks } => (
                category,
                BoardAction::Reorder,
                self.manager(category).reorder(tasks).await,
            ),
        };
        Some(BoardEvent {
            category,
            action,
            outcome: result.map_err(|e| e.to_string()),
            ticket,
        })
    }
}

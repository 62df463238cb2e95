//! Reorder coordination: turns a drop into a new order and a batch of
//! `order_index` writes.

use std::collections::HashSet;

use futures_util::future::join_all;
use taskboard_proto::task::{Task, TaskId, position_index};

use super::TaskError;
use crate::store::{StoreError, TaskStore};

/// Moves the task `active` to the position currently held by `over`.
///
/// Array-move semantics: the active task is removed and reinserted at the
/// target index, shifting the tasks in between by one. Returns `None` when
/// the drop changes nothing (dropped onto itself, or either id is unknown).
#[must_use]
pub fn move_task(tasks: &[Task], active: &TaskId, over: &TaskId) -> Option<Vec<Task>> {
    if active == over {
        return None;
    }
    let from = tasks.iter().position(|t| &t.id == active)?;
    let to = tasks.iter().position(|t| &t.id == over)?;

    let mut moved = tasks.to_vec();
    let task = moved.remove(from);
    moved.insert(to, task);
    Some(moved)
}

/// Rewrites every task's `order_index` to its position in the slice.
pub fn assign_positions(tasks: &mut [Task]) {
    for (position, task) in tasks.iter_mut().enumerate() {
        task.order_index = position_index(position);
    }
}

/// Checks that `proposed` holds exactly the tasks of `current`.
pub(crate) fn validate(current: &[Task], proposed: &[Task]) -> Result<(), TaskError> {
    if current.len() != proposed.len() {
        return Err(TaskError::InvalidReorder(format!(
            "expected {} tasks, got {}",
            current.len(),
            proposed.len()
        )));
    }

    let members: HashSet<&TaskId> = current.iter().map(|t| &t.id).collect();
    let mut seen = HashSet::with_capacity(proposed.len());
    for task in proposed {
        if !members.contains(&task.id) {
            return Err(TaskError::InvalidReorder(format!(
                "task {} is not in this category",
                task.id
            )));
        }
        if !seen.insert(&task.id) {
            return Err(TaskError::InvalidReorder(format!(
                "task {} appears twice",
                task.id
            )));
        }
    }
    Ok(())
}

/// Whether both lists name the same tasks in the same order.
pub(crate) fn same_order(current: &[Task], proposed: &[Task]) -> bool {
    current.len() == proposed.len() && current.iter().zip(proposed).all(|(a, b)| a.id == b.id)
}

/// Writes each task's position as its `order_index`, all calls concurrently.
///
/// Waits for the whole batch. The calls are independent, so some may land
/// while others fail.
///
/// # Errors
///
/// Returns the first failure in list order.
pub async fn persist_order<S: TaskStore>(store: &S, tasks: &[Task]) -> Result<(), StoreError> {
    let results = join_all(
        tasks
            .iter()
            .enumerate()
            .map(|(position, task)| store.update_order_index(&task.id, position_index(position))),
    )
    .await;

    let failures = results.iter().filter(|r| r.is_err()).count();
    match results.into_iter().find_map(Result::err) {
        Some(first) => {
            tracing::warn!(failures, total = tasks.len(), err = %first, "order persist failed");
            Err(first)
        }
        None => Ok(()),
    }
}

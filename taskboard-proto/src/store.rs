//! Store wire protocol between task store clients and the store server.
//!
//! Clients send a [`RequestFrame`] per operation and the server answers each
//! with a [`ReplyFrame`] carrying the same `id`. Replies may arrive in any
//! order; the id is the only correlation between the two.

use serde::{Deserialize, Serialize};

use crate::table::TaskTable;
use crate::task::{Category, NewTask, Task, TaskFormData, TaskId};

/// A store operation requested by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreRequest {
    /// All tasks of a category, ordered by `order_index`.
    List {
        /// Category to list.
        category: Category,
    },
    /// The highest `order_index` in a category.
    MaxOrderIndex {
        /// Category to inspect.
        category: Category,
    },
    /// Create a task row.
    Insert(NewTask),
    /// Replace title and description.
    Update {
        /// Row to update.
        id: TaskId,
        /// New user-editable fields.
        form: TaskFormData,
    },
    /// Move a row to a new position.
    UpdateOrderIndex {
        /// Row to move.
        id: TaskId,
        /// New position.
        order_index: i64,
    },
    /// Remove a row.
    Delete {
        /// Row to remove.
        id: TaskId,
    },
}

/// The server's answer to a [`StoreRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreReply {
    /// Answer to [`StoreRequest::List`].
    Tasks(Vec<Task>),
    /// Answer to [`StoreRequest::MaxOrderIndex`]; `None` for an empty category.
    MaxOrderIndex(Option<i64>),
    /// The created or modified row.
    Task(Task),
    /// Answer to [`StoreRequest::Delete`].
    Deleted,
    /// The request failed.
    Error {
        /// Human-readable error description.
        reason: String,
    },
}

/// A request tagged with a client-chosen correlation id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFrame {
    /// Correlation id echoed in the reply.
    pub id: u64,
    /// The operation.
    pub request: StoreRequest,
}

/// A reply tagged with the id of the request it answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyFrame {
    /// Correlation id of the request.
    pub id: u64,
    /// The outcome.
    pub reply: StoreReply,
}

impl StoreRequest {
    /// Whether this request only reads the table.
    #[must_use]
    pub const fn is_read(&self) -> bool {
        matches!(self, Self::List { .. } | Self::MaxOrderIndex { .. })
    }

    /// Short operation name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::List { .. } => "list",
            Self::MaxOrderIndex { .. } => "max_order_index",
            Self::Insert(_) => "insert",
            Self::Update { .. } => "update",
            Self::UpdateOrderIndex { .. } => "update_order_index",
            Self::Delete { .. } => "delete",
        }
    }

    /// Answers a read request against a shared table.
    ///
    /// Returns `None` for write requests, which need [`StoreRequest::apply`].
    #[must_use]
    pub fn query(&self, table: &TaskTable) -> Option<StoreReply> {
        match self {
            Self::List { category } => Some(StoreReply::Tasks(table.list(*category))),
            Self::MaxOrderIndex { category } => {
                Some(StoreReply::MaxOrderIndex(table.max_order_index(*category)))
            }
            _ => None,
        }
    }

    /// Executes any request against an exclusively borrowed table.
    pub fn apply(self, table: &mut TaskTable) -> StoreReply {
        let result = match self {
            Self::List { category } => Ok(StoreReply::Tasks(table.list(category))),
            Self::MaxOrderIndex { category } => {
                Ok(StoreReply::MaxOrderIndex(table.max_order_index(category)))
            }
            Self::Insert(new) => table.insert(new).map(StoreReply::Task),
            Self::Update { id, form } => table.update(&id, form).map(StoreReply::Task),
            Self::UpdateOrderIndex { id, order_index } => table
                .update_order_index(&id, order_index)
                .map(StoreReply::Task),
            Self::Delete { id } => table.delete(&id).map(|()| StoreReply::Deleted),
        };
        result.unwrap_or_else(|e| StoreReply::Error {
            reason: e.to_string(),
        })
    }
}

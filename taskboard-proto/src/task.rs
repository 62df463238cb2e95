//! Task data model shared by the store server and its clients.
//!
//! A [`Task`] belongs to exactly one [`Category`] for its whole life. Its
//! position inside the category is the `order_index`, interpreted in
//! ascending order.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum allowed task title length in characters.
pub const MAX_TASK_TITLE_LENGTH: usize = 256;

/// Unique identifier for a task, based on UUID v7 for time-ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new time-ordered task identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Milliseconds since the UNIX epoch, assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a timestamp for the current instant.
    #[must_use]
    pub fn now() -> Self {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    /// Creates a timestamp from milliseconds since the UNIX epoch.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as milliseconds since the UNIX epoch.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }
}

/// One of the fixed task groupings. Every list and reorder is scoped to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Work tasks.
    Work,
    /// Study tasks.
    Study,
    /// Personal life tasks.
    Life,
}

impl Category {
    /// All categories in board display order.
    pub const ALL: [Self; 3] = [Self::Work, Self::Study, Self::Life];

    /// Stable wire name (`work`, `study`, `life`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Study => "study",
            Self::Life => "life",
        }
    }

    /// Human-readable column title.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Work => "Work",
            Self::Study => "Study",
            Self::Life => "Life",
        }
    }

    /// Column icon.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Work => "\u{1f4bc}",
            Self::Study => "\u{1f4da}",
            Self::Life => "\u{1f3e0}",
        }
    }

    /// Position of this category in [`Category::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Work => 0,
            Self::Study => 1,
            Self::Life => 2,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown category name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl std::str::FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// A persisted task row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,
    /// Category this task belongs to (never changes).
    pub category: Category,
    /// Non-empty, trimmed title.
    pub title: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Display position within the category, ascending.
    pub order_index: i64,
    /// When the store created this row.
    pub created_at: Timestamp,
    /// When the store last modified this row.
    pub updated_at: Timestamp,
}

/// User-editable fields of a task, as entered in a form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFormData {
    /// Task title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
}

impl TaskFormData {
    /// Creates form data from a title and an optional description.
    pub fn new(title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            title: title.into(),
            description,
        }
    }

    /// Trims both fields; a blank description becomes `None`.
    #[must_use]
    pub fn normalized(self) -> Self {
        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        Self {
            title: self.title.trim().to_string(),
            description,
        }
    }
}

/// Insert payload for a new task row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    /// Category of the new task.
    pub category: Category,
    /// Title (already normalized by the caller).
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Position assigned by the caller.
    pub order_index: i64,
}

/// Converts a list position into an `order_index`.
#[must_use]
pub fn position_index(position: usize) -> i64 {
    i64::try_from(position).unwrap_or(i64::MAX)
}

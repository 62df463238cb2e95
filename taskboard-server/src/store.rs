//! Shared task table for all connections, with optional JSON snapshots.
//!
//! The [`TaskStoreState`] answers every [`StoreRequest`]. Reads share the
//! table; writes take it exclusively. When a snapshot path is configured the
//! full table is rewritten to disk after each successful write, and loaded
//! back when the server starts.
//!
//! Snapshots are best-effort. A failed snapshot write is logged and counted
//! (see [`TaskStoreState::snapshot_failures`]) but the write is still
//! acknowledged, so a restart after such a failure loses it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use taskboard_proto::store::{StoreReply, StoreRequest};
use taskboard_proto::table::TaskTable;
use taskboard_proto::task::Task;
use tokio::sync::RwLock;

/// Errors that can occur when loading a snapshot file.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Failed to read the snapshot file.
    #[error("failed to read snapshot {path}: {source}")]
    Read {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The snapshot file is not a valid task list.
    #[error("failed to parse snapshot {path}: {source}")]
    Parse {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

/// The store's authoritative task rows.
pub struct TaskStoreState {
    table: RwLock<TaskTable>,
    snapshot_path: Option<PathBuf>,
    snapshot_failures: AtomicU64,
}

impl Default for TaskStoreState {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStoreState {
    /// Creates an empty, memory-only store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: RwLock::new(TaskTable::new()),
            snapshot_path: None,
            snapshot_failures: AtomicU64::new(0),
        }
    }

    /// Opens a store mirrored to `path`, loading existing rows if the file exists.
    ///
    /// A missing file starts an empty store; it is created on the first write.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if the file exists but cannot be read or parsed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, SnapshotError> {
        let path = path.into();
        let table = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let rows: Vec<Task> =
                    serde_json::from_slice(&bytes).map_err(|source| SnapshotError::Parse {
                        path: path.clone(),
                        source,
                    })?;
                tracing::info!(path = %path.display(), count = rows.len(), "loaded task snapshot");
                TaskTable::from_rows(rows)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no snapshot yet, starting empty");
                TaskTable::new()
            }
            Err(source) => return Err(SnapshotError::Read { path, source }),
        };
        Ok(Self {
            table: RwLock::new(table),
            snapshot_path: Some(path),
            snapshot_failures: AtomicU64::new(0),
        })
    }

    /// Answers one request.
    pub async fn handle(&self, request: StoreRequest) -> StoreReply {
        if request.is_read() {
            let table = self.table.read().await;
            if let Some(reply) = request.query(&table) {
                return reply;
            }
        }

        let mut table = self.table.write().await;
        let reply = request.apply(&mut table);
        if !matches!(reply, StoreReply::Error { .. })
            && let Some(path) = &self.snapshot_path
        {
            // Written under the lock so snapshots land in mutation order.
            if let Err(e) = write_snapshot(path, &table).await {
                let failures = self.snapshot_failures.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::error!(
                    path = %path.display(),
                    error = %e,
                    failures,
                    "failed to write task snapshot, change is in memory only"
                );
            }
        }
        drop(table);
        reply
    }

    /// Snapshot writes that failed since the store was opened.
    ///
    /// Non-zero means the file on disk is behind the acknowledged state.
    pub fn snapshot_failures(&self) -> u64 {
        self.snapshot_failures.load(Ordering::Relaxed)
    }

    /// Number of rows currently stored.
    pub async fn len(&self) -> usize {
        self.table.read().await.len()
    }

    /// Whether the store holds no rows.
    pub async fn is_empty(&self) -> bool {
        self.table.read().await.is_empty()
    }
}

/// Serializes every row to `path` via a temporary file and rename.
async fn write_snapshot(path: &Path, table: &TaskTable) -> std::io::Result<()> {
    let mut rows: Vec<&Task> = table.rows().collect();
    rows.sort_by(|a, b| {
        (a.category, a.order_index, &a.id).cmp(&(b.category, b.order_index, &b.id))
    });
    let json = serde_json::to_vec_pretty(&rows).map_err(std::io::Error::other)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await
}

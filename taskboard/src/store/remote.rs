//! WebSocket client for the hosted task store.
//!
//! [`RemoteStore`] keeps one WebSocket connection to the store server and
//! multiplexes every call over it. Each request carries a fresh correlation
//! id; a background reader task hands each reply to the caller waiting on
//! that id, so any number of calls can be in flight at once.
//!
//! There is no reconnect. Once the connection is gone, pending calls fail and
//! every later call fails immediately.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use taskboard_proto::codec;
use taskboard_proto::store::{ReplyFrame, RequestFrame, StoreReply, StoreRequest};
use taskboard_proto::task::{Category, NewTask, Task, TaskFormData, TaskId};
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::{StoreError, TaskStore};

/// Type alias for the write half of a WebSocket connection.
type WsSender = futures_util::stream::SplitSink<
    WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;

/// Type alias for the read half of a WebSocket connection.
type WsReader =
    futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// Callers waiting for a reply, keyed by request id.
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<StoreReply>>>>;

/// Default timeout for connecting to the store server.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const CONNECTION_CLOSED: &str = "connection to task store closed";

/// Errors that can occur while connecting to the store server.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// The connection attempt did not finish in time.
    #[error("timed out connecting to task store at {0}")]
    Timeout(String),

    /// The server could not be reached or refused the upgrade.
    #[error("failed to connect to task store at {url}: {reason}")]
    Failed {
        /// URL that was attempted.
        url: String,
        /// What went wrong.
        reason: String,
    },
}

/// [`TaskStore`] backed by a WebSocket connection to the store server.
pub struct RemoteStore {
    /// The store server URL (ws:// or wss://).
    url: String,
    /// Write half of the WebSocket connection (shared for concurrent calls).
    ws_sender: AsyncMutex<WsSender>,
    /// Reply channels of in-flight calls.
    pending: Pending,
    /// Next correlation id.
    next_id: AtomicU64,
    /// Whether the WebSocket connection is still usable.
    connected: Arc<AtomicBool>,
    /// Background reader task routing replies to callers.
    reader_handle: tokio::task::JoinHandle<()>,
}

impl RemoteStore {
    /// Connects to the store server at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Timeout`] if the WebSocket handshake does not
    /// complete within `timeout`, or [`ConnectError::Failed`] otherwise.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, ConnectError> {
        let (ws_stream, _response) = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| {
                tracing::warn!(url, "store WebSocket connect timed out");
                ConnectError::Timeout(url.to_string())
            })?
            .map_err(|e| {
                tracing::warn!(url, err = %e, "store WebSocket connect failed");
                map_ws_connect_error(url, &e)
            })?;

        let (ws_sender, ws_reader) = ws_stream.split();
        let pending: Pending = Arc::default();
        let connected = Arc::new(AtomicBool::new(true));

        let reader_handle = tokio::spawn(reader_loop(
            ws_reader,
            Arc::clone(&pending),
            Arc::clone(&connected),
        ));

        tracing::info!(url, "connected to task store");

        Ok(Self {
            url: url.to_string(),
            ws_sender: AsyncMutex::new(ws_sender),
            pending,
            next_id: AtomicU64::new(1),
            connected,
            reader_handle,
        })
    }

    /// The server URL this store is connected to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether the connection is still open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Sends a close frame; later calls fail.
    pub async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let mut sender = self.ws_sender.lock().await;
        if let Err(e) = sender.send(Message::Close(None)).await {
            tracing::debug!(err = %e, "close frame not sent");
        }
    }

    /// Sends one request and waits for its reply.
    ///
    /// Error replies and connection loss come back as the error message.
    async fn call(&self, request: StoreRequest) -> Result<StoreReply, String> {
        if !self.is_connected() {
            return Err(CONNECTION_CLOSED.to_string());
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let op = request.name();
        let bytes = codec::encode(&RequestFrame { id, request }).map_err(|e| e.to_string())?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);
        // The reader clears `connected` before draining `pending`, so a waiter
        // registered while still connected is always woken.
        if !self.is_connected() {
            self.pending.lock().remove(&id);
            return Err(CONNECTION_CLOSED.to_string());
        }

        tracing::trace!(request_id = id, op, "sending store request");
        let sent = self
            .ws_sender
            .lock()
            .await
            .send(Message::Binary(bytes.into()))
            .await;
        if let Err(e) = sent {
            tracing::warn!(request_id = id, op, err = %e, "store send failed");
            self.pending.lock().remove(&id);
            self.connected.store(false, Ordering::SeqCst);
            return Err(CONNECTION_CLOSED.to_string());
        }

        match rx.await {
            Ok(StoreReply::Error { reason }) => Err(reason),
            Ok(reply) => Ok(reply),
            Err(_) => Err(CONNECTION_CLOSED.to_string()),
        }
    }

    async fn fetch(&self, request: StoreRequest) -> Result<StoreReply, StoreError> {
        self.call(request).await.map_err(StoreError::Fetch)
    }

    async fn write(&self, request: StoreRequest) -> Result<StoreReply, StoreError> {
        self.call(request).await.map_err(StoreError::Write)
    }
}

impl Drop for RemoteStore {
    fn drop(&mut self) {
        self.reader_handle.abort();
    }
}

fn unexpected(reply: &StoreReply) -> String {
    format!("unexpected reply from task store: {reply:?}")
}

impl TaskStore for RemoteStore {
    async fn list(&self, category: Category) -> Result<Vec<Task>, StoreError> {
        match self.fetch(StoreRequest::List { category }).await? {
            StoreReply::Tasks(tasks) => Ok(tasks),
            other => Err(StoreError::Fetch(unexpected(&other))),
        }
    }

    async fn max_order_index(&self, category: Category) -> Result<Option<i64>, StoreError> {
        match self.fetch(StoreRequest::MaxOrderIndex { category }).await? {
            StoreReply::MaxOrderIndex(max) => Ok(max),
            other => Err(StoreError::Fetch(unexpected(&other))),
        }
    }

    async fn insert(&self, task: NewTask) -> Result<Task, StoreError> {
        match self.write(StoreRequest::Insert(task)).await? {
            StoreReply::Task(task) => Ok(task),
            other => Err(StoreError::Write(unexpected(&other))),
        }
    }

    async fn update(&self, id: &TaskId, form: TaskFormData) -> Result<Task, StoreError> {
        let request = StoreRequest::Update {
            id: id.clone(),
            form,
        };
        match self.write(request).await? {
            StoreReply::Task(task) => Ok(task),
            other => Err(StoreError::Write(unexpected(&other))),
        }
    }

    async fn update_order_index(&self, id: &TaskId, order_index: i64) -> Result<Task, StoreError> {
        let request = StoreRequest::UpdateOrderIndex {
            id: id.clone(),
            order_index,
        };
        match self.write(request).await? {
            StoreReply::Task(task) => Ok(task),
            other => Err(StoreError::Write(unexpected(&other))),
        }
    }

    async fn delete(&self, id: &TaskId) -> Result<(), StoreError> {
        match self.write(StoreRequest::Delete { id: id.clone() }).await? {
            StoreReply::Deleted => Ok(()),
            other => Err(StoreError::Write(unexpected(&other))),
        }
    }
}

/// Background task that reads reply frames and wakes their callers.
///
/// Malformed frames and replies for unknown ids are logged and skipped.
/// On exit, marks the connection closed and drops every pending reply
/// channel so that waiting callers fail instead of hanging.
async fn reader_loop(mut ws_reader: WsReader, pending: Pending, connected: Arc<AtomicBool>) {
    while let Some(msg_result) = ws_reader.next().await {
        match msg_result {
            Ok(Message::Binary(data)) => match codec::decode::<ReplyFrame>(&data) {
                Ok(ReplyFrame { id, reply }) => {
                    let waiter = pending.lock().remove(&id);
                    match waiter {
                        Some(tx) => {
                            let _ = tx.send(reply);
                        }
                        None => tracing::debug!(request_id = id, "reply for unknown request"),
                    }
                }
                Err(e) => {
                    tracing::warn!(err = %e, "malformed store frame, skipping");
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!("store WebSocket closed by server");
                break;
            }
            Ok(_) => {
                // Ignore ping/pong/text/raw frames.
            }
            Err(e) => {
                tracing::warn!(err = %e, "store WebSocket read error");
                break;
            }
        }
    }
    connected.store(false, Ordering::SeqCst);
    let orphaned = pending.lock().drain().count();
    tracing::info!(orphaned, "store reader task exiting");
}

/// Map a `tokio_tungstenite` connection error to a [`ConnectError`].
fn map_ws_connect_error(url: &str, err: &tokio_tungstenite::tungstenite::Error) -> ConnectError {
    use tokio_tungstenite::tungstenite::Error as WsError;
    let reason = match err {
        WsError::Http(response) => format!("HTTP status {}", response.status()),
        WsError::Tls(_) => format!("TLS error: {err}"),
        other => other.to_string(),
    };
    ConnectError::Failed {
        url: url.to_string(),
        reason,
    }
}

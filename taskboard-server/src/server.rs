//! Store server core: WebSocket handler and request dispatch.
//!
//! Each connection gets a reader loop and a writer task. Every decoded
//! [`RequestFrame`] is answered on its own task so that a client's batch of
//! concurrent requests (e.g. a reorder) is served concurrently; replies are
//! funnelled through a channel to the single writer.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use taskboard_proto::codec;
use taskboard_proto::store::{ReplyFrame, RequestFrame};
use tokio::sync::mpsc;

use crate::store::TaskStoreState;

/// Errors that can occur when starting the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Binding the TCP listener failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was attempted.
        addr: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Handles an upgraded WebSocket connection for a single client.
///
/// The connection lifecycle:
/// 1. Spawn a writer task draining the reply channel into the socket.
/// 2. Read binary frames, answering each request on a spawned task.
/// 3. On close or error, stop both halves.
pub async fn handle_socket(socket: WebSocket, state: Arc<TaskStoreState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    tracing::info!("store client connected");

    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                tracing::warn!("WebSocket write failed");
                break;
            }
        }
    });

    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Binary(data) => {
                    dispatch_frame(&data, &state, &tx);
                }
                Message::Close(_) => {
                    tracing::info!("received close frame");
                    break;
                }
                _ => {
                    // Ignore text, ping, pong frames.
                }
            }
        }
    });

    tokio::select! {
        _ = &mut read_task => {
            write_task.abort();
        }
        _ = &mut write_task => {
            read_task.abort();
        }
    }

    tracing::info!("store client disconnected");
}

/// Decodes one request frame and answers it on a spawned task.
///
/// Undecodable frames are logged and skipped; the connection stays open.
fn dispatch_frame(data: &[u8], state: &Arc<TaskStoreState>, tx: &mpsc::UnboundedSender<Message>) {
    let frame: RequestFrame = match codec::decode(data) {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!(error = %e, "failed to decode request frame, skipping");
            return;
        }
    };

    let state = Arc::clone(state);
    let tx = tx.clone();
    tokio::spawn(async move {
        let RequestFrame { id, request } = frame;
        let op = request.name();
        tracing::debug!(request_id = id, op, "handling store request");

        let reply = state.handle(request).await;
        match codec::encode(&ReplyFrame { id, reply }) {
            Ok(bytes) => {
                if tx.send(Message::Binary(bytes.into())).is_err() {
                    tracing::debug!(request_id = id, op, "client gone before reply");
                }
            }
            Err(e) => {
                tracing::error!(request_id = id, op, error = %e, "failed to encode reply");
            }
        }
    });
}

/// axum handler that upgrades an HTTP request to a WebSocket connection.
async fn ws_handler(
    ws: axum::extract::ws::WebSocketUpgrade,
    axum::extract::State(state): axum::extract::State<Arc<TaskStoreState>>,
) -> impl axum::response::IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Starts the store server with an empty in-memory table.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<(std::net::SocketAddr, tokio::task::JoinHandle<()>), ServerError> {
    start_server_with_state(addr, Arc::new(TaskStoreState::new())).await
}

/// Starts the store server over a pre-built [`TaskStoreState`].
///
/// Returns the bound address and the join handle of the serving task.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<TaskStoreState>,
) -> Result<(std::net::SocketAddr, tokio::task::JoinHandle<()>), ServerError> {
    let app = axum::Router::new()
        .route("/ws", axum::routing::get(ws_handler))
        .with_state(state);

    let bind_err = |source| ServerError::Bind {
        addr: addr.to_string(),
        source,
    };
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(bind_err)?;
    let bound_addr = listener.local_addr().map_err(bind_err)?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "store server error");
        }
    });

    Ok((bound_addr, handle))
}

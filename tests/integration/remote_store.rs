//! Integration tests for the WebSocket task store client.
//!
//! Validates the client against the in-process store server:
//! - Every operation round-trips with the server's table semantics
//! - Concurrent calls share one connection and each get their own reply
//! - Calls waiting on a connection that goes away fail instead of hanging

use std::time::Duration;

use futures_util::StreamExt;
use taskboard::store::remote::{ConnectError, DEFAULT_CONNECT_TIMEOUT, RemoteStore};
use taskboard::store::{StoreError, TaskStore};
use taskboard_proto::task::{Category, NewTask, TaskFormData, TaskId};

/// Start the store server in-process and return a ws:// URL.
async fn start_store() -> (String, tokio::task::JoinHandle<()>) {
    let (addr, handle) = taskboard_server::server::start_server("127.0.0.1:0")
        .await
        .expect("failed to start store server");
    let url = format!("ws://{addr}/ws");
    (url, handle)
}

async fn connect(url: &str) -> RemoteStore {
    RemoteStore::connect(url, DEFAULT_CONNECT_TIMEOUT)
        .await
        .expect("failed to connect to store")
}

fn new_task(category: Category, title: &str, order_index: i64) -> NewTask {
    NewTask {
        category,
        title: title.to_string(),
        description: None,
        order_index,
    }
}

// =============================================================================
// Operation round trips
// =============================================================================

#[tokio::test]
async fn insert_list_and_max_order_index() {
    let (url, _handle) = start_store().await;
    let store = connect(&url).await;

    let second = store.insert(new_task(Category::Work, "second", 5)).await.unwrap();
    let first = store.insert(new_task(Category::Work, "first", 2)).await.unwrap();
    store.insert(new_task(Category::Life, "elsewhere", 9)).await.unwrap();

    let listed = store.list(Category::Work).await.unwrap();
    assert_eq!(listed, vec![first, second]);
    assert_eq!(store.max_order_index(Category::Work).await.unwrap(), Some(5));
    assert_eq!(store.max_order_index(Category::Study).await.unwrap(), None);
}

#[tokio::test]
async fn update_and_update_order_index_bump_updated_at() {
    let (url, _handle) = start_store().await;
    let store = connect(&url).await;
    let task = store.insert(new_task(Category::Study, "read", 0)).await.unwrap();

    let edited = store
        .update(&task.id, TaskFormData::new("read ch. 4", Some("pages 80-120".into())))
        .await
        .unwrap();
    assert_eq!(edited.title, "read ch. 4");
    assert_eq!(edited.created_at, task.created_at);
    assert!(edited.updated_at >= task.updated_at);

    let moved = store.update_order_index(&task.id, 3).await.unwrap();
    assert_eq!(moved.order_index, 3);
    assert_eq!(moved.title, "read ch. 4");
}

#[tokio::test]
async fn delete_then_delete_again_fails() {
    let (url, _handle) = start_store().await;
    let store = connect(&url).await;
    let task = store.insert(new_task(Category::Life, "call mom", 0)).await.unwrap();

    store.delete(&task.id).await.unwrap();
    assert!(store.list(Category::Life).await.unwrap().is_empty());

    let err = store.delete(&task.id).await.unwrap_err();
    assert_eq!(err, StoreError::Write(format!("task not found: {}", task.id)));
}

#[tokio::test]
async fn server_rejects_blank_title() {
    let (url, _handle) = start_store().await;
    let store = connect(&url).await;

    let err = store
        .insert(new_task(Category::Work, "  ", 0))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        StoreError::Write("task title cannot be empty".to_string())
    );
}

#[tokio::test]
async fn two_clients_see_the_same_table() {
    let (url, _handle) = start_store().await;
    let writer = connect(&url).await;
    let reader = connect(&url).await;

    let task = writer.insert(new_task(Category::Work, "shared", 0)).await.unwrap();

    assert_eq!(reader.list(Category::Work).await.unwrap(), vec![task]);
}

// =============================================================================
// Multiplexing
// =============================================================================

#[tokio::test]
async fn concurrent_calls_get_their_own_replies() {
    let (url, _handle) = start_store().await;
    let store = connect(&url).await;

    let inserts = (0..20).map(|i| {
        let store = &store;
        async move {
            store
                .insert(new_task(Category::Study, &format!("task {i}"), i))
                .await
        }
    });
    let created = futures_util::future::join_all(inserts).await;

    for (i, result) in (0_i64..).zip(created) {
        let task = result.unwrap();
        assert_eq!(task.title, format!("task {i}"));
        assert_eq!(task.order_index, i);
    }
    assert_eq!(store.list(Category::Study).await.unwrap().len(), 20);
}

#[tokio::test]
async fn concurrent_order_updates_all_land() {
    let (url, _handle) = start_store().await;
    let store = connect(&url).await;
    let mut tasks = Vec::new();
    for i in 0..5 {
        tasks.push(store.insert(new_task(Category::Work, &format!("t{i}"), i)).await.unwrap());
    }
    tasks.reverse();

    taskboard::tasks::persist_order(&store, &tasks).await.unwrap();

    let listed = store.list(Category::Work).await.unwrap();
    let titles: Vec<&str> = listed.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, ["t4", "t3", "t2", "t1", "t0"]);
}

// =============================================================================
// Connection loss
// =============================================================================

#[tokio::test]
async fn connect_to_nothing_fails() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = RemoteStore::connect(&format!("ws://{addr}/ws"), Duration::from_secs(2)).await;
    assert!(matches!(result, Err(ConnectError::Failed { .. })));
}

#[tokio::test]
async fn pending_call_fails_when_server_goes_away() {
    // A server that accepts one request and then hangs up without replying.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        let _request = ws.next().await;
        drop(ws);
    });

    let store = connect(&format!("ws://{addr}/ws")).await;
    let result = tokio::time::timeout(Duration::from_secs(5), store.list(Category::Work))
        .await
        .expect("pending call hung after disconnect");

    assert!(matches!(result, Err(StoreError::Fetch(_))));
    server.await.unwrap();

    // Later calls fail right away.
    let result = tokio::time::timeout(
        Duration::from_secs(1),
        store.delete(&TaskId::new()),
    )
    .await
    .expect("call after disconnect hung");
    assert!(matches!(result, Err(StoreError::Write(_))));
    assert!(!store.is_connected());
}

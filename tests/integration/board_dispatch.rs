//! Integration tests for dispatching board commands onto background tasks.
//!
//! Each dispatched command runs one manager operation and reports exactly one
//! event per affected category; failures carry the same message the category
//! shows as its error line.

use std::sync::Arc;
use std::time::Duration;

use taskboard::board::{BoardAction, BoardCommand, BoardEvent, TaskBoard};
use taskboard::store::memory::MemoryStore;
use taskboard_proto::task::{Category, TaskFormData, TaskId};
use tokio::sync::mpsc;

fn setup() -> (Arc<MemoryStore>, TaskBoard<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let board = TaskBoard::new(Arc::clone(&store), 256);
    (store, board)
}

async fn next_event(rx: &mut mpsc::Receiver<BoardEvent>) -> BoardEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for board event")
        .expect("event channel closed")
}

#[tokio::test]
async fn refresh_all_reports_each_category() {
    let (store, board) = setup();
    store.seed(Category::Work, &["w"]);
    store.seed(Category::Life, &["l1", "l2"]);
    let (tx, mut rx) = mpsc::channel(8);

    board.dispatch(BoardCommand::RefreshAll, &tx);

    let mut seen = Vec::new();
    for _ in 0..3 {
        let event = next_event(&mut rx).await;
        assert_eq!(event.action, BoardAction::Refresh);
        assert_eq!(event.outcome, Ok(()));
        seen.push(event.category);
    }
    seen.sort();
    assert_eq!(seen, Category::ALL);
    assert_eq!(board.snapshot(Category::Life).tasks.len(), 2);
}

#[tokio::test]
async fn add_runs_on_the_target_category() {
    let (store, board) = setup();
    let (tx, mut rx) = mpsc::channel(8);

    board.dispatch(
        BoardCommand::Add {
            category: Category::Study,
            form: TaskFormData::new("flashcards", None),
            ticket: 7,
        },
        &tx,
    );

    let event = next_event(&mut rx).await;
    assert_eq!(
        event,
        BoardEvent {
            category: Category::Study,
            action: BoardAction::Add,
            outcome: Ok(()),
            ticket: Some(7),
        }
    );
    assert_eq!(store.peek(Category::Study).len(), 1);
    assert_eq!(board.snapshot(Category::Study).tasks[0].title, "flashcards");
    assert!(board.snapshot(Category::Work).tasks.is_empty());
}

#[tokio::test]
async fn failure_message_matches_category_error_line() {
    let (_, board) = setup();
    let (tx, mut rx) = mpsc::channel(8);

    board.dispatch(
        BoardCommand::Delete {
            category: Category::Work,
            id: TaskId::new(),
        },
        &tx,
    );

    let event = next_event(&mut rx).await;
    assert_eq!(event.action, BoardAction::Delete);
    let message = event.outcome.unwrap_err();
    assert!(message.starts_with("failed to save changes: task not found"));
    assert_eq!(board.snapshot(Category::Work).error, Some(message));
}

#[tokio::test]
async fn move_command_reorders_and_persists() {
    let (store, board) = setup();
    let seeded = store.seed(Category::Life, &["a", "b", "c"]);
    board.manager(Category::Life).refresh().await.unwrap();
    let (tx, mut rx) = mpsc::channel(8);

    board.dispatch(
        BoardCommand::Move {
            category: Category::Life,
            active: seeded[0].id.clone(),
            over: seeded[2].id.clone(),
        },
        &tx,
    );

    let event = next_event(&mut rx).await;
    assert_eq!(event.action, BoardAction::Reorder);
    assert_eq!(event.outcome, Ok(()));
    let titles: Vec<String> = store
        .peek(Category::Life)
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, ["b", "c", "a"]);
}

#[tokio::test]
async fn full_reorder_command_with_stale_list_is_rejected() {
    let (store, board) = setup();
    let seeded = store.seed(Category::Work, &["a", "b"]);
    board.manager(Category::Work).refresh().await.unwrap();
    let (tx, mut rx) = mpsc::channel(8);

    board.dispatch(
        BoardCommand::Reorder {
            category: Category::Work,
            tasks: vec![seeded[1].clone()],
        },
        &tx,
    );

    let event = next_event(&mut rx).await;
    let message = event.outcome.unwrap_err();
    assert!(message.starts_with("invalid reorder"));
    assert_eq!(store.calls().update_order_index, 0);
}

#[tokio::test]
async fn dropped_receiver_does_not_stop_operations() {
    let (store, board) = setup();
    let (tx, rx) = mpsc::channel(1);
    drop(rx);

    board.dispatch(
        BoardCommand::Add {
            category: Category::Work,
            form: TaskFormData::new("still saved", None),
            ticket: 1,
        },
        &tx,
    );

    let mut state = board.manager(Category::Work).subscribe();
    tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| !s.tasks.is_empty()),
    )
    .await
    .expect("add never finished")
    .expect("manager dropped");
    assert_eq!(store.peek(Category::Work).len(), 1);
}

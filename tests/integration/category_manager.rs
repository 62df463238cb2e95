//! Integration tests for the category task manager.
//!
//! Covers the observable behavior of one category's list:
//! - Refresh ordering and category scoping
//! - Add: validation, next order index, store failures
//! - Update and delete, including unknown ids
//! - Optimistic reordering, its settled state, and recovery after a rejected write
//! - Drag-and-drop moves, including drops that change nothing

use std::sync::Arc;
use std::time::Duration;

use taskboard::store::memory::MemoryStore;
use taskboard::store::remote::{DEFAULT_CONNECT_TIMEOUT, RemoteStore};
use taskboard::store::{StoreError, TaskStore};
use taskboard::tasks::{CategoryTaskManager, LoadStatus, TaskError};
use taskboard_proto::task::{Category, Task, TaskFormData, TaskId};

fn setup(category: Category) -> (Arc<MemoryStore>, CategoryTaskManager<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let manager = CategoryTaskManager::new(category, Arc::clone(&store));
    (store, manager)
}

fn titles(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|t| t.title.as_str()).collect()
}

fn indices(tasks: &[Task]) -> Vec<i64> {
    tasks.iter().map(|t| t.order_index).collect()
}

/// Wait until the manager publishes a state satisfying `pred`.
async fn wait_for<S: TaskStore>(
    manager: &CategoryTaskManager<S>,
    pred: impl Fn(&taskboard::tasks::CategoryState) -> bool,
) {
    let mut rx = manager.subscribe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| pred(s)))
        .await
        .expect("timed out waiting for state")
        .expect("manager dropped");
}

// =============================================================================
// Refresh
// =============================================================================

#[tokio::test]
async fn refresh_returns_tasks_sorted_by_order_index() {
    let (store, manager) = setup(Category::Study);
    let seeded = store.seed(Category::Study, &["a", "b", "c"]);
    // Scramble the stored order behind the manager's back.
    store.update_order_index(&seeded[0].id, 7).await.unwrap();
    store.update_order_index(&seeded[2].id, -1).await.unwrap();

    manager.refresh().await.unwrap();

    let state = manager.snapshot();
    assert_eq!(titles(&state.tasks), ["c", "b", "a"]);
    assert!(state.tasks.windows(2).all(|w| w[0].order_index <= w[1].order_index));
}

#[tokio::test]
async fn each_category_is_loaded_independently() {
    let store = Arc::new(MemoryStore::new());
    store.seed(Category::Work, &["w1", "w2"]);
    store.seed(Category::Life, &["l1"]);

    for (category, expected) in [
        (Category::Work, vec!["w1", "w2"]),
        (Category::Study, vec![]),
        (Category::Life, vec!["l1"]),
    ] {
        let manager = CategoryTaskManager::new(category, Arc::clone(&store));
        manager.refresh().await.unwrap();
        let state = manager.snapshot();
        assert_eq!(titles(&state.tasks), expected);
        assert!(state.tasks.iter().all(|t| t.category == category));
    }
}

// =============================================================================
// Add
// =============================================================================

#[tokio::test]
async fn add_with_blank_title_makes_no_store_call() {
    let (store, manager) = setup(Category::Work);

    for title in ["", "   ", "\t\n"] {
        let err = manager
            .add(TaskFormData::new(title, Some("details".into())))
            .await
            .unwrap_err();
        assert_eq!(err, TaskError::TitleEmpty);
        assert_eq!(
            manager.snapshot().error.as_deref(),
            Some("task title cannot be empty")
        );
    }

    assert_eq!(store.calls().total(), 0);
    assert!(store.peek(Category::Work).is_empty());
}

#[tokio::test]
async fn add_to_empty_category_uses_index_zero() {
    let (_, manager) = setup(Category::Life);
    let task = manager.add(TaskFormData::new("water plants", None)).await.unwrap();
    assert_eq!(task.order_index, 0);
    assert_eq!(task.category, Category::Life);
}

#[tokio::test]
async fn add_appends_after_current_max() {
    let (store, manager) = setup(Category::Work);
    let seeded = store.seed(Category::Work, &["a", "b"]);
    store.update_order_index(&seeded[1].id, 41).await.unwrap();
    // Another category's larger indices do not matter.
    let other = store.seed(Category::Study, &["s"]);
    store.update_order_index(&other[0].id, 100).await.unwrap();

    let task = manager.add(TaskFormData::new("c", None)).await.unwrap();

    assert_eq!(task.order_index, 42);
    let state = manager.snapshot();
    assert_eq!(state.status, LoadStatus::Ready);
    assert_eq!(titles(&state.tasks), ["a", "b", "c"]);
}

#[tokio::test]
async fn add_failure_keeps_list_and_records_error() {
    let (store, manager) = setup(Category::Work);
    store.seed(Category::Work, &["a"]);
    manager.refresh().await.unwrap();
    let before = manager.snapshot().tasks;

    store.set_write_failure(Some("quota exceeded"));
    let err = manager.add(TaskFormData::new("b", None)).await.unwrap_err();

    assert_eq!(err, TaskError::Store(StoreError::Write("quota exceeded".into())));
    let state = manager.snapshot();
    assert_eq!(state.tasks, before);
    assert_eq!(
        state.error.as_deref(),
        Some("failed to save changes: quota exceeded")
    );
}

#[tokio::test]
async fn add_aborts_when_max_index_cannot_be_read() {
    let (store, manager) = setup(Category::Study);
    store.set_read_failure(Some("timeout"));

    let err = manager.add(TaskFormData::new("x", None)).await.unwrap_err();

    assert_eq!(err, TaskError::Store(StoreError::Fetch("timeout".into())));
    assert_eq!(store.calls().insert, 0);
}

// =============================================================================
// Update and delete
// =============================================================================

#[tokio::test]
async fn update_changes_fields_and_keeps_position() {
    let (store, manager) = setup(Category::Work);
    let seeded = store.seed(Category::Work, &["a", "b"]);
    manager.refresh().await.unwrap();

    let updated = manager
        .update(
            &seeded[1].id,
            TaskFormData::new(" b2 ", Some(" notes ".into())),
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "b2");
    assert_eq!(updated.description.as_deref(), Some("notes"));
    assert_eq!(updated.order_index, 1);
    assert!(updated.updated_at >= seeded[1].updated_at);
    assert_eq!(titles(&manager.snapshot().tasks), ["a", "b2"]);
}

#[tokio::test]
async fn update_unknown_id_is_a_write_error() {
    let (store, manager) = setup(Category::Work);
    store.seed(Category::Work, &["a"]);
    manager.refresh().await.unwrap();

    let err = manager
        .update(&TaskId::new(), TaskFormData::new("x", None))
        .await
        .unwrap_err();

    assert!(matches!(err, TaskError::Store(StoreError::Write(_))));
    assert_eq!(titles(&manager.snapshot().tasks), ["a"]);
}

#[tokio::test]
async fn delete_removes_task() {
    let (store, manager) = setup(Category::Life);
    let seeded = store.seed(Category::Life, &["a", "b", "c"]);
    manager.refresh().await.unwrap();

    manager.delete(&seeded[1].id).await.unwrap();

    assert_eq!(titles(&manager.snapshot().tasks), ["a", "c"]);
    assert_eq!(store.peek(Category::Life).len(), 2);
}

#[tokio::test]
async fn delete_unknown_id_reports_write_error_and_keeps_list() {
    let (store, manager) = setup(Category::Work);
    store.seed(Category::Work, &["a", "b"]);
    manager.refresh().await.unwrap();
    let before = manager.snapshot().tasks;

    let missing = TaskId::new();
    let err = manager.delete(&missing).await.unwrap_err();

    assert_eq!(
        err,
        TaskError::Store(StoreError::Write(format!("task not found: {missing}")))
    );
    let state = manager.snapshot();
    assert_eq!(state.tasks, before);
    assert!(state.error.is_some());
}

// =============================================================================
// Reorder
// =============================================================================

#[tokio::test]
async fn reorder_is_visible_before_store_confirms() {
    let (store, manager) = setup(Category::Work);
    let seeded = store.seed(Category::Work, &["t1", "t2", "t3"]);
    manager.refresh().await.unwrap();

    let hold = store.hold_writes().await;
    let new_order = vec![seeded[1].clone(), seeded[0].clone(), seeded[2].clone()];
    let reorder = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.reorder(new_order).await })
    };

    wait_for(&manager, |s| titles(&s.tasks) == ["t2", "t1", "t3"]).await;
    // Nothing has reached the store yet.
    assert_eq!(titles(&store.peek(Category::Work)), ["t1", "t2", "t3"]);
    assert_eq!(indices(&manager.snapshot().tasks), [0, 1, 2]);

    hold.release();
    reorder.await.unwrap().unwrap();

    let state = manager.snapshot();
    assert_eq!(state.status, LoadStatus::Ready);
    assert!(state.error.is_none());
    assert_eq!(titles(&state.tasks), ["t2", "t1", "t3"]);
    assert_eq!(indices(&state.tasks), [0, 1, 2]);
    assert_eq!(titles(&store.peek(Category::Work)), ["t2", "t1", "t3"]);
    assert_eq!(indices(&store.peek(Category::Work)), [0, 1, 2]);
}

#[tokio::test]
async fn successful_reorder_does_not_refetch() {
    let (store, manager) = setup(Category::Study);
    let seeded = store.seed(Category::Study, &["a", "b"]);
    manager.refresh().await.unwrap();
    let lists_before = store.calls().list;

    manager
        .reorder(vec![seeded[1].clone(), seeded[0].clone()])
        .await
        .unwrap();

    assert_eq!(store.calls().list, lists_before);
    assert_eq!(store.calls().update_order_index, 2);
}

#[tokio::test]
async fn failed_reorder_recovers_store_order_and_reports_error() {
    let (store, manager) = setup(Category::Work);
    let seeded = store.seed(Category::Work, &["t1", "t2", "t3", "t4"]);
    manager.refresh().await.unwrap();
    store.fail_order_update_for(&seeded[0].id);

    // t1 moves to the end; its write is rejected, the others land.
    let new_order = vec![
        seeded[1].clone(),
        seeded[2].clone(),
        seeded[3].clone(),
        seeded[0].clone(),
    ];
    let err = manager.reorder(new_order).await.unwrap_err();

    assert_eq!(
        err,
        TaskError::Store(StoreError::Write(format!(
            "order update rejected for {}",
            seeded[0].id
        )))
    );
    let state = manager.snapshot();
    assert_eq!(state.tasks, store.peek(Category::Work));
    assert_eq!(state.error, Some(err.to_string()));
    assert_eq!(store.calls().update_order_index, 4);
}

#[tokio::test]
async fn reorder_with_wrong_members_is_rejected_without_store_calls() {
    let (store, manager) = setup(Category::Work);
    let seeded = store.seed(Category::Work, &["a", "b"]);
    let foreign = store.seed(Category::Life, &["z"]);
    manager.refresh().await.unwrap();
    let calls_before = store.calls();

    let err = manager
        .reorder(vec![seeded[0].clone(), foreign[0].clone()])
        .await
        .unwrap_err();

    assert!(matches!(err, TaskError::InvalidReorder(_)));
    assert_eq!(store.calls(), calls_before);
    assert_eq!(titles(&manager.snapshot().tasks), ["a", "b"]);
}

#[tokio::test]
async fn unchanged_order_makes_no_store_calls() {
    let (store, manager) = setup(Category::Life);

    // Empty list.
    manager.refresh().await.unwrap();
    let calls_before = store.calls();
    manager.reorder(Vec::new()).await.unwrap();
    assert_eq!(store.calls(), calls_before);

    // Single task.
    store.seed(Category::Life, &["only"]);
    manager.refresh().await.unwrap();
    let calls_before = store.calls();
    manager.reorder(manager.snapshot().tasks).await.unwrap();
    assert_eq!(store.calls(), calls_before);
}

// =============================================================================
// Drag and drop
// =============================================================================

#[tokio::test]
async fn drop_onto_itself_makes_no_store_calls() {
    let (store, manager) = setup(Category::Work);
    let seeded = store.seed(Category::Work, &["a", "b", "c"]);
    manager.refresh().await.unwrap();
    let calls_before = store.calls();

    manager.move_task(&seeded[1].id, &seeded[1].id).await.unwrap();

    assert_eq!(store.calls(), calls_before);
    assert_eq!(titles(&manager.snapshot().tasks), ["a", "b", "c"]);
}

#[tokio::test]
async fn no_op_drops_keep_previous_refresh_error() {
    let (store, manager) = setup(Category::Work);
    let seeded = store.seed(Category::Work, &["a", "b"]);
    manager.refresh().await.unwrap();
    store.set_read_failure(Some("down"));
    assert!(manager.refresh().await.is_err());
    store.clear_faults();

    let before = manager.snapshot();
    let mut rx = manager.subscribe();
    rx.mark_unchanged();

    manager.move_task(&seeded[0].id, &seeded[0].id).await.unwrap();
    manager.move_task(&TaskId::new(), &seeded[1].id).await.unwrap();
    manager.reorder(before.tasks.clone()).await.unwrap();

    assert_eq!(manager.snapshot(), before);
    assert_eq!(before.status, LoadStatus::Error);
    assert_eq!(before.error.as_deref(), Some("failed to load tasks: down"));
    assert!(!rx.has_changed().unwrap());
}

#[tokio::test]
async fn drop_moves_task_to_target_position() {
    let (store, manager) = setup(Category::Study);
    let seeded = store.seed(Category::Study, &["a", "b", "c", "d"]);
    manager.refresh().await.unwrap();

    manager.move_task(&seeded[3].id, &seeded[1].id).await.unwrap();

    assert_eq!(titles(&manager.snapshot().tasks), ["a", "d", "b", "c"]);
    assert_eq!(titles(&store.peek(Category::Study)), ["a", "d", "b", "c"]);
    assert_eq!(indices(&store.peek(Category::Study)), [0, 1, 2, 3]);
}

// =============================================================================
// End to end over the store server
// =============================================================================

#[tokio::test]
async fn manager_over_remote_store() {
    let (addr, _handle) = taskboard_server::server::start_server("127.0.0.1:0")
        .await
        .expect("failed to start store server");
    let store = RemoteStore::connect(&format!("ws://{addr}/ws"), DEFAULT_CONNECT_TIMEOUT)
        .await
        .unwrap();
    let manager = CategoryTaskManager::new(Category::Work, Arc::new(store));

    let a = manager.add(TaskFormData::new("a", None)).await.unwrap();
    let b = manager.add(TaskFormData::new("b", None)).await.unwrap();
    let c = manager.add(TaskFormData::new("c", None)).await.unwrap();
    assert_eq!([a.order_index, b.order_index, c.order_index], [0, 1, 2]);

    manager.move_task(&c.id, &a.id).await.unwrap();
    manager.refresh().await.unwrap();
    assert_eq!(titles(&manager.snapshot().tasks), ["c", "a", "b"]);
    assert_eq!(indices(&manager.snapshot().tasks), [0, 1, 2]);

    manager.delete(&a.id).await.unwrap();
    assert_eq!(titles(&manager.snapshot().tasks), ["c", "b"]);
}

//! Property-based tests for the store table and wire codec.
//!
//! Uses proptest to verify:
//! 1. Listing a category is always sorted by `order_index`, whatever
//!    sequence of inserts, moves and deletes produced the table.
//! 2. Listing never leaks rows from another category.
//! 3. Random bytes never cause a panic when decoded as a frame.

use proptest::prelude::*;
use taskboard_proto::codec;
use taskboard_proto::store::{ReplyFrame, RequestFrame};
use taskboard_proto::table::TaskTable;
use taskboard_proto::task::{Category, NewTask};

/// A table mutation drawn by proptest.
#[derive(Debug, Clone)]
enum Op {
    Insert { category: Category, order_index: i64 },
    Move { slot: usize, order_index: i64 },
    Delete { slot: usize },
}

fn arb_category() -> impl Strategy<Value = Category> {
    prop_oneof![
        Just(Category::Work),
        Just(Category::Study),
        Just(Category::Life)
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (arb_category(), -50i64..50).prop_map(|(category, order_index)| Op::Insert {
            category,
            order_index
        }),
        (any::<usize>(), -50i64..50).prop_map(|(slot, order_index)| Op::Move { slot, order_index }),
        any::<usize>().prop_map(|slot| Op::Delete { slot }),
    ]
}

/// Picks an existing row id by a random slot, if the table has rows.
fn pick(table: &TaskTable, slot: usize) -> Option<taskboard_proto::task::TaskId> {
    let mut ids: Vec<_> = table.rows().map(|t| t.id.clone()).collect();
    ids.sort();
    if ids.is_empty() {
        None
    } else {
        Some(ids[slot % ids.len()].clone())
    }
}

proptest! {
    #[test]
    fn list_is_sorted_and_scoped(ops in prop::collection::vec(arb_op(), 0..64)) {
        let mut table = TaskTable::new();
        for op in ops {
            match op {
                Op::Insert { category, order_index } => {
                    let inserted = table.insert(NewTask {
                        category,
                        title: "task".to_string(),
                        description: None,
                        order_index,
                    });
                    prop_assert!(inserted.is_ok());
                }
                Op::Move { slot, order_index } => {
                    if let Some(id) = pick(&table, slot) {
                        prop_assert!(table.update_order_index(&id, order_index).is_ok());
                    }
                }
                Op::Delete { slot } => {
                    if let Some(id) = pick(&table, slot) {
                        prop_assert!(table.delete(&id).is_ok());
                    }
                }
            }
        }

        let mut seen = 0;
        for category in Category::ALL {
            let tasks = table.list(category);
            seen += tasks.len();
            prop_assert!(tasks.iter().all(|t| t.category == category));
            prop_assert!(tasks.windows(2).all(|w| w[0].order_index <= w[1].order_index));
            prop_assert_eq!(
                table.max_order_index(category),
                tasks.last().map(|t| t.order_index)
            );
        }
        prop_assert_eq!(seen, table.len());
    }

    #[test]
    fn random_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = codec::decode::<RequestFrame>(&bytes);
        let _ = codec::decode::<ReplyFrame>(&bytes);
    }
}

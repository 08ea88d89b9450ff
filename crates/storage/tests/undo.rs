#![forbid(unsafe_code)]

mod common;

use common::{SESSION, open_store, status_of, task, temp_dir};
use rusqlite::params;
use wt_core::model::{ActionKind, EntityType, ItemType, Status};
use wt_storage::{BUILTIN_BOARD_ID, NewItem};

#[test]
fn nothing_to_undo() {
    let dir = temp_dir();
    let mut store = open_store(dir.path());
    assert!(store.undo_last_action(SESSION).expect("undo").is_none());
}

#[test]
fn undo_walks_back_one_action_at_a_time() {
    let dir = temp_dir();
    let mut store = open_store(dir.path());
    let item = task(&mut store, "undo me");
    store.set_status(SESSION, &item.id, Status::InProgress).expect("start");
    store.add_log(SESSION, &item.id, "audit only").expect("log");

    let outcome = store.undo_last_action(SESSION).expect("undo").expect("entry");
    assert_eq!(outcome.entry.kind, ActionKind::Start);
    assert!(outcome.entry.undone);
    assert_eq!(status_of(&store, &item.id), Status::Open);

    let outcome = store.undo_last_action(SESSION).expect("undo").expect("entry");
    assert_eq!(outcome.entry.kind, ActionKind::Create);
    assert!(store.get_item(&item.id).expect("get").is_none());

    assert!(store.undo_last_action(SESSION).expect("undo").is_none());
    assert_eq!(store.logs_for(&item.id).expect("logs").len(), 2);
}

#[test]
fn undo_is_scoped_to_session() {
    let dir = temp_dir();
    let mut store = open_store(dir.path());
    task(&mut store, "mine");
    assert!(store.undo_last_action("someone-else").expect("undo").is_none());
    assert!(store.last_undoable_action(SESSION).expect("query").is_some());
}

#[test]
fn undo_restores_deleted_item() {
    let dir = temp_dir();
    let mut store = open_store(dir.path());
    let item = task(&mut store, "keep me");
    store.delete_item(SESSION, &item.id).expect("delete");
    assert!(store.get_item(&item.id).expect("get").is_none());

    store.undo_last_action(SESSION).expect("undo").expect("entry");
    let restored = store.get_item(&item.id).expect("get").expect("restored");
    assert_eq!(restored.title, "keep me");
    assert!(restored.deleted_at_ms.is_none());
}

#[test]
fn undo_reverts_cascaded_unblock_before_the_close() {
    let dir = temp_dir();
    let mut store = open_store(dir.path());
    let a = task(&mut store, "A");
    let b = task(&mut store, "B");
    store.add_dependency(SESSION, &b.id, &a.id).expect("dep");
    store.set_status(SESSION, &b.id, Status::Blocked).expect("block");
    store.set_status(SESSION, &a.id, Status::Closed).expect("close");

    let first = store.undo_last_action(SESSION).expect("undo").expect("entry");
    assert_eq!(first.entry.kind, ActionKind::Unblock);
    assert_eq!(status_of(&store, &b.id), Status::Blocked);
    assert_eq!(status_of(&store, &a.id), Status::Closed);

    let second = store.undo_last_action(SESSION).expect("undo").expect("entry");
    assert_eq!(second.entry.kind, ActionKind::Close);
    assert_eq!(status_of(&store, &a.id), Status::Open);
    assert!(
        store
            .get_item(&a.id)
            .expect("get")
            .expect("a")
            .closed_at_ms
            .is_none()
    );
}

#[test]
fn undo_dependency_edges() {
    let dir = temp_dir();
    let mut store = open_store(dir.path());
    let a = task(&mut store, "A");
    let b = task(&mut store, "B");
    store.add_dependency(SESSION, &b.id, &a.id).expect("add");
    store.undo_last_action(SESSION).expect("undo").expect("entry");
    assert!(store.dependencies_of(&b.id).expect("deps").is_empty());

    store.add_dependency(SESSION, &b.id, &a.id).expect("add again");
    assert!(store.remove_dependency(SESSION, &b.id, &a.id).expect("remove"));
    let outcome = store.undo_last_action(SESSION).expect("undo").expect("entry");
    assert_eq!(outcome.entry.entity_type, EntityType::Dependency);
    assert_eq!(store.dependencies_of(&b.id).expect("deps"), vec![a.id.clone()]);
    assert_eq!(store.dependents_of(&a.id).expect("dependents"), vec![b.id.clone()]);
}

#[test]
fn undo_board_position_actions() {
    let dir = temp_dir();
    let mut store = open_store(dir.path());
    let board = store.create_board(SESSION, "Undo board", "").expect("board");
    let x = task(&mut store, "x");
    let y = task(&mut store, "y");
    store.set_position(SESSION, &board.id, &x.id, 10).expect("set x");
    store.set_position(SESSION, &board.id, &y.id, 20).expect("set y");

    store.swap_positions(SESSION, &board.id, &x.id, &y.id).expect("swap");
    store.undo_last_action(SESSION).expect("undo swap").expect("entry");
    assert_eq!(store.position_of(&board.id, &x.id).expect("x").expect("row").position, 10);
    assert_eq!(store.position_of(&board.id, &y.id).expect("y").expect("row").position, 20);

    store.set_position(SESSION, &board.id, &x.id, 99).expect("move x");
    store.undo_last_action(SESSION).expect("undo move").expect("entry");
    assert_eq!(store.position_of(&board.id, &x.id).expect("x").expect("row").position, 10);

    store.undo_last_action(SESSION).expect("undo set y").expect("entry");
    assert!(store.position_of(&board.id, &y.id).expect("y").is_none());
}

#[test]
fn undo_board_delete_restores_positions() {
    let dir = temp_dir();
    let mut store = open_store(dir.path());
    let board = store.create_board(SESSION, "Fragile", "q").expect("board");
    let x = task(&mut store, "x");
    store.set_position(SESSION, &board.id, &x.id, 3).expect("set");
    store.delete_board(SESSION, &board.id).expect("delete");

    store.undo_last_action(SESSION).expect("undo").expect("entry");
    let restored = store.get_board(&board.id).expect("restored");
    assert_eq!(restored.query, "q");
    assert_eq!(store.position_of(&board.id, &x.id).expect("x").expect("row").position, 3);

    let synced = store.sync_history_tail(1).expect("tail");
    assert_eq!(synced[0].action, "undo");
    assert_eq!(synced[0].entity_type, "board");
}

#[test]
fn undo_create_drops_edges_and_positions() {
    let dir = temp_dir();
    let mut store = open_store(dir.path());
    let a = task(&mut store, "A");
    let other = "sess-other";
    let x = store
        .create_item(other, NewItem::new("X", ItemType::Task))
        .expect("create x");
    let b = store
        .create_item(other, NewItem::new("B", ItemType::Task))
        .expect("create b");
    store.add_dependency(other, &b.id, &a.id).expect("b on a");
    store.add_dependency(other, &b.id, &x.id).expect("b on x");
    store.set_status(other, &b.id, Status::Blocked).expect("block");
    store
        .set_position(other, BUILTIN_BOARD_ID, &a.id, 100)
        .expect("position a");

    let outcome = store.undo_last_action(SESSION).expect("undo").expect("entry");
    assert_eq!(outcome.entry.kind, ActionKind::Create);
    assert!(store.get_item(&a.id).expect("get").is_none());
    assert_eq!(store.dependencies_of(&b.id).expect("deps"), vec![x.id.clone()]);
    assert!(store.dependents_of(&a.id).expect("dependents").is_empty());
    assert!(store.positions(BUILTIN_BOARD_ID).expect("positions").is_empty());

    let change = store.set_status(other, &x.id, Status::Closed).expect("close x");
    assert_eq!(change.unblocked, vec![b.id.clone()]);
    assert_eq!(status_of(&store, &b.id), Status::Open);
}

#[test]
fn malformed_snapshot_undo_changes_nothing() {
    let dir = temp_dir();
    let mut store = open_store(dir.path());
    let item = task(&mut store, "fragile");
    store.set_status(SESSION, &item.id, Status::InProgress).expect("start");
    let start = store
        .last_undoable_action(SESSION)
        .expect("query")
        .expect("entry");
    store
        .write(|tx| {
            tx.execute(
                "UPDATE action_log SET previous_data='{\"unexpected\":true}' WHERE id=?1",
                params![start.id],
            )?;
            Ok(())
        })
        .expect("corrupt snapshot");
    let tail_before = store.sync_history_tail(10).expect("tail");

    let err = store.undo_last_action(SESSION).expect_err("malformed snapshot");
    assert_eq!(err.code(), "INVALID_INPUT");
    assert_eq!(status_of(&store, &item.id), Status::InProgress);
    assert!(!store.action(start.id).expect("action").expect("entry").undone);
    assert_eq!(
        store
            .last_undoable_action(SESSION)
            .expect("query")
            .map(|entry| entry.id),
        Some(start.id)
    );
    assert_eq!(store.sync_history_tail(10).expect("tail"), tail_before);
}

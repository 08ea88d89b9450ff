#![forbid(unsafe_code)]

mod common;

use common::{SESSION, open_store, task, temp_dir};
use wt_storage::{BUILTIN_BOARD_ID, BUILTIN_BOARD_NAME, StoreError};

#[test]
fn builtin_board_is_installed_and_protected() {
    let dir = temp_dir();
    let mut store = open_store(dir.path());

    let builtin = store.get_board(BUILTIN_BOARD_ID).expect("builtin");
    assert_eq!(builtin.name, BUILTIN_BOARD_NAME);
    assert!(builtin.is_builtin);

    let err = store
        .update_board(SESSION, BUILTIN_BOARD_ID, Some("Renamed"), None)
        .expect_err("update builtin");
    assert!(matches!(err, StoreError::BuiltinProtected { .. }));
    let err = store
        .delete_board(SESSION, BUILTIN_BOARD_ID)
        .expect_err("delete builtin");
    assert_eq!(err.code(), "BUILTIN_PROTECTED");
    assert!(store.recent_actions_all(10).expect("actions").is_empty());
}

#[test]
fn reopening_keeps_a_single_builtin_board() {
    let dir = temp_dir();
    drop(open_store(dir.path()));
    let store = open_store(dir.path());
    let boards = store.list_boards().expect("list");
    assert_eq!(boards.len(), 1);
    assert_eq!(boards[0].id, BUILTIN_BOARD_ID);
}

#[test]
fn create_update_list_boards() {
    let dir = temp_dir();
    let mut store = open_store(dir.path());
    let sprint = store
        .create_board(SESSION, "  Sprint 1 ", "status:open")
        .expect("create");
    assert_eq!(sprint.name, "Sprint 1");
    assert!(!sprint.is_builtin);

    let err = store
        .create_board(SESSION, "Sprint 1", "")
        .expect_err("duplicate name");
    assert_eq!(err.code(), "INVALID_INPUT");

    let updated = store
        .update_board(SESSION, &sprint.id, None, Some("status:closed"))
        .expect("update query");
    assert_eq!(updated.name, "Sprint 1");
    assert_eq!(updated.query, "status:closed");

    let names: Vec<String> = store
        .list_boards()
        .expect("list")
        .into_iter()
        .map(|board| board.name)
        .collect();
    assert_eq!(names, vec![BUILTIN_BOARD_NAME.to_string(), "Sprint 1".to_string()]);
}

#[test]
fn delete_board_drops_its_positions() {
    let dir = temp_dir();
    let mut store = open_store(dir.path());
    let board = store.create_board(SESSION, "Temp", "").expect("create");
    let item = task(&mut store, "on temp board");
    store.set_position(SESSION, &board.id, &item.id, 5).expect("set");

    store.delete_board(SESSION, &board.id).expect("delete");

    let err = store.get_board(&board.id).expect_err("gone");
    assert!(matches!(err, StoreError::NotFound { entity: "board", .. }));
    assert_eq!(store.positions(&board.id).expect_err("gone").code(), "NOT_FOUND");
    assert_eq!(store.delete_board(SESSION, &board.id).expect_err("twice").code(), "NOT_FOUND");
}

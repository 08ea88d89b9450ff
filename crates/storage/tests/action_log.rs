#![forbid(unsafe_code)]

mod common;

use common::{SESSION, open_store, task, temp_dir};
use wt_core::model::{ActionKind, EntityType, Status};

#[test]
fn create_is_logged_with_empty_previous_snapshot() {
    let dir = temp_dir();
    let mut store = open_store(dir.path());
    let item = task(&mut store, "write parser");

    let entry = store
        .last_undoable_action(SESSION)
        .expect("query")
        .expect("entry");
    assert_eq!(entry.kind, ActionKind::Create);
    assert_eq!(entry.entity_type, EntityType::Item);
    assert_eq!(entry.entity_id, item.id);
    assert!(entry.previous.is_empty());
    assert_eq!(
        entry.new.field("title").and_then(|v| v.as_str()),
        Some("write parser")
    );
    assert!(!entry.undone);
}

#[test]
fn mark_undone_is_idempotent_and_one_way() {
    let dir = temp_dir();
    let mut store = open_store(dir.path());
    task(&mut store, "first");
    let second = task(&mut store, "second");

    let entry = store
        .last_undoable_action(SESSION)
        .expect("query")
        .expect("entry");
    assert_eq!(entry.entity_id, second.id);

    store.mark_undone(entry.id).expect("mark undone");
    store.mark_undone(entry.id).expect("mark undone again");

    let next = store
        .last_undoable_action(SESSION)
        .expect("query")
        .expect("older entry");
    assert_ne!(next.id, entry.id);
    assert!(store.action(entry.id).expect("read").expect("row").undone);

    let err = store.mark_undone(9_999).expect_err("unknown entry");
    assert_eq!(err.code(), "NOT_FOUND");
}

#[test]
fn audit_only_entries_are_listed_but_never_undoable() {
    let dir = temp_dir();
    let mut store = open_store(dir.path());
    let item = task(&mut store, "observe");
    store.add_log(SESSION, &item.id, "looked at it").expect("log");

    let recent = store.recent_actions(SESSION, 10).expect("recent");
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].entity_type, EntityType::Log);
    assert!(!recent[0].is_undoable());
    assert!(recent[1].is_undoable());

    let last = store
        .last_undoable_action(SESSION)
        .expect("query")
        .expect("entry");
    assert_eq!(last.entity_type, EntityType::Item);
    assert_eq!(last.entity_id, item.id);
}

#[test]
fn listings_are_newest_first_and_scoped_by_session() {
    let dir = temp_dir();
    let mut store = open_store(dir.path());
    let item = task(&mut store, "shared");
    store
        .set_status("other-session", &item.id, Status::InProgress)
        .expect("start");

    let mine = store.recent_actions(SESSION, 10).expect("mine");
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].kind, ActionKind::Create);

    let theirs = store.recent_actions("other-session", 10).expect("theirs");
    assert_eq!(theirs[0].kind, ActionKind::Start);
    assert!(store.last_undoable_action("nobody").expect("query").is_none());

    let all = store.recent_actions_all(10).expect("all");
    assert!(all.windows(2).all(|pair| pair[0].id > pair[1].id));
    assert_eq!(all.len(), mine.len() + theirs.len());
    assert_eq!(store.recent_actions_all(1).expect("limited").len(), 1);
}

#[test]
fn status_transition_kinds() {
    let dir = temp_dir();
    let mut store = open_store(dir.path());
    let item = task(&mut store, "lifecycle");

    let steps = [
        (Status::InProgress, ActionKind::Start),
        (Status::InReview, ActionKind::Review),
        (Status::Closed, ActionKind::Close),
        (Status::Open, ActionKind::Reopen),
        (Status::Blocked, ActionKind::Block),
    ];
    for (status, kind) in steps {
        store.set_status(SESSION, &item.id, status).expect("transition");
        let entry = store
            .last_undoable_action(SESSION)
            .expect("query")
            .expect("entry");
        assert_eq!(entry.kind, kind, "transition to {}", status.as_str());
    }
}

#[test]
fn every_action_appends_sync_history() {
    let dir = temp_dir();
    let mut store = open_store(dir.path());
    let item = task(&mut store, "synced");
    store.add_log(SESSION, &item.id, "note").expect("log");

    let tail = store.sync_history_tail(10).expect("tail");
    let actions: Vec<&str> = tail.iter().map(|row| row.action.as_str()).collect();
    assert_eq!(actions, vec!["create", "create"]);
    assert_eq!(tail[0].entity_type, "issue");
    assert_eq!(tail[0].entity_id, item.id);
    assert!(tail[0].data.contains("synced"));
    assert_eq!(tail[1].entity_type, "log");
}

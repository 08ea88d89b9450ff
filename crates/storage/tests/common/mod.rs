#![forbid(unsafe_code)]
#![allow(dead_code)]

use std::path::Path;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;
use wt_core::ids::ScriptedIdGenerator;
use wt_core::model::{ItemType, Status};
use wt_storage::{Item, NewItem, SqliteStore, StoreConfig};

pub const SESSION: &str = "sess-test";

/// Honors `RUST_LOG`; safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn temp_dir() -> TempDir {
    init_tracing();
    tempfile::Builder::new()
        .prefix("wt_storage_")
        .tempdir()
        .expect("create temp dir")
}

/// Store with deterministic ids (`wt-000001`, `bd-000002`, ...).
pub fn open_store(dir: &Path) -> SqliteStore {
    open_store_with_ids(dir, ScriptedIdGenerator::default())
}

pub fn open_store_with_ids(dir: &Path, ids: ScriptedIdGenerator) -> SqliteStore {
    SqliteStore::open_with(dir, StoreConfig::default(), Box::new(ids)).expect("open store")
}

pub fn task(store: &mut SqliteStore, title: &str) -> Item {
    store
        .create_item(SESSION, NewItem::new(title, ItemType::Task))
        .expect("create task")
}

pub fn task_with(store: &mut SqliteStore, title: &str, status: Status, parent: Option<&str>) -> Item {
    let mut new_item = NewItem::new(title, ItemType::Task).with_status(status);
    if let Some(parent) = parent {
        new_item = new_item.with_parent(parent);
    }
    store.create_item(SESSION, new_item).expect("create task")
}

pub fn epic(store: &mut SqliteStore, title: &str) -> Item {
    store
        .create_item(SESSION, NewItem::new(title, ItemType::Epic))
        .expect("create epic")
}

pub fn status_of(store: &SqliteStore, id: &str) -> Status {
    store
        .get_item(id)
        .expect("get item")
        .expect("item exists")
        .status
}

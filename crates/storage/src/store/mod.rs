#![forbid(unsafe_code)]

mod action_log;
mod boards;
mod cascade;
mod config;
mod error;
mod items;
mod lock;
mod positions;
mod support;
mod sync_history;
mod types;
mod undo;

pub use config::{
    LOCK_BACKOFF_ENV, LOCK_BACKOFF_MAX_ENV, LOCK_TIMEOUT_ENV, LockConfig, StoreConfig,
};
pub use error::StoreError;
pub use lock::{HolderLiveness, LOCK_FILE_NAME, LockHolder, WriteLock};
pub use positions::{POSITION_GAP, compose_board_order};
pub use types::*;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use wt_core::ids::{IdGenerator, RandomIdGenerator};

pub const DB_FILE_NAME: &str = "worktrack.db";

pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
    lock: WriteLock,
    ids: Box<dyn IdGenerator>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("storage_dir", &self.storage_dir)
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with(
            storage_dir,
            StoreConfig::from_env(),
            Box::new(RandomIdGenerator::new()),
        )
    }

    pub fn open_with(
        storage_dir: impl AsRef<Path>,
        config: StoreConfig,
        ids: Box<dyn IdGenerator>,
    ) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join(DB_FILE_NAME);
        let conn = Connection::open(&db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let lock = WriteLock::in_dir(&storage_dir, config.lock);
        lock.with_permit(|| support::install_schema(&conn, support::now_ms()))?;
        debug!(path = %db_path.display(), "store opened");

        Ok(Self {
            conn,
            storage_dir,
            lock,
            ids,
        })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn write_lock(&self) -> &WriteLock {
        &self.lock
    }

    /// Runs one mutating unit of work under the write permit inside a single
    /// immediate transaction. Any error rolls the whole unit back.
    pub fn write<T>(
        &mut self,
        work: impl FnOnce(&WriteTx<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        run_write(&mut self.conn, &self.lock, work)
    }
}

/// A transaction that can only exist while the write permit is held.
pub struct WriteTx<'conn> {
    tx: Transaction<'conn>,
    now_ms: i64,
}

impl WriteTx<'_> {
    /// Timestamp shared by every row written in this unit of work.
    pub fn now_ms(&self) -> i64 {
        self.now_ms
    }

    pub fn record_action(&self, action: NewAction) -> Result<ActionLogEntry, StoreError> {
        action_log::record_action_tx(self, action)
    }
}

impl Deref for WriteTx<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.tx
    }
}

fn run_write<T>(
    conn: &mut Connection,
    lock: &WriteLock,
    work: impl FnOnce(&WriteTx<'_>) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    lock.with_permit(|| {
        let tx = WriteTx {
            tx: conn.transaction_with_behavior(TransactionBehavior::Immediate)?,
            now_ms: support::now_ms(),
        };
        let value = work(&tx)?;
        tx.tx.commit()?;
        Ok(value)
    })
}

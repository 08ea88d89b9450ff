#![forbid(unsafe_code)]

use super::support::to_sqlite_i64;
use super::{NewSyncHistoryEntry, SqliteStore, StoreError, SyncHistoryEntry};
use rusqlite::{Connection, Row, params};
use tracing::debug;

const SYNC_COLUMNS: &str = "id, session_id, action, entity_type, entity_id, data, ts_ms";

pub(super) fn append_sync_tx(
    conn: &Connection,
    now_ms: i64,
    entry: &NewSyncHistoryEntry,
) -> Result<i64, StoreError> {
    conn.execute(
        r#"
        INSERT INTO sync_history(session_id, action, entity_type, entity_id, data, ts_ms)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            entry.session_id,
            entry.action,
            entry.entity_type,
            entry.entity_id,
            entry.data,
            now_ms
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

impl SqliteStore {
    /// Appends all entries in one transaction; returns their ids in order.
    pub fn record_sync_history(
        &mut self,
        entries: &[NewSyncHistoryEntry],
    ) -> Result<Vec<i64>, StoreError> {
        self.write(|tx| {
            entries
                .iter()
                .map(|entry| append_sync_tx(tx, tx.now_ms(), entry))
                .collect()
        })
    }

    /// The newest `limit` rows, oldest first.
    pub fn sync_history_tail(&self, limit: usize) -> Result<Vec<SyncHistoryEntry>, StoreError> {
        let sql = format!(
            "SELECT {SYNC_COLUMNS} FROM ( \
               SELECT {SYNC_COLUMNS} FROM sync_history ORDER BY id DESC LIMIT ?1 \
             ) ORDER BY id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![to_sqlite_i64(limit)?], sync_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn sync_history_since(
        &self,
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<SyncHistoryEntry>, StoreError> {
        let sql = format!(
            "SELECT {SYNC_COLUMNS} FROM sync_history WHERE id > ?1 ORDER BY id ASC LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![after_id, to_sqlite_i64(limit)?],
            sync_from_row,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Keeps the newest `max_rows` rows and returns how many were removed.
    pub fn prune_sync_history(&mut self, max_rows: usize) -> Result<usize, StoreError> {
        let max_rows = to_sqlite_i64(max_rows)?;
        let removed = self.write(|tx| {
            Ok(tx.execute(
                "DELETE FROM sync_history WHERE id NOT IN ( \
                   SELECT id FROM sync_history ORDER BY id DESC LIMIT ?1 \
                 )",
                params![max_rows],
            )?)
        })?;
        debug!(removed, "sync history pruned");
        Ok(removed)
    }
}

fn sync_from_row(row: &Row<'_>) -> rusqlite::Result<SyncHistoryEntry> {
    Ok(SyncHistoryEntry {
        id: row.get(0)?,
        session_id: row.get(1)?,
        action: row.get(2)?,
        entity_type: row.get(3)?,
        entity_id: row.get(4)?,
        data: row.get(5)?,
        ts_ms: row.get(6)?,
    })
}

#![forbid(unsafe_code)]

use super::support::{enum_column, snapshot_column, to_sqlite_i64};
use super::sync_history::append_sync_tx;
use super::{
    ActionLogEntry, NewAction, NewSyncHistoryEntry, SqliteStore, StoreError, WriteTx,
};
use rusqlite::{Connection, OptionalExtension, Row, params};
use wt_core::model::{ActionKind, EntityType};

const ACTION_COLUMNS: &str =
    "id, session_id, action_type, entity_type, entity_id, previous_data, new_data, ts_ms, undone";

pub(super) fn record_action_tx(
    tx: &WriteTx<'_>,
    action: NewAction,
) -> Result<ActionLogEntry, StoreError> {
    let previous_data = action.previous.to_data_string();
    let new_data = action.new.to_data_string();
    tx.execute(
        r#"
        INSERT INTO action_log(session_id, action_type, entity_type, entity_id, previous_data, new_data, ts_ms, undone)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)
        "#,
        params![
            action.session_id,
            action.kind.as_str(),
            action.entity_type.as_str(),
            action.entity_id,
            previous_data,
            new_data,
            tx.now_ms()
        ],
    )?;
    let id = tx.last_insert_rowid();

    append_sync_tx(
        tx,
        tx.now_ms(),
        &NewSyncHistoryEntry {
            session_id: action.session_id.clone(),
            action: action.kind.as_str().to_string(),
            entity_type: action.entity_type.as_str().to_string(),
            entity_id: action.entity_id.clone(),
            data: if action.new.is_empty() {
                previous_data
            } else {
                new_data
            },
        },
    )?;

    Ok(ActionLogEntry {
        id,
        session_id: action.session_id,
        kind: action.kind,
        entity_type: action.entity_type,
        entity_id: action.entity_id,
        previous: action.previous,
        new: action.new,
        ts_ms: tx.now_ms(),
        undone: false,
    })
}

pub(super) fn last_undoable_in(
    conn: &Connection,
    session_id: &str,
) -> Result<Option<ActionLogEntry>, StoreError> {
    let sql = format!(
        "SELECT {ACTION_COLUMNS} FROM action_log \
         WHERE session_id=?1 AND undone=0 AND entity_type NOT IN ({}) \
         ORDER BY id DESC LIMIT 1",
        audit_only_sql_list()
    );
    Ok(conn
        .query_row(&sql, params![session_id], action_from_row)
        .optional()?)
}

/// Flips `undone`. Idempotent; the flag is never cleared.
pub(super) fn mark_undone_in(conn: &Connection, entry_id: i64) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE action_log SET undone=1 WHERE id=?1",
        params![entry_id],
    )?;
    if changed == 0 {
        return Err(StoreError::not_found("action", entry_id.to_string()));
    }
    Ok(())
}

impl SqliteStore {
    /// Most recent entry of `session_id` that undo may still revert.
    pub fn last_undoable_action(
        &self,
        session_id: &str,
    ) -> Result<Option<ActionLogEntry>, StoreError> {
        last_undoable_in(&self.conn, session_id)
    }

    pub fn mark_undone(&mut self, entry_id: i64) -> Result<(), StoreError> {
        self.write(|tx| mark_undone_in(tx, entry_id))
    }

    pub fn action(&self, entry_id: i64) -> Result<Option<ActionLogEntry>, StoreError> {
        let sql = format!("SELECT {ACTION_COLUMNS} FROM action_log WHERE id=?1");
        Ok(self
            .conn
            .query_row(&sql, params![entry_id], action_from_row)
            .optional()?)
    }

    /// Newest-first listing for one session. Audit-only entries are included;
    /// use [`ActionLogEntry::is_undoable`] to tell them apart.
    pub fn recent_actions(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ActionLogEntry>, StoreError> {
        let sql = format!(
            "SELECT {ACTION_COLUMNS} FROM action_log WHERE session_id=?1 ORDER BY id DESC LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![session_id, to_sqlite_i64(limit)?],
            action_from_row,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn recent_actions_all(&self, limit: usize) -> Result<Vec<ActionLogEntry>, StoreError> {
        let sql = format!("SELECT {ACTION_COLUMNS} FROM action_log ORDER BY id DESC LIMIT ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![to_sqlite_i64(limit)?], action_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn action_from_row(row: &Row<'_>) -> rusqlite::Result<ActionLogEntry> {
    Ok(ActionLogEntry {
        id: row.get(0)?,
        session_id: row.get(1)?,
        kind: enum_column(row, 2, ActionKind::parse)?,
        entity_type: enum_column(row, 3, EntityType::parse)?,
        entity_id: row.get(4)?,
        previous: snapshot_column(row, 5)?,
        new: snapshot_column(row, 6)?,
        ts_ms: row.get(7)?,
        undone: row.get::<_, i64>(8)? != 0,
    })
}

fn audit_only_sql_list() -> String {
    EntityType::audit_only()
        .map(|kind| format!("'{}'", kind.as_str()))
        .collect::<Vec<_>>()
        .join(",")
}

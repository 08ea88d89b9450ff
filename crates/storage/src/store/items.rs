#![forbid(unsafe_code)]

use super::cascade::{cascade_up_tx, unblock_dependents_tx};
use super::support::{enum_column, insert_with_fresh_id};
use super::{
    DEPENDS_ON, Dependency, Item, NewAction, NewItem, ProgressLog, SqliteStore, StatusChange,
    StoreError, WriteTx, run_write,
};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;
use wt_core::EntitySnapshot;
use wt_core::ids::ITEM_ID_PREFIX;
use wt_core::model::{ActionKind, EntityType, ItemType, Status};

const ITEM_COLUMNS: &str = "id, title, status, item_type, parent_id, created_at_ms, updated_at_ms, closed_at_ms, deleted_at_ms";

pub(super) const LOG_TYPE_PROGRESS: &str = "progress";

impl SqliteStore {
    pub fn create_item(&mut self, session_id: &str, new_item: NewItem) -> Result<Item, StoreError> {
        if new_item.title.trim().is_empty() {
            return Err(StoreError::InvalidInput("item title must not be empty"));
        }
        let ids = self.ids.as_mut();
        run_write(&mut self.conn, &self.lock, |tx| {
            if let Some(parent_id) = new_item.parent_id.as_deref() {
                require_live_item(tx, parent_id)?;
            }
            let item = insert_with_fresh_id(ids, ITEM_ID_PREFIX, |id| {
                let item = Item {
                    id: id.to_string(),
                    title: new_item.title.clone(),
                    status: new_item.status,
                    item_type: new_item.item_type,
                    parent_id: new_item.parent_id.clone(),
                    created_at_ms: tx.now_ms(),
                    updated_at_ms: tx.now_ms(),
                    closed_at_ms: (new_item.status == Status::Closed).then_some(tx.now_ms()),
                    deleted_at_ms: None,
                };
                insert_item_row(tx, &item)?;
                Ok(item)
            })?;
            tx.record_action(
                NewAction::new(session_id, ActionKind::Create, EntityType::Item, &item.id)
                    .new_state(EntitySnapshot::of(&item)?),
            )?;
            Ok(item)
        })
    }

    pub fn get_item(&self, id: &str) -> Result<Option<Item>, StoreError> {
        live_item(&self.conn, id)
    }

    pub fn children_of(&self, parent_id: &str) -> Result<Vec<Item>, StoreError> {
        children_in(&self.conn, parent_id)
    }

    pub fn set_parent(
        &mut self,
        session_id: &str,
        id: &str,
        parent_id: Option<&str>,
    ) -> Result<Item, StoreError> {
        if parent_id == Some(id) {
            return Err(StoreError::InvalidInput("item cannot be its own parent"));
        }
        self.write(|tx| {
            let before = require_live_item(tx, id)?;
            if let Some(parent_id) = parent_id {
                require_live_item(tx, parent_id)?;
            }
            let mut after = before.clone();
            after.parent_id = parent_id.map(str::to_string);
            after.updated_at_ms = tx.now_ms();
            write_item_row(tx, &after)?;
            tx.record_action(
                NewAction::new(session_id, ActionKind::Update, EntityType::Item, id)
                    .previous(EntitySnapshot::of(&before)?)
                    .new_state(EntitySnapshot::of(&after)?),
            )?;
            Ok(after)
        })
    }

    /// Moves an item to `status` and runs the cascades the transition implies,
    /// all under one permit and one transaction.
    pub fn set_status(
        &mut self,
        session_id: &str,
        id: &str,
        status: Status,
    ) -> Result<StatusChange, StoreError> {
        self.write(|tx| set_status_tx(tx, session_id, id, status))
    }

    /// Soft delete. The row stays for undo but disappears from every lookup.
    pub fn delete_item(&mut self, session_id: &str, id: &str) -> Result<Item, StoreError> {
        self.write(|tx| {
            let before = require_live_item(tx, id)?;
            let mut after = before.clone();
            after.deleted_at_ms = Some(tx.now_ms());
            after.updated_at_ms = tx.now_ms();
            write_item_row(tx, &after)?;
            tx.record_action(
                NewAction::new(session_id, ActionKind::Delete, EntityType::Item, id)
                    .previous(EntitySnapshot::of(&before)?),
            )?;
            Ok(after)
        })
    }

    pub fn add_dependency(
        &mut self,
        session_id: &str,
        item_id: &str,
        depends_on_id: &str,
    ) -> Result<Dependency, StoreError> {
        if item_id == depends_on_id {
            return Err(StoreError::InvalidInput("item cannot depend on itself"));
        }
        self.write(|tx| {
            require_live_item(tx, item_id)?;
            require_live_item(tx, depends_on_id)?;
            let dependency = Dependency {
                item_id: item_id.to_string(),
                depends_on_id: depends_on_id.to_string(),
                relation: DEPENDS_ON.to_string(),
            };
            if insert_dependency_row(tx, &dependency, tx.now_ms())? {
                tx.record_action(
                    NewAction::new(
                        session_id,
                        ActionKind::AddDependency,
                        EntityType::Dependency,
                        item_id,
                    )
                    .new_state(EntitySnapshot::of(&dependency)?),
                )?;
            }
            Ok(dependency)
        })
    }

    /// Returns false when the edge did not exist.
    pub fn remove_dependency(
        &mut self,
        session_id: &str,
        item_id: &str,
        depends_on_id: &str,
    ) -> Result<bool, StoreError> {
        self.write(|tx| {
            let dependency = Dependency {
                item_id: item_id.to_string(),
                depends_on_id: depends_on_id.to_string(),
                relation: DEPENDS_ON.to_string(),
            };
            if !delete_dependency_row(tx, &dependency)? {
                return Ok(false);
            }
            tx.record_action(
                NewAction::new(
                    session_id,
                    ActionKind::RemoveDependency,
                    EntityType::Dependency,
                    item_id,
                )
                .previous(EntitySnapshot::of(&dependency)?),
            )?;
            Ok(true)
        })
    }

    pub fn dependencies_of(&self, item_id: &str) -> Result<Vec<String>, StoreError> {
        dependency_ids(&self.conn, item_id)
    }

    pub fn dependents_of(&self, item_id: &str) -> Result<Vec<String>, StoreError> {
        dependent_ids(&self.conn, item_id)
    }

    pub fn add_log(
        &mut self,
        session_id: &str,
        item_id: &str,
        message: &str,
    ) -> Result<ProgressLog, StoreError> {
        self.write(|tx| {
            require_live_item(tx, item_id)?;
            add_log_tx(tx, session_id, item_id, message, LOG_TYPE_PROGRESS)
        })
    }

    pub fn logs_for(&self, item_id: &str) -> Result<Vec<ProgressLog>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, item_id, session_id, message, log_type, ts_ms FROM logs WHERE item_id=?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![item_id], |row| {
            Ok(ProgressLog {
                id: row.get(0)?,
                item_id: row.get(1)?,
                session_id: row.get(2)?,
                message: row.get(3)?,
                log_type: row.get(4)?,
                ts_ms: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

pub(super) fn set_status_tx(
    tx: &WriteTx<'_>,
    session_id: &str,
    id: &str,
    status: Status,
) -> Result<StatusChange, StoreError> {
    let before = require_live_item(tx, id)?;
    if before.status == status {
        return Ok(StatusChange {
            previous_status: before.status,
            item: before,
            cascaded_parents: Vec::new(),
            unblocked: Vec::new(),
        });
    }

    let after = apply_status_tx(tx, &before, status)?;
    add_log_tx(
        tx,
        session_id,
        id,
        &format!(
            "Status changed: {} -> {}",
            before.status.as_str(),
            status.as_str()
        ),
        LOG_TYPE_PROGRESS,
    )?;
    tx.record_action(
        NewAction::new(
            session_id,
            ActionKind::for_transition(before.status, status),
            EntityType::Item,
            id,
        )
        .previous(EntitySnapshot::of(&before)?)
        .new_state(EntitySnapshot::of(&after)?),
    )?;

    let mut cascaded_parents = Vec::new();
    let mut unblocked = Vec::new();
    if matches!(status, Status::InReview | Status::Closed) {
        let report = cascade_up_tx(tx, session_id, id, status)?;
        cascaded_parents = report.ids;
        unblocked.extend(report.unblocked);
    }
    if status == Status::Closed {
        unblocked.extend(unblock_dependents_tx(tx, session_id, id)?.ids);
    }
    debug!(
        id,
        from = before.status.as_str(),
        to = status.as_str(),
        cascaded = cascaded_parents.len(),
        unblocked = unblocked.len(),
        "status changed"
    );

    Ok(StatusChange {
        item: after,
        previous_status: before.status,
        cascaded_parents,
        unblocked,
    })
}

/// Writes the new status and keeps `closed_at_ms` in step with it.
pub(super) fn apply_status_tx(
    tx: &WriteTx<'_>,
    item: &Item,
    status: Status,
) -> Result<Item, StoreError> {
    let mut updated = item.clone();
    updated.status = status;
    updated.updated_at_ms = tx.now_ms();
    updated.closed_at_ms = match status {
        Status::Closed => Some(tx.now_ms()),
        _ => None,
    };
    tx.execute(
        "UPDATE items SET status=?2, updated_at_ms=?3, closed_at_ms=?4 WHERE id=?1",
        params![
            updated.id,
            updated.status.as_str(),
            updated.updated_at_ms,
            updated.closed_at_ms
        ],
    )?;
    Ok(updated)
}

/// Progress logs are audit-only: recorded in the action log, never undone.
pub(super) fn add_log_tx(
    tx: &WriteTx<'_>,
    session_id: &str,
    item_id: &str,
    message: &str,
    log_type: &str,
) -> Result<ProgressLog, StoreError> {
    tx.execute(
        "INSERT INTO logs(item_id, session_id, message, log_type, ts_ms) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![item_id, session_id, message, log_type, tx.now_ms()],
    )?;
    let log = ProgressLog {
        id: tx.last_insert_rowid(),
        item_id: item_id.to_string(),
        session_id: session_id.to_string(),
        message: message.to_string(),
        log_type: log_type.to_string(),
        ts_ms: tx.now_ms(),
    };
    tx.record_action(
        NewAction::new(
            session_id,
            ActionKind::Create,
            EntityType::Log,
            log.id.to_string(),
        )
        .new_state(EntitySnapshot::from_value(serde_json::json!({
            "item_id": log.item_id,
            "message": log.message,
            "log_type": log.log_type,
        }))),
    )?;
    Ok(log)
}

pub(super) fn live_item(conn: &Connection, id: &str) -> Result<Option<Item>, StoreError> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id=?1 AND deleted_at_ms IS NULL");
    Ok(conn.query_row(&sql, params![id], item_from_row).optional()?)
}

pub(super) fn require_live_item(conn: &Connection, id: &str) -> Result<Item, StoreError> {
    live_item(conn, id)?.ok_or_else(|| StoreError::not_found("item", id))
}

pub(super) fn children_in(conn: &Connection, parent_id: &str) -> Result<Vec<Item>, StoreError> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM items \
         WHERE parent_id=?1 AND deleted_at_ms IS NULL \
         ORDER BY created_at_ms ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![parent_id], item_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub(super) fn child_ids(conn: &Connection, parent_id: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id FROM items WHERE parent_id=?1 AND deleted_at_ms IS NULL ORDER BY created_at_ms ASC, id ASC",
    )?;
    let rows = stmt.query_map(params![parent_id], |row| row.get::<_, String>(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub(super) fn dependency_ids(conn: &Connection, item_id: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT depends_on_id FROM item_dependencies WHERE item_id=?1 AND relation=?2 ORDER BY depends_on_id ASC",
    )?;
    let rows = stmt.query_map(params![item_id, DEPENDS_ON], |row| row.get::<_, String>(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub(super) fn dependent_ids(conn: &Connection, item_id: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT item_id FROM item_dependencies WHERE depends_on_id=?1 AND relation=?2 ORDER BY item_id ASC",
    )?;
    let rows = stmt.query_map(params![item_id, DEPENDS_ON], |row| row.get::<_, String>(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn insert_item_row(conn: &Connection, item: &Item) -> Result<(), StoreError> {
    put_item_row(conn, "INSERT", item)
}

/// Full-row write used by edits and by undo when restoring a snapshot.
pub(super) fn write_item_row(conn: &Connection, item: &Item) -> Result<(), StoreError> {
    put_item_row(conn, "INSERT OR REPLACE", item)
}

fn put_item_row(conn: &Connection, verb: &str, item: &Item) -> Result<(), StoreError> {
    conn.execute(
        &format!("{verb} INTO items({ITEM_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        params![
            item.id,
            item.title,
            item.status.as_str(),
            item.item_type.as_str(),
            item.parent_id,
            item.created_at_ms,
            item.updated_at_ms,
            item.closed_at_ms,
            item.deleted_at_ms
        ],
    )?;
    Ok(())
}

/// Hard delete of an item together with its edges and board positions.
pub(super) fn purge_item_tx(conn: &Connection, id: &str) -> Result<(), StoreError> {
    conn.execute(
        "DELETE FROM item_dependencies WHERE item_id=?1 OR depends_on_id=?1",
        params![id],
    )?;
    conn.execute("DELETE FROM board_item_positions WHERE item_id=?1", params![id])?;
    conn.execute("DELETE FROM items WHERE id=?1", params![id])?;
    Ok(())
}

/// Returns false when the edge already existed.
pub(super) fn insert_dependency_row(
    conn: &Connection,
    dependency: &Dependency,
    now_ms: i64,
) -> Result<bool, StoreError> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO item_dependencies(item_id, depends_on_id, relation, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
        params![
            dependency.item_id,
            dependency.depends_on_id,
            dependency.relation,
            now_ms
        ],
    )?;
    Ok(inserted > 0)
}

pub(super) fn delete_dependency_row(
    conn: &Connection,
    dependency: &Dependency,
) -> Result<bool, StoreError> {
    let deleted = conn.execute(
        "DELETE FROM item_dependencies WHERE item_id=?1 AND depends_on_id=?2 AND relation=?3",
        params![
            dependency.item_id,
            dependency.depends_on_id,
            dependency.relation
        ],
    )?;
    Ok(deleted > 0)
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        title: row.get(1)?,
        status: enum_column(row, 2, Status::parse)?,
        item_type: enum_column(row, 3, ItemType::parse)?,
        parent_id: row.get(4)?,
        created_at_ms: row.get(5)?,
        updated_at_ms: row.get(6)?,
        closed_at_ms: row.get(7)?,
        deleted_at_ms: row.get(8)?,
    })
}

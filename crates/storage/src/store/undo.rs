#![forbid(unsafe_code)]

use super::action_log::{last_undoable_in, mark_undone_in};
use super::boards::{BoardSnapshot, restore_board_tx, update_board_row};
use super::items::{
    delete_dependency_row, insert_dependency_row, purge_item_tx, write_item_row,
};
use super::positions::{delete_position_row, put_position_row};
use super::sync_history::append_sync_tx;
use super::{
    ActionLogEntry, Board, BoardPosition, Dependency, Item, NewSyncHistoryEntry, SqliteStore,
    StoreError, UndoOutcome, WriteTx,
};
use rusqlite::params;
use serde::de::DeserializeOwned;
use tracing::info;
use wt_core::EntitySnapshot;
use wt_core::model::{ActionKind, EntityType};

const SYNC_ACTION_UNDO: &str = "undo";

impl SqliteStore {
    /// Reverts the newest undoable action of `session_id`. Cascaded
    /// transitions are separate entries, so each call reverts one of them.
    pub fn undo_last_action(&mut self, session_id: &str) -> Result<Option<UndoOutcome>, StoreError> {
        self.write(|tx| {
            let Some(mut entry) = last_undoable_in(tx, session_id)? else {
                return Ok(None);
            };
            revert_tx(tx, &entry)?;
            mark_undone_in(tx, entry.id)?;
            append_sync_tx(
                tx,
                tx.now_ms(),
                &NewSyncHistoryEntry {
                    session_id: session_id.to_string(),
                    action: SYNC_ACTION_UNDO.to_string(),
                    entity_type: entry.entity_type.as_str().to_string(),
                    entity_id: entry.entity_id.clone(),
                    data: serde_json::json!({
                        "action_id": entry.id,
                        "action": entry.kind.as_str(),
                    })
                    .to_string(),
                },
            )?;
            info!(
                action_id = entry.id,
                kind = entry.kind.as_str(),
                entity = entry.entity_type.as_str(),
                entity_id = %entry.entity_id,
                "action undone"
            );
            entry.undone = true;
            Ok(Some(UndoOutcome { entry }))
        })
    }
}

fn revert_tx(tx: &WriteTx<'_>, entry: &ActionLogEntry) -> Result<(), StoreError> {
    match (entry.entity_type, entry.kind) {
        (EntityType::Item, ActionKind::Create) => purge_item_tx(tx, &entry.entity_id),
        (EntityType::Item, _) => write_item_row(tx, &decode::<Item>(&entry.previous)?),

        (EntityType::Dependency, ActionKind::AddDependency) => {
            delete_dependency_row(tx, &decode::<Dependency>(&entry.new)?).map(drop)
        }
        (EntityType::Dependency, ActionKind::RemoveDependency) => {
            insert_dependency_row(tx, &decode::<Dependency>(&entry.previous)?, tx.now_ms())
                .map(drop)
        }

        (EntityType::Board, ActionKind::Create) => {
            tx.execute("DELETE FROM boards WHERE id=?1", params![entry.entity_id])?;
            Ok(())
        }
        (EntityType::Board, ActionKind::Update) => {
            update_board_row(tx, &decode::<Board>(&entry.previous)?)
        }
        (EntityType::Board, ActionKind::Delete) => {
            restore_board_tx(tx, &decode::<BoardSnapshot>(&entry.previous)?, tx.now_ms())
        }

        (EntityType::BoardPosition, ActionKind::BoardSwap) => {
            for row in decode::<Vec<BoardPosition>>(&entry.previous)? {
                put_position_row(tx, &row, tx.now_ms())?;
            }
            Ok(())
        }
        (EntityType::BoardPosition, _) if entry.previous.is_empty() => {
            let row = decode::<BoardPosition>(&entry.new)?;
            delete_position_row(tx, &row.board_id, &row.item_id)
        }
        (EntityType::BoardPosition, _) => {
            put_position_row(tx, &decode::<BoardPosition>(&entry.previous)?, tx.now_ms())
        }

        _ => Err(StoreError::InvalidInput("action cannot be undone")),
    }
}

fn decode<T: DeserializeOwned>(snapshot: &EntitySnapshot) -> Result<T, StoreError> {
    snapshot
        .decode::<T>()
        .map_err(|_| StoreError::InvalidInput("malformed action snapshot"))?
        .ok_or(StoreError::InvalidInput("action snapshot is empty"))
}

#![forbid(unsafe_code)]

use super::positions::{all_positions, put_position_row};
use super::support::insert_with_fresh_id;
use super::{
    BUILTIN_BOARD_ID, Board, BoardPosition, NewAction, SqliteStore, StoreError, run_write,
};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use wt_core::EntitySnapshot;
use wt_core::ids::BOARD_ID_PREFIX;
use wt_core::model::{ActionKind, EntityType};

const BOARD_COLUMNS: &str = "id, name, query, is_builtin, created_at_ms, updated_at_ms";

/// Previous state of a deleted board: the row and every position it owned.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(super) struct BoardSnapshot {
    pub(super) board: Board,
    pub(super) positions: Vec<BoardPosition>,
}

impl SqliteStore {
    pub fn create_board(
        &mut self,
        session_id: &str,
        name: &str,
        query: &str,
    ) -> Result<Board, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidInput("board name must not be empty"));
        }
        let ids = self.ids.as_mut();
        run_write(&mut self.conn, &self.lock, |tx| {
            ensure_name_free(tx, name, None)?;
            let board = insert_with_fresh_id(ids, BOARD_ID_PREFIX, |id| {
                let board = Board {
                    id: id.to_string(),
                    name: name.to_string(),
                    query: query.to_string(),
                    is_builtin: false,
                    created_at_ms: tx.now_ms(),
                    updated_at_ms: tx.now_ms(),
                };
                insert_board_row(tx, &board)?;
                Ok(board)
            })?;
            tx.record_action(
                NewAction::new(session_id, ActionKind::Create, EntityType::Board, &board.id)
                    .new_state(EntitySnapshot::of(&board)?),
            )?;
            Ok(board)
        })
    }

    pub fn get_board(&self, id: &str) -> Result<Board, StoreError> {
        require_board(&self.conn, id)
    }

    /// Builtin board first, then by name.
    pub fn list_boards(&self) -> Result<Vec<Board>, StoreError> {
        let sql = format!(
            "SELECT {BOARD_COLUMNS} FROM boards ORDER BY is_builtin DESC, name ASC, id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], board_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn update_board(
        &mut self,
        session_id: &str,
        id: &str,
        name: Option<&str>,
        query: Option<&str>,
    ) -> Result<Board, StoreError> {
        let name = name.map(str::trim);
        if name.is_some_and(str::is_empty) {
            return Err(StoreError::InvalidInput("board name must not be empty"));
        }
        self.write(|tx| {
            let before = require_mutable_board(tx, id)?;
            let mut after = before.clone();
            if let Some(name) = name {
                ensure_name_free(tx, name, Some(id))?;
                after.name = name.to_string();
            }
            if let Some(query) = query {
                after.query = query.to_string();
            }
            after.updated_at_ms = tx.now_ms();
            update_board_row(tx, &after)?;
            tx.record_action(
                NewAction::new(session_id, ActionKind::Update, EntityType::Board, id)
                    .previous(EntitySnapshot::of(&before)?)
                    .new_state(EntitySnapshot::of(&after)?),
            )?;
            Ok(after)
        })
    }

    /// Removes the board together with its positions.
    pub fn delete_board(&mut self, session_id: &str, id: &str) -> Result<Board, StoreError> {
        self.write(|tx| {
            let board = require_mutable_board(tx, id)?;
            let snapshot = BoardSnapshot {
                board: board.clone(),
                positions: all_positions(tx, id)?,
            };
            tx.execute("DELETE FROM boards WHERE id=?1", params![id])?;
            tx.record_action(
                NewAction::new(session_id, ActionKind::Delete, EntityType::Board, id)
                    .previous(EntitySnapshot::of(&snapshot)?),
            )?;
            Ok(board)
        })
    }
}

pub(super) fn require_board(conn: &Connection, id: &str) -> Result<Board, StoreError> {
    let sql = format!("SELECT {BOARD_COLUMNS} FROM boards WHERE id=?1");
    conn.query_row(&sql, params![id], board_from_row)
        .optional()?
        .ok_or_else(|| StoreError::not_found("board", id))
}

fn require_mutable_board(conn: &Connection, id: &str) -> Result<Board, StoreError> {
    let board = require_board(conn, id)?;
    if board.is_builtin || board.id == BUILTIN_BOARD_ID {
        return Err(StoreError::BuiltinProtected {
            board_id: board.id,
        });
    }
    Ok(board)
}

fn ensure_name_free(conn: &Connection, name: &str, except_id: Option<&str>) -> Result<(), StoreError> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM boards WHERE name=?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    match existing {
        Some(existing) if Some(existing.as_str()) != except_id => {
            Err(StoreError::InvalidInput("board name already exists"))
        }
        _ => Ok(()),
    }
}

pub(super) fn insert_board_row(conn: &Connection, board: &Board) -> Result<(), StoreError> {
    conn.execute(
        &format!("INSERT INTO boards({BOARD_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
        params![
            board.id,
            board.name,
            board.query,
            i64::from(board.is_builtin),
            board.created_at_ms,
            board.updated_at_ms
        ],
    )?;
    Ok(())
}

/// In-place edit. A replace would delete the row and cascade to positions.
pub(super) fn update_board_row(conn: &Connection, board: &Board) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE boards SET name=?2, query=?3, updated_at_ms=?4 WHERE id=?1",
        params![board.id, board.name, board.query, board.updated_at_ms],
    )?;
    if changed == 0 {
        return Err(StoreError::not_found("board", &board.id));
    }
    Ok(())
}

pub(super) fn restore_board_tx(
    conn: &Connection,
    snapshot: &BoardSnapshot,
    now_ms: i64,
) -> Result<(), StoreError> {
    insert_board_row(conn, &snapshot.board)?;
    for row in &snapshot.positions {
        put_position_row(conn, row, now_ms)?;
    }
    Ok(())
}

fn board_from_row(row: &Row<'_>) -> rusqlite::Result<Board> {
    Ok(Board {
        id: row.get(0)?,
        name: row.get(1)?,
        query: row.get(2)?,
        is_builtin: row.get::<_, i64>(3)? != 0,
        created_at_ms: row.get(4)?,
        updated_at_ms: row.get(5)?,
    })
}

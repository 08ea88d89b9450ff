#![forbid(unsafe_code)]

//! Sparse integer ordering of items on a board.
//!
//! Keys are spaced `POSITION_GAP` apart so an insert between two neighbours
//! only needs their midpoint. When two neighbours are adjacent integers the
//! whole board is respaced first.

use super::boards::require_board;
use super::items::require_live_item;
use super::sync_history::append_sync_tx;
use super::{
    BoardPosition, InsertPosition, NewAction, NewSyncHistoryEntry, PositionChange, SqliteStore,
    StoreError, WriteTx,
};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::HashSet;
use tracing::info;
use wt_core::EntitySnapshot;
use wt_core::model::{ActionKind, EntityType};

pub const POSITION_GAP: i64 = 65_536;

const SYNC_ACTION_RESPACE: &str = "board_respace";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Plan {
    At(i64),
    NeedsRespace,
}

/// `keys` ascending; `slot` is 1-based.
fn plan(keys: &[i64], slot: usize) -> Plan {
    let (Some(&first), Some(&last)) = (keys.first(), keys.last()) else {
        return Plan::At(POSITION_GAP);
    };
    if slot <= 1 {
        return first.checked_sub(POSITION_GAP).map_or(Plan::NeedsRespace, Plan::At);
    }
    if slot > keys.len() {
        return last.checked_add(POSITION_GAP).map_or(Plan::NeedsRespace, Plan::At);
    }
    let lo = keys[slot - 2];
    let hi = keys[slot - 1];
    let Ok(mid) = i64::try_from((i128::from(lo) + i128::from(hi)) / 2) else {
        return Plan::NeedsRespace;
    };
    if mid <= lo || mid >= hi {
        Plan::NeedsRespace
    } else {
        Plan::At(mid)
    }
}

/// Positioned items first by ascending key, then the rest in `natural` order.
/// Only ids present in `natural` are returned.
pub fn compose_board_order(positions: &[BoardPosition], natural: &[String]) -> Vec<String> {
    let members: HashSet<&str> = natural.iter().map(String::as_str).collect();
    let mut positioned: Vec<&BoardPosition> = positions
        .iter()
        .filter(|row| row.deleted_at_ms.is_none() && members.contains(row.item_id.as_str()))
        .collect();
    positioned.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });

    let placed: HashSet<&str> = positioned.iter().map(|row| row.item_id.as_str()).collect();
    let mut out: Vec<String> = positioned.iter().map(|row| row.item_id.clone()).collect();
    let mut seen = HashSet::new();
    out.extend(
        natural
            .iter()
            .filter(|id| !placed.contains(id.as_str()) && seen.insert(id.as_str()))
            .cloned(),
    );
    out
}

impl SqliteStore {
    /// Writes one row. No other row on the board moves.
    pub fn set_position(
        &mut self,
        session_id: &str,
        board_id: &str,
        item_id: &str,
        position: i64,
    ) -> Result<BoardPosition, StoreError> {
        self.write(|tx| {
            require_board(tx, board_id)?;
            require_live_item(tx, item_id)?;
            set_position_tx(tx, session_id, board_id, item_id, position)
        })
    }

    pub fn remove_position(
        &mut self,
        session_id: &str,
        board_id: &str,
        item_id: &str,
    ) -> Result<BoardPosition, StoreError> {
        self.write(|tx| {
            let before = active_position(tx, board_id, item_id)?
                .ok_or_else(|| not_positioned(board_id, item_id))?;
            let mut after = before.clone();
            after.deleted_at_ms = Some(tx.now_ms());
            put_position_row(tx, &after, tx.now_ms())?;
            tx.record_action(
                NewAction::new(
                    session_id,
                    ActionKind::BoardUnposition,
                    EntityType::BoardPosition,
                    position_entity_id(board_id, item_id),
                )
                .previous(EntitySnapshot::of(&before)?)
                .new_state(EntitySnapshot::of(&after)?),
            )?;
            Ok(after)
        })
    }

    pub fn positions(&self, board_id: &str) -> Result<Vec<BoardPosition>, StoreError> {
        require_board(&self.conn, board_id)?;
        active_positions(&self.conn, board_id)
    }

    pub fn position_of(
        &self,
        board_id: &str,
        item_id: &str,
    ) -> Result<Option<BoardPosition>, StoreError> {
        active_position(&self.conn, board_id, item_id)
    }

    /// Key that places a new entry at visual `slot` (1-based). May respace the
    /// board first; the rewritten rows are returned for the caller to report.
    pub fn compute_insert_position(
        &mut self,
        session_id: &str,
        board_id: &str,
        slot: usize,
    ) -> Result<InsertPosition, StoreError> {
        self.write(|tx| {
            require_board(tx, board_id)?;
            insert_position_tx(tx, session_id, board_id, slot, None)
        })
    }

    pub fn respace(
        &mut self,
        session_id: &str,
        board_id: &str,
    ) -> Result<Vec<PositionChange>, StoreError> {
        self.write(|tx| {
            require_board(tx, board_id)?;
            respace_tx(tx, session_id, board_id)
        })
    }

    /// Exchanges the keys of two positioned items.
    pub fn swap_positions(
        &mut self,
        session_id: &str,
        board_id: &str,
        item_a: &str,
        item_b: &str,
    ) -> Result<(BoardPosition, BoardPosition), StoreError> {
        if item_a == item_b {
            return Err(StoreError::InvalidInput("cannot swap an item with itself"));
        }
        self.write(|tx| {
            require_board(tx, board_id)?;
            let a = active_position(tx, board_id, item_a)?
                .ok_or_else(|| not_positioned(board_id, item_a))?;
            let b = active_position(tx, board_id, item_b)?
                .ok_or_else(|| not_positioned(board_id, item_b))?;

            let swapped_a = BoardPosition {
                position: b.position,
                ..a.clone()
            };
            let swapped_b = BoardPosition {
                position: a.position,
                ..b.clone()
            };
            put_position_row(tx, &swapped_a, tx.now_ms())?;
            put_position_row(tx, &swapped_b, tx.now_ms())?;
            tx.record_action(
                NewAction::new(
                    session_id,
                    ActionKind::BoardSwap,
                    EntityType::BoardPosition,
                    position_entity_id(board_id, item_a),
                )
                .previous(EntitySnapshot::of(&vec![a, b])?)
                .new_state(EntitySnapshot::of(&vec![
                    swapped_a.clone(),
                    swapped_b.clone(),
                ])?),
            )?;
            Ok((swapped_a, swapped_b))
        })
    }

    /// Places `item_id` at visual `slot`, ignoring its own current key when
    /// picking neighbours.
    pub fn move_to_slot(
        &mut self,
        session_id: &str,
        board_id: &str,
        item_id: &str,
        slot: usize,
    ) -> Result<BoardPosition, StoreError> {
        self.write(|tx| {
            require_board(tx, board_id)?;
            require_live_item(tx, item_id)?;
            let insert = insert_position_tx(tx, session_id, board_id, slot, Some(item_id))?;
            set_position_tx(tx, session_id, board_id, item_id, insert.position)
        })
    }

    /// Board order for the items a query produced, in `natural` order.
    pub fn board_view(&self, board_id: &str, natural: &[String]) -> Result<Vec<String>, StoreError> {
        let positions = self.positions(board_id)?;
        Ok(compose_board_order(&positions, natural))
    }
}

fn set_position_tx(
    tx: &WriteTx<'_>,
    session_id: &str,
    board_id: &str,
    item_id: &str,
    position: i64,
) -> Result<BoardPosition, StoreError> {
    let before = position_row(tx, board_id, item_id)?;
    let after = BoardPosition {
        board_id: board_id.to_string(),
        item_id: item_id.to_string(),
        position,
        deleted_at_ms: None,
    };
    put_position_row(tx, &after, tx.now_ms())?;
    let previous = match &before {
        Some(row) => EntitySnapshot::of(row)?,
        None => EntitySnapshot::empty(),
    };
    tx.record_action(
        NewAction::new(
            session_id,
            ActionKind::BoardSetPosition,
            EntityType::BoardPosition,
            position_entity_id(board_id, item_id),
        )
        .previous(previous)
        .new_state(EntitySnapshot::of(&after)?),
    )?;
    Ok(after)
}

fn insert_position_tx(
    tx: &WriteTx<'_>,
    session_id: &str,
    board_id: &str,
    slot: usize,
    exclude: Option<&str>,
) -> Result<InsertPosition, StoreError> {
    let keys = neighbour_keys(tx, board_id, exclude)?;
    if let Plan::At(position) = plan(&keys, slot) {
        return Ok(InsertPosition {
            position,
            respaced: Vec::new(),
        });
    }

    let respaced = respace_tx(tx, session_id, board_id)?;
    let keys = neighbour_keys(tx, board_id, exclude)?;
    match plan(&keys, slot) {
        Plan::At(position) => Ok(InsertPosition { position, respaced }),
        Plan::NeedsRespace => Err(StoreError::InvalidInput("board position space exhausted")),
    }
}

/// Reassigns every active row to `(i + 1) * POSITION_GAP` in current order.
/// Only rows whose key changed are reported.
pub(super) fn respace_tx(
    tx: &WriteTx<'_>,
    session_id: &str,
    board_id: &str,
) -> Result<Vec<PositionChange>, StoreError> {
    let rows = active_positions(tx, board_id)?;
    let mut changes = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        let step = i64::try_from(index + 1)
            .map_err(|_| StoreError::InvalidInput("board has too many positions"))?;
        let new_position = step
            .checked_mul(POSITION_GAP)
            .ok_or(StoreError::InvalidInput("board has too many positions"))?;
        if new_position == row.position {
            continue;
        }
        tx.execute(
            "UPDATE board_item_positions SET position=?3 WHERE board_id=?1 AND item_id=?2",
            params![board_id, row.item_id, new_position],
        )?;
        changes.push(PositionChange {
            item_id: row.item_id.clone(),
            old_position: row.position,
            new_position,
        });
    }

    if !changes.is_empty() {
        append_sync_tx(
            tx,
            tx.now_ms(),
            &NewSyncHistoryEntry {
                session_id: session_id.to_string(),
                action: SYNC_ACTION_RESPACE.to_string(),
                entity_type: EntityType::BoardPosition.as_str().to_string(),
                entity_id: board_id.to_string(),
                data: serde_json::to_string(&changes)?,
            },
        )?;
    }
    info!(
        board = board_id,
        rows = rows.len(),
        changed = changes.len(),
        "board respaced"
    );
    Ok(changes)
}

fn neighbour_keys(
    conn: &Connection,
    board_id: &str,
    exclude: Option<&str>,
) -> Result<Vec<i64>, StoreError> {
    Ok(active_positions(conn, board_id)?
        .into_iter()
        .filter(|row| Some(row.item_id.as_str()) != exclude)
        .map(|row| row.position)
        .collect())
}

pub(super) fn active_positions(
    conn: &Connection,
    board_id: &str,
) -> Result<Vec<BoardPosition>, StoreError> {
    let mut stmt = conn.prepare(
        r#"
        SELECT board_id, item_id, position, deleted_at_ms
        FROM board_item_positions
        WHERE board_id=?1 AND deleted_at_ms IS NULL
        ORDER BY position ASC, item_id ASC
        "#,
    )?;
    let rows = stmt.query_map(params![board_id], position_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Every row of the board, soft-deleted ones included.
pub(super) fn all_positions(
    conn: &Connection,
    board_id: &str,
) -> Result<Vec<BoardPosition>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT board_id, item_id, position, deleted_at_ms FROM board_item_positions WHERE board_id=?1 ORDER BY item_id ASC",
    )?;
    let rows = stmt.query_map(params![board_id], position_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn active_position(
    conn: &Connection,
    board_id: &str,
    item_id: &str,
) -> Result<Option<BoardPosition>, StoreError> {
    Ok(position_row(conn, board_id, item_id)?.filter(|row| row.deleted_at_ms.is_none()))
}

/// Includes soft-deleted rows.
fn position_row(
    conn: &Connection,
    board_id: &str,
    item_id: &str,
) -> Result<Option<BoardPosition>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT board_id, item_id, position, deleted_at_ms FROM board_item_positions WHERE board_id=?1 AND item_id=?2",
            params![board_id, item_id],
            position_from_row,
        )
        .optional()?)
}

pub(super) fn put_position_row(
    conn: &Connection,
    row: &BoardPosition,
    now_ms: i64,
) -> Result<(), StoreError> {
    conn.execute(
        r#"
        INSERT INTO board_item_positions(board_id, item_id, position, added_at_ms, deleted_at_ms)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(board_id, item_id) DO UPDATE SET
          position=excluded.position,
          deleted_at_ms=excluded.deleted_at_ms
        "#,
        params![
            row.board_id,
            row.item_id,
            row.position,
            now_ms,
            row.deleted_at_ms
        ],
    )?;
    Ok(())
}

pub(super) fn delete_position_row(
    conn: &Connection,
    board_id: &str,
    item_id: &str,
) -> Result<(), StoreError> {
    conn.execute(
        "DELETE FROM board_item_positions WHERE board_id=?1 AND item_id=?2",
        params![board_id, item_id],
    )?;
    Ok(())
}

fn position_entity_id(board_id: &str, item_id: &str) -> String {
    format!("{board_id}:{item_id}")
}

fn not_positioned(board_id: &str, item_id: &str) -> StoreError {
    StoreError::NotPositioned {
        board_id: board_id.to_string(),
        item_id: item_id.to_string(),
    }
}

fn position_from_row(row: &Row<'_>) -> rusqlite::Result<BoardPosition> {
    Ok(BoardPosition {
        board_id: row.get(0)?,
        item_id: row.get(1)?,
        position: row.get(2)?,
        deleted_at_ms: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(item_id: &str, position: i64) -> BoardPosition {
        BoardPosition {
            board_id: "bd-test".to_string(),
            item_id: item_id.to_string(),
            position,
            deleted_at_ms: None,
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn plan_edges() {
        assert_eq!(plan(&[], 1), Plan::At(POSITION_GAP));
        assert_eq!(plan(&[], 7), Plan::At(POSITION_GAP));
        assert_eq!(plan(&[100, 200], 0), Plan::At(100 - POSITION_GAP));
        assert_eq!(plan(&[100, 200], 1), Plan::At(100 - POSITION_GAP));
        assert_eq!(plan(&[100, 200], 3), Plan::At(200 + POSITION_GAP));
        assert_eq!(plan(&[100, 200], 99), Plan::At(200 + POSITION_GAP));
    }

    #[test]
    fn plan_midpoint_and_collision() {
        assert_eq!(plan(&[100, 200], 2), Plan::At(150));
        assert_eq!(plan(&[100, 102], 2), Plan::At(101));
        assert_eq!(plan(&[100, 101], 2), Plan::NeedsRespace);
        assert_eq!(plan(&[5, 5], 2), Plan::NeedsRespace);
        assert_eq!(plan(&[i64::MIN + 1, i64::MAX], 2), Plan::At(0));
        assert_eq!(plan(&[i64::MAX - 2, i64::MAX], 2), Plan::At(i64::MAX - 1));
    }

    #[test]
    fn plan_overflow_requests_respace() {
        assert_eq!(plan(&[i64::MIN + 1, 0], 1), Plan::NeedsRespace);
        assert_eq!(plan(&[0, i64::MAX - 1], 3), Plan::NeedsRespace);
    }

    #[test]
    fn compose_puts_positioned_first() {
        let positions = vec![row("c", 2 * POSITION_GAP), row("a", POSITION_GAP)];
        let natural = ids(&["x", "a", "y", "c", "z"]);
        assert_eq!(
            compose_board_order(&positions, &natural),
            ids(&["a", "c", "x", "y", "z"])
        );
    }

    #[test]
    fn compose_skips_positions_outside_query() {
        let mut deleted = row("b", 10);
        deleted.deleted_at_ms = Some(1);
        let positions = vec![row("gone", 1), deleted, row("a", 20)];
        let natural = ids(&["b", "a"]);
        assert_eq!(compose_board_order(&positions, &natural), ids(&["a", "b"]));
    }
}

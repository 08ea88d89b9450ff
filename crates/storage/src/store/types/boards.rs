#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

pub const BUILTIN_BOARD_ID: &str = "bd-all-issues";
pub const BUILTIN_BOARD_NAME: &str = "All Issues";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub name: String,
    pub query: String,
    pub is_builtin: bool,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardPosition {
    pub board_id: String,
    pub item_id: String,
    pub position: i64,
    pub deleted_at_ms: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionChange {
    pub item_id: String,
    pub old_position: i64,
    pub new_position: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InsertPosition {
    pub position: i64,
    /// Rows rewritten by a respace that ran to make room; empty otherwise.
    pub respaced: Vec<PositionChange>,
}

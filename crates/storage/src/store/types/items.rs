#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use wt_core::model::{ItemType, Status};

pub const DEPENDS_ON: &str = "depends_on";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub status: Status,
    pub item_type: ItemType,
    pub parent_id: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    pub closed_at_ms: Option<i64>,
    pub deleted_at_ms: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewItem {
    pub title: String,
    pub item_type: ItemType,
    pub status: Status,
    pub parent_id: Option<String>,
}

impl NewItem {
    pub fn new(title: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            title: title.into(),
            item_type,
            status: Status::Open,
            parent_id: None,
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub item_id: String,
    pub depends_on_id: String,
    pub relation: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressLog {
    pub id: i64,
    pub item_id: String,
    pub session_id: String,
    pub message: String,
    pub log_type: String,
    pub ts_ms: i64,
}

/// Result of a status transition, including everything the cascades touched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusChange {
    pub item: Item,
    pub previous_status: Status,
    pub cascaded_parents: Vec<String>,
    pub unblocked: Vec<String>,
}

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncHistoryEntry {
    pub id: i64,
    pub session_id: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: String,
    pub ts_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewSyncHistoryEntry {
    pub session_id: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: String,
}

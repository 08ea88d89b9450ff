#![forbid(unsafe_code)]

use wt_core::EntitySnapshot;
use wt_core::model::{ActionKind, EntityType};

#[derive(Clone, Debug, PartialEq)]
pub struct ActionLogEntry {
    pub id: i64,
    pub session_id: String,
    pub kind: ActionKind,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub previous: EntitySnapshot,
    pub new: EntitySnapshot,
    pub ts_ms: i64,
    pub undone: bool,
}

impl ActionLogEntry {
    pub fn is_undoable(&self) -> bool {
        !self.undone && !self.entity_type.is_audit_only()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewAction {
    pub session_id: String,
    pub kind: ActionKind,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub previous: EntitySnapshot,
    pub new: EntitySnapshot,
}

impl NewAction {
    pub fn new(
        session_id: impl Into<String>,
        kind: ActionKind,
        entity_type: EntityType,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            kind,
            entity_type,
            entity_id: entity_id.into(),
            previous: EntitySnapshot::empty(),
            new: EntitySnapshot::empty(),
        }
    }

    pub fn previous(mut self, snapshot: EntitySnapshot) -> Self {
        self.previous = snapshot;
        self
    }

    pub fn new_state(mut self, snapshot: EntitySnapshot) -> Self {
        self.new = snapshot;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UndoOutcome {
    pub entry: ActionLogEntry,
}

#![forbid(unsafe_code)]

use super::lock::LockHolder;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("{}", lock_timeout_message(.timeout, .holder))]
    LockTimeout {
        timeout: Duration,
        holder: Option<LockHolder>,
    },
    #[error("could not generate a unique identifier after {attempts} attempts")]
    IdCollision { attempts: u32 },
    #[error("cannot modify builtin board {board_id}")]
    BuiltinProtected { board_id: String },
    #[error("item {item_id} has no position on board {board_id}")]
    NotPositioned { board_id: String, item_id: String },
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO",
            Self::Sql(_) => "SQLITE",
            Self::Json(_) => "JSON",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::LockTimeout { .. } => "LOCK_TIMEOUT",
            Self::IdCollision { .. } => "ID_COLLISION",
            Self::BuiltinProtected { .. } => "BUILTIN_PROTECTED",
            Self::NotPositioned { .. } => "NOT_POSITIONED",
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

fn lock_timeout_message(timeout: &Duration, holder: &Option<LockHolder>) -> String {
    let waited = timeout.as_millis();
    match holder {
        Some(holder) => format!(
            "timed out after {waited}ms waiting for the write lock (holder pid={}, since={}, {})",
            holder.pid,
            holder.acquired_at.to_rfc3339(),
            holder.liveness.describe()
        ),
        None => format!("timed out after {waited}ms waiting for the write lock (holder unknown)"),
    }
}

#![forbid(unsafe_code)]

use super::super::StoreError;
use rusqlite::ErrorCode;
use tracing::debug;
use wt_core::ids::IdGenerator;

pub(in crate::store) const MAX_ID_ATTEMPTS: u32 = 3;

/// Calls `insert` with freshly generated identifiers until one does not collide
/// with an existing primary key, giving up after `MAX_ID_ATTEMPTS`.
pub(in crate::store) fn insert_with_fresh_id<T>(
    ids: &mut dyn IdGenerator,
    prefix: &str,
    mut insert: impl FnMut(&str) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    for attempt in 1..=MAX_ID_ATTEMPTS {
        let id = ids.next_id(prefix);
        match insert(&id) {
            Ok(value) => return Ok(value),
            Err(StoreError::Sql(err)) if is_key_collision(&err) => {
                debug!(attempt, id = %id, "identifier collision");
            }
            Err(err) => return Err(err),
        }
    }
    Err(StoreError::IdCollision {
        attempts: MAX_ID_ATTEMPTS,
    })
}

pub(in crate::store) fn is_key_collision(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, _) => {
            code.code == ErrorCode::ConstraintViolation
                && (code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    || code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
        }
        _ => false,
    }
}

#![forbid(unsafe_code)]

use super::super::StoreError;
use rusqlite::Row;
use rusqlite::types::Type;
use wt_core::EntitySnapshot;

/// Reads a TEXT column holding one of the domain enumerations.
pub(in crate::store) fn enum_column<T>(
    row: &Row<'_>,
    index: usize,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let raw = row.get::<_, String>(index)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            Type::Text,
            format!("unexpected value {raw:?}").into(),
        )
    })
}

pub(in crate::store) fn snapshot_column(
    row: &Row<'_>,
    index: usize,
) -> rusqlite::Result<EntitySnapshot> {
    let raw = row.get::<_, String>(index)?;
    EntitySnapshot::from_data_string(&raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err)))
}

pub(in crate::store) fn to_sqlite_i64(value: usize) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::InvalidInput("numeric overflow"))
}

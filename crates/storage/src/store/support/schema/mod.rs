#![forbid(unsafe_code)]

mod sql;

use super::super::StoreError;
use super::super::types::{BUILTIN_BOARD_ID, BUILTIN_BOARD_NAME};
use rusqlite::{Connection, params};

pub(crate) const SCHEMA_VERSION: &str = "v1";

pub(in crate::store) fn install_schema(conn: &Connection, now_ms: i64) -> Result<(), StoreError> {
    conn.execute_batch(&sql::full_schema_sql())?;

    conn.execute(
        "INSERT OR IGNORE INTO meta(key, value) VALUES (?1, ?2)",
        params!["schema_version", SCHEMA_VERSION],
    )?;

    conn.execute(
        r#"
        INSERT OR IGNORE INTO boards(id, name, query, is_builtin, created_at_ms, updated_at_ms)
        VALUES (?1, ?2, '', 1, ?3, ?3)
        "#,
        params![BUILTIN_BOARD_ID, BUILTIN_BOARD_NAME, now_ms],
    )?;

    Ok(())
}

#![forbid(unsafe_code)]

mod fresh_id;
mod rows;
mod schema;
mod time;

pub(super) use fresh_id::insert_with_fresh_id;
pub(super) use rows::{enum_column, snapshot_column, to_sqlite_i64};
pub(super) use schema::install_schema;
pub(super) use time::now_ms;

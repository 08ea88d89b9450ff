#![forbid(unsafe_code)]

mod action_log;
mod boards;
mod core;
mod indexes;
mod items;
mod pragmas;
mod sync_history;

pub(super) fn full_schema_sql() -> String {
    let mut sql = String::new();
    sql.push_str(pragmas::SQL);
    sql.push_str(core::SQL);
    sql.push_str(items::SQL);
    sql.push_str(action_log::SQL);
    sql.push_str(boards::SQL);
    sql.push_str(sync_history::SQL);
    sql.push_str(indexes::SQL);
    sql
}

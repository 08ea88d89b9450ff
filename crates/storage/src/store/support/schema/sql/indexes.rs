#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE INDEX IF NOT EXISTS idx_items_parent ON items(parent_id);
        CREATE INDEX IF NOT EXISTS idx_item_dependencies_target
          ON item_dependencies(depends_on_id, relation);
        CREATE INDEX IF NOT EXISTS idx_logs_item ON logs(item_id, id);
        CREATE INDEX IF NOT EXISTS idx_action_log_session ON action_log(session_id, id);
        CREATE INDEX IF NOT EXISTS idx_board_positions_order
          ON board_item_positions(board_id, position);
"#;

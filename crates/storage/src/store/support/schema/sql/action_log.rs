#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS action_log (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          session_id TEXT NOT NULL,
          action_type TEXT NOT NULL,
          entity_type TEXT NOT NULL,
          entity_id TEXT NOT NULL,
          previous_data TEXT NOT NULL DEFAULT '',
          new_data TEXT NOT NULL DEFAULT '',
          ts_ms INTEGER NOT NULL,
          undone INTEGER NOT NULL DEFAULT 0
        );
"#;

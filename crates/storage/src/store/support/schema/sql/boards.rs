#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS boards (
          id TEXT PRIMARY KEY,
          name TEXT NOT NULL UNIQUE,
          query TEXT NOT NULL DEFAULT '',
          is_builtin INTEGER NOT NULL DEFAULT 0,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS board_item_positions (
          board_id TEXT NOT NULL,
          item_id TEXT NOT NULL,
          position INTEGER NOT NULL,
          added_at_ms INTEGER NOT NULL,
          deleted_at_ms INTEGER,
          PRIMARY KEY (board_id, item_id),
          FOREIGN KEY(board_id) REFERENCES boards(id) ON DELETE CASCADE
        );
"#;

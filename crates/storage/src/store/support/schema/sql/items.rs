#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS items (
          id TEXT PRIMARY KEY,
          title TEXT NOT NULL,
          status TEXT NOT NULL DEFAULT 'open',
          item_type TEXT NOT NULL DEFAULT 'task',
          parent_id TEXT,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          closed_at_ms INTEGER,
          deleted_at_ms INTEGER
        );

        -- `depends_on` edges may form cycles; nothing here enforces a DAG.
        CREATE TABLE IF NOT EXISTS item_dependencies (
          item_id TEXT NOT NULL,
          depends_on_id TEXT NOT NULL,
          relation TEXT NOT NULL DEFAULT 'depends_on',
          created_at_ms INTEGER NOT NULL,
          PRIMARY KEY (item_id, depends_on_id, relation),
          CHECK(item_id <> depends_on_id)
        );

        CREATE TABLE IF NOT EXISTS logs (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          item_id TEXT NOT NULL,
          session_id TEXT NOT NULL,
          message TEXT NOT NULL,
          log_type TEXT NOT NULL DEFAULT 'progress',
          ts_ms INTEGER NOT NULL
        );
"#;

//! SQL DDL for all Cortex tables.
//!
//! Defines `memories`, `memories_fts` (FTS5 external-content, porter
//! stemming), `memory_links`, `sessions`, and `metadata`. All DDL uses
//! `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- Primary memory storage
CREATE TABLE IF NOT EXISTS memories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    type TEXT NOT NULL CHECK(type IN ('short_term','long_term','episodic')),
    category TEXT NOT NULL DEFAULT 'note',
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    project TEXT NOT NULL DEFAULT '*',
    scope TEXT NOT NULL DEFAULT 'project' CHECK(scope IN ('project','global')),
    transferable INTEGER NOT NULL DEFAULT 0,
    tags TEXT NOT NULL DEFAULT '[]',
    salience REAL NOT NULL DEFAULT 0.5 CHECK(salience >= 0.0 AND salience <= 1.0),
    decayed_score REAL NOT NULL DEFAULT 0.5 CHECK(decayed_score >= 0.0 AND decayed_score <= 1.0),
    access_count INTEGER NOT NULL DEFAULT 0,
    last_accessed TEXT NOT NULL,
    created_at TEXT NOT NULL,
    metadata TEXT
);

CREATE INDEX IF NOT EXISTS idx_memories_type ON memories(type);
CREATE INDEX IF NOT EXISTS idx_memories_project ON memories(project);
CREATE INDEX IF NOT EXISTS idx_memories_category ON memories(category);
CREATE INDEX IF NOT EXISTS idx_memories_salience ON memories(salience);
CREATE INDEX IF NOT EXISTS idx_memories_decayed ON memories(decayed_score);
CREATE INDEX IF NOT EXISTS idx_memories_accessed ON memories(last_accessed);

-- Full-text search over title, content, and tags (BM25, porter stemming)
CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts USING fts5(
    title,
    content,
    tags,
    content='memories',
    content_rowid='id',
    tokenize='porter unicode61'
);

-- Typed, weighted edges between memories
CREATE TABLE IF NOT EXISTS memory_links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id INTEGER NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    target_id INTEGER NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    relationship TEXT NOT NULL CHECK(relationship IN ('references','extends','contradicts','related')),
    strength REAL NOT NULL DEFAULT 0.5 CHECK(strength >= 0.0 AND strength <= 1.0),
    created_at TEXT NOT NULL,
    UNIQUE(source_id, target_id, relationship),
    CHECK(source_id != target_id)
);

CREATE INDEX IF NOT EXISTS idx_links_source ON memory_links(source_id);
CREATE INDEX IF NOT EXISTS idx_links_target ON memory_links(target_id);

-- Bounded work periods
CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project TEXT NOT NULL,
    started_at TEXT NOT NULL,
    ended_at TEXT,
    summary TEXT,
    memories_created INTEGER NOT NULL DEFAULT 0,
    memories_accessed INTEGER NOT NULL DEFAULT 0
);

-- Engine state (schema version, consolidation bookkeeping)
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO metadata (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"memories".to_string()));
        assert!(tables.contains(&"memory_links".to_string()));
        assert!(tables.contains(&"sessions".to_string()));
        assert!(tables.contains(&"metadata".to_string()));

        // FTS virtual table answers a match query
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM memories_fts", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
    }

    #[test]
    fn self_links_rejected_by_check() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO memories (type, title, content, last_accessed, created_at) \
             VALUES ('short_term', 't', 'c', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        let id = conn.last_insert_rowid();
        let result = conn.execute(
            "INSERT INTO memory_links (source_id, target_id, relationship, strength, created_at) \
             VALUES (?1, ?1, 'related', 0.5, '2026-01-01T00:00:00Z')",
            [id],
        );
        assert!(result.is_err());
    }

    #[test]
    fn duplicate_edges_rejected_by_unique() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        for _ in 0..2 {
            conn.execute(
                "INSERT INTO memories (type, title, content, last_accessed, created_at) \
                 VALUES ('short_term', 't', 'c', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
                [],
            )
            .unwrap();
        }
        conn.execute(
            "INSERT INTO memory_links (source_id, target_id, relationship, strength, created_at) \
             VALUES (1, 2, 'related', 0.5, '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO memory_links (source_id, target_id, relationship, strength, created_at) \
             VALUES (1, 2, 'related', 0.7, '2026-01-01T00:00:00Z')",
            [],
        );
        assert!(dup.is_err());
    }
}

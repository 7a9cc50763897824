//! Forward-only schema migration framework.
//!
//! Tracks the schema version in the `metadata` table and runs sequential
//! migrations up to [`CURRENT_SCHEMA_VERSION`]. Migration v2 retrofits the
//! `decayed_score`, `scope`, and `transferable` columns onto databases created
//! before those fields existed.

use rusqlite::Connection;

/// The schema version that the current binary expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Get the current schema version from the database.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT value FROM metadata WHERE key = 'schema_version'",
        [],
        |row| {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().unwrap_or(0))
        },
    )
}

fn update_schema_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE metadata SET value = ?1 WHERE key = 'schema_version'",
        [version.to_string()],
    )?;
    Ok(())
}

/// Run any pending forward-only migrations.
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let mut version = get_schema_version(conn)?;
    tracing::debug!(schema_version = version, target = CURRENT_SCHEMA_VERSION, "checking migrations");

    while version < CURRENT_SCHEMA_VERSION {
        let next = version + 1;
        tracing::info!(from = version, to = next, "running migration");

        match next {
            2 => migrate_v1_to_v2(conn)?,
            _ => {
                tracing::error!(version = next, "unknown migration target");
                break;
            }
        }

        update_schema_version(conn, next)?;
        version = next;
    }

    Ok(())
}

/// Migration v1 → v2: add `decayed_score`, `scope`, and `transferable` to
/// `memories` if an older database lacks them.
fn migrate_v1_to_v2(conn: &Connection) -> rusqlite::Result<()> {
    if !column_exists(conn, "memories", "decayed_score")? {
        conn.execute_batch(
            "ALTER TABLE memories ADD COLUMN decayed_score REAL NOT NULL DEFAULT 0.5;
             UPDATE memories SET decayed_score = salience;",
        )?;
    }
    if !column_exists(conn, "memories", "scope")? {
        conn.execute(
            "ALTER TABLE memories ADD COLUMN scope TEXT NOT NULL DEFAULT 'project'",
            [],
        )?;
    }
    if !column_exists(conn, "memories", "transferable")? {
        conn.execute(
            "ALTER TABLE memories ADD COLUMN transferable INTEGER NOT NULL DEFAULT 0",
            [],
        )?;
    }
    Ok(())
}

/// Check `pragma table_info` for a named column.
fn column_exists(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|n| n == column))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        crate::db::schema::init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn fresh_db_starts_at_version_1() {
        let conn = test_db();
        assert_eq!(get_schema_version(&conn).unwrap(), 1);
    }

    #[test]
    fn migrations_reach_current_version() {
        let conn = test_db();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = test_db();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn v2_retrofits_missing_columns() {
        // Simulate a pre-v2 memories table without the new columns
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE memories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                type TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT 'note',
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                project TEXT NOT NULL DEFAULT '*',
                tags TEXT NOT NULL DEFAULT '[]',
                salience REAL NOT NULL DEFAULT 0.5,
                access_count INTEGER NOT NULL DEFAULT 0,
                last_accessed TEXT NOT NULL,
                created_at TEXT NOT NULL,
                metadata TEXT
            );
            CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL);
            INSERT INTO metadata (key, value) VALUES ('schema_version', '1');
            INSERT INTO memories (type, title, content, salience, last_accessed, created_at)
            VALUES ('short_term', 'old', 'row', 0.8, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z');",
        )
        .unwrap();

        run_migrations(&conn).unwrap();

        assert!(column_exists(&conn, "memories", "decayed_score").unwrap());
        assert!(column_exists(&conn, "memories", "scope").unwrap());
        assert!(column_exists(&conn, "memories", "transferable").unwrap());

        // Backfill seeds decayed_score from salience
        let decayed: f64 = conn
            .query_row("SELECT decayed_score FROM memories WHERE id = 1", [], |r| r.get(0))
            .unwrap();
        assert!((decayed - 0.8).abs() < 1e-9);
    }
}

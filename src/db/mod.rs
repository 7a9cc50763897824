//! SQLite storage layer: open/initialize, guardrails, advisory lock, health.
//!
//! The database lives at `~/.claude-cortex/memories.db` with WAL companions
//! alongside. A cooperative advisory lock file keeps other well-behaved
//! processes from opening the store for writing at the same time; it is not
//! enforced by the OS.

pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

use crate::error::{CortexError, DB_LIMIT_BYTES, DB_WARN_BYTES};

/// Open (or create) the database at the given path with pragmas, schema, and
/// migrations applied, then verify integrity.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let conn = Connection::open(path).with_context(|| {
        format!(
            "failed to open database at {}. If the file is corrupt, \
             restore from a backup or run `cortex reset` to start fresh.",
            path.display()
        )
    })?;

    // WAL for concurrent readers; checkpoint roughly every 100 pages
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "wal_autocheckpoint", "100")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    // Wait up to 10 seconds for locks instead of failing immediately
    conn.pragma_update(None, "busy_timeout", "10000")?;

    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;

    let integrity: String = conn.pragma_query_value(None, "quick_check", |row| row.get(0))?;
    if integrity != "ok" {
        anyhow::bail!(
            "database integrity check failed: {integrity}. \
             Restore from a backup (`cortex export` from a good copy, \
             then `cortex reset && cortex import backup.json`)."
        );
    }

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open a fresh in-memory database with schema and migrations applied.
/// Used by tests and by `--dry-run` style tooling.
pub fn open_memory_database() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;
    Ok(conn)
}

/// Check the on-disk size before a mutating write.
///
/// Over 100 MiB the mutation is refused with [`CortexError::DatabaseBlocked`];
/// over 50 MiB a warning diagnostic is emitted and the write proceeds.
pub fn check_size_guardrail(db_path: Option<&Path>) -> crate::error::Result<()> {
    let Some(path) = db_path else {
        return Ok(()); // in-memory database
    };
    let size = match std::fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(_) => return Ok(()), // not created yet
    };

    if size >= DB_LIMIT_BYTES {
        return Err(CortexError::DatabaseBlocked { size, limit: DB_LIMIT_BYTES });
    }
    if size >= DB_WARN_BYTES {
        tracing::warn!(
            code = "DB_SIZE_WARNING",
            size,
            limit = DB_LIMIT_BYTES,
            "database file is over the warning threshold; consider consolidating"
        );
    }
    Ok(())
}

/// Cooperative advisory lock on the database directory.
///
/// Creating the guard writes `<db>-lock` containing our pid; dropping it
/// removes the file. Other writers are expected to check for the file, not
/// forced to.
pub struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    /// Acquire the advisory lock for `db_path`. A stale lock (file already
    /// present) is logged and taken over rather than refused: the lock is
    /// cooperative and a crashed process must not brick the store.
    pub fn acquire(db_path: &Path) -> Result<Self> {
        let path = lock_path(db_path);
        if path.exists() {
            let holder = std::fs::read_to_string(&path).unwrap_or_default();
            tracing::warn!(
                lock = %path.display(),
                holder = holder.trim(),
                "advisory lock already present; taking over"
            );
        }
        std::fs::write(&path, format!("{}\n", std::process::id()))
            .with_context(|| format!("failed to write lock file {}", path.display()))?;
        tracing::debug!(lock = %path.display(), "advisory lock acquired");
        Ok(Self { path })
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            tracing::warn!(lock = %self.path.display(), %err, "failed to release advisory lock");
        }
    }
}

/// `<db>-lock` next to the database file.
pub fn lock_path(db_path: &Path) -> PathBuf {
    let mut os = db_path.as_os_str().to_owned();
    os.push("-lock");
    PathBuf::from(os)
}

/// Result of a full database health check.
#[derive(Debug)]
pub struct HealthReport {
    pub schema_version: u32,
    pub integrity_ok: bool,
    pub integrity_details: String,
    pub memory_count: i64,
    pub link_count: i64,
    pub session_count: i64,
    pub db_size_bytes: u64,
}

/// Run a comprehensive health check on the database.
pub fn check_database_health(conn: &Connection, db_path: Option<&Path>) -> Result<HealthReport> {
    let schema_version =
        migrations::get_schema_version(conn).context("failed to read schema version")?;

    let integrity_details: String = conn
        .pragma_query_value(None, "integrity_check", |row| row.get(0))
        .context("failed to run integrity check")?;
    let integrity_ok = integrity_details == "ok";

    let memory_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))
        .unwrap_or(0);
    let link_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM memory_links", [], |row| row.get(0))
        .unwrap_or(0);
    let session_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
        .unwrap_or(0);

    let db_size_bytes = db_path
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(HealthReport {
        schema_version,
        integrity_ok,
        integrity_details,
        memory_count,
        link_count,
        session_count,
        db_size_bytes,
    })
}

/// Read or write a key in the `metadata` table.
pub fn get_metadata(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    use rusqlite::OptionalExtension;
    conn.query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| row.get(0))
        .optional()
}

pub fn set_metadata(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        [key, value],
    )?;
    Ok(())
}

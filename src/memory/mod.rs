//! Core memory engine — lifecycle, retrieval, linking, and maintenance.
//!
//! The write path lives in [`store`], the read path in [`search`], the link
//! graph in [`links`], deletion in [`forget`], the maintenance pass in
//! [`consolidate`], and the pure scoring math in [`decay`] and [`salience`].
//! Type definitions live in [`types`].

pub mod consolidate;
pub mod context;
pub mod decay;
pub mod export;
pub mod forget;
pub mod links;
pub mod salience;
pub mod search;
pub mod sessions;
pub mod similarity;
pub mod stats;
pub mod store;
pub mod types;

use chrono::{DateTime, Utc};
use rusqlite::Row;

use crate::error::Result;
use types::{Memory, MemoryType};

/// Canonical column list for reading a full [`Memory`]; keep in sync with
/// [`memory_from_row`].
pub(crate) const MEMORY_COLUMNS: &str = "id, type, category, title, content, project, scope, \
     transferable, tags, salience, decayed_score, access_count, last_accessed, created_at, metadata";

/// Map a row selected with [`MEMORY_COLUMNS`] to a [`Memory`].
pub(crate) fn memory_from_row(row: &Row<'_>) -> rusqlite::Result<Memory> {
    let type_str: String = row.get(1)?;
    let category_str: String = row.get(2)?;
    let scope_str: String = row.get(6)?;
    let tags_json: String = row.get(8)?;
    let metadata_json: Option<String> = row.get(14)?;

    Ok(Memory {
        id: row.get(0)?,
        memory_type: type_str.parse().map_err(|_| rusqlite::Error::InvalidQuery)?,
        category: category_str.parse().map_err(|_| rusqlite::Error::InvalidQuery)?,
        title: row.get(3)?,
        content: row.get(4)?,
        project: row.get(5)?,
        scope: scope_str.parse().map_err(|_| rusqlite::Error::InvalidQuery)?,
        transferable: row.get::<_, i64>(7)? != 0,
        // parse defensively: a mangled tags column degrades to no tags
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        salience: row.get(9)?,
        decayed_score: row.get(10)?,
        access_count: row.get(11)?,
        last_accessed: row.get(12)?,
        created_at: row.get(13)?,
        metadata: metadata_json.and_then(|s| serde_json::from_str(&s).ok()),
    })
}

/// Current wall time as RFC 3339.
pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Hours elapsed from an RFC 3339 timestamp to now. An unparseable timestamp
/// counts as just-now so the row decays normally rather than evaporating.
pub(crate) fn hours_since(timestamp: &str) -> f64 {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(ts) => {
            let delta = Utc::now().signed_duration_since(ts.with_timezone(&Utc));
            delta.num_milliseconds() as f64 / 3_600_000.0
        }
        Err(_) => 0.0,
    }
}

/// Freshly computed decayed score for a memory row.
pub(crate) fn current_decayed_score(memory: &Memory, decay_rate: f64) -> f64 {
    decay::decayed_score(
        memory.salience,
        memory.memory_type,
        hours_since(&memory.last_accessed),
        memory.access_count,
        decay_rate,
    )
}

// ── FTS5 external-content synchronization ────────────────────────────────────
//
// With content='memories' the index does not own its rows: inserts, updates,
// and deletes must be mirrored by hand, and deletes must replay the old
// column values.

pub(crate) fn fts_insert(
    conn: &rusqlite::Connection,
    id: i64,
    title: &str,
    content: &str,
    tags: &[String],
) -> Result<()> {
    conn.execute(
        "INSERT INTO memories_fts (rowid, title, content, tags) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![id, title, content, tags.join(" ")],
    )?;
    Ok(())
}

pub(crate) fn fts_delete(
    conn: &rusqlite::Connection,
    id: i64,
    title: &str,
    content: &str,
    tags: &[String],
) -> Result<()> {
    conn.execute(
        "INSERT INTO memories_fts (memories_fts, rowid, title, content, tags) \
         VALUES ('delete', ?1, ?2, ?3, ?4)",
        rusqlite::params![id, title, content, tags.join(" ")],
    )?;
    Ok(())
}

/// Delete a memory row together with its index entry. Link edges cascade via
/// foreign keys.
pub(crate) fn delete_memory_row(conn: &rusqlite::Connection, memory: &Memory) -> Result<()> {
    fts_delete(conn, memory.id, &memory.title, &memory.content, &memory.tags)?;
    conn.execute("DELETE FROM memories WHERE id = ?1", [memory.id])?;
    Ok(())
}

/// Rewrite a memory's title/content/tags, keeping the FTS index in sync.
pub(crate) fn rewrite_memory_text(
    conn: &rusqlite::Connection,
    old: &Memory,
    title: &str,
    content: &str,
    tags: &[String],
) -> Result<()> {
    fts_delete(conn, old.id, &old.title, &old.content, &old.tags)?;
    conn.execute(
        "UPDATE memories SET title = ?1, content = ?2, tags = ?3 WHERE id = ?4",
        rusqlite::params![title, content, serde_json::to_string(tags)?, old.id],
    )?;
    fts_insert(conn, old.id, title, content, tags)?;
    Ok(())
}

/// Fetch a single memory by id.
pub fn get_memory(conn: &rusqlite::Connection, id: i64) -> Result<Memory> {
    use rusqlite::OptionalExtension;
    conn.query_row(
        &format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1"),
        [id],
        memory_from_row,
    )
    .optional()?
    .ok_or(crate::error::CortexError::MemoryNotFound(id))
}

/// Count live rows of one lifecycle class.
pub(crate) fn count_of_type(
    conn: &rusqlite::Connection,
    memory_type: MemoryType,
) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM memories WHERE type = ?1",
        [memory_type.as_str()],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hours_since_recent_timestamp_is_small() {
        let now = now_rfc3339();
        assert!(hours_since(&now).abs() < 0.01);
    }

    #[test]
    fn hours_since_garbage_is_zero() {
        assert_eq!(hours_since("not a timestamp"), 0.0);
    }

    #[test]
    fn hours_since_past_timestamp() {
        let past = (Utc::now() - chrono::Duration::hours(5)).to_rfc3339();
        let hours = hours_since(&past);
        assert!((hours - 5.0).abs() < 0.01);
    }
}

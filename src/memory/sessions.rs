//! Session lifecycle — bounded work periods with creation/access accounting.
//!
//! Counts are derived at end time by comparing memory timestamps against the
//! session window, so nothing has to thread a session id through every write.

use rusqlite::{params, Connection, OptionalExtension};

use crate::config::CortexConfig;
use crate::error::{CortexError, Result};
use crate::memory::store::{add_memory, NewMemory};
use crate::memory::types::{Category, MemoryType, Session};

/// Open a new session for a project.
pub fn start_session(conn: &Connection, project: &str) -> Result<Session> {
    let now = super::now_rfc3339();
    conn.execute(
        "INSERT INTO sessions (project, started_at) VALUES (?1, ?2)",
        params![project, now],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(session = id, project, "session started");

    Ok(Session {
        id,
        project: project.to_string(),
        started_at: now,
        ended_at: None,
        summary: None,
        memories_created: 0,
        memories_accessed: 0,
    })
}

/// Close a session: stamp the end time, tally created/accessed counts over
/// its window, and (when a summary is supplied) store it as an episodic
/// memory so the period leaves a time-anchored trace.
pub fn end_session(
    conn: &mut Connection,
    session_id: i64,
    summary: Option<&str>,
    config: &CortexConfig,
) -> Result<Session> {
    let session = get_session(conn, session_id)?;
    let now = super::now_rfc3339();

    let created: i64 = conn.query_row(
        "SELECT COUNT(*) FROM memories WHERE project = ?1 AND created_at >= ?2",
        params![session.project, session.started_at],
        |row| row.get(0),
    )?;
    let accessed: i64 = conn.query_row(
        "SELECT COUNT(*) FROM memories \
         WHERE project = ?1 AND access_count > 0 AND last_accessed >= ?2",
        params![session.project, session.started_at],
        |row| row.get(0),
    )?;

    conn.execute(
        "UPDATE sessions SET ended_at = ?1, summary = ?2, memories_created = ?3, \
         memories_accessed = ?4 WHERE id = ?5",
        params![now, summary, created, accessed, session_id],
    )?;

    if let Some(text) = summary.filter(|s| !s.trim().is_empty()) {
        add_memory(
            conn,
            NewMemory {
                title: format!("Session summary — {}", session.project),
                content: text.to_string(),
                memory_type: Some(MemoryType::Episodic),
                category: Some(Category::Context),
                project: Some(session.project.clone()),
                ..Default::default()
            },
            config,
            None,
        )?;
    }

    tracing::info!(session = session_id, created, accessed, "session ended");
    get_session(conn, session_id)
}

/// Fetch a session by id.
pub fn get_session(conn: &Connection, session_id: i64) -> Result<Session> {
    conn.query_row(
        "SELECT id, project, started_at, ended_at, summary, memories_created, \
         memories_accessed FROM sessions WHERE id = ?1",
        [session_id],
        |row| {
            Ok(Session {
                id: row.get(0)?,
                project: row.get(1)?,
                started_at: row.get(2)?,
                ended_at: row.get(3)?,
                summary: row.get(4)?,
                memories_created: row.get(5)?,
                memories_accessed: row.get(6)?,
            })
        },
    )
    .optional()?
    .ok_or(CortexError::SessionNotFound(session_id))
}

//! JSON export and additive, idempotent import.
//!
//! The wire format is a JSON array of full [`Memory`] rows with canonical
//! field names. Import assigns fresh ids and silently skips rows whose
//! `(project, title, created_at)` triple is already present, so replaying an
//! export is a no-op.

use rusqlite::{params, Connection};

use crate::error::Result;
use crate::memory::types::Memory;

/// Export memories as rows, ready for JSON serialization.
///
/// With a project filter, the project's own rows come out along with any
/// global-scope rows marked transferable. Without one, everything does.
pub fn export_memories(conn: &Connection, project: Option<&str>) -> Result<Vec<Memory>> {
    let sql = match project {
        Some(_) => format!(
            "SELECT {} FROM memories \
             WHERE project = ?1 OR (transferable != 0 AND scope = 'global') \
             ORDER BY created_at, id",
            super::MEMORY_COLUMNS
        ),
        None => format!("SELECT {} FROM memories ORDER BY created_at, id", super::MEMORY_COLUMNS),
    };

    let mut stmt = conn.prepare(&sql)?;
    let rows = match project {
        Some(p) => stmt
            .query_map([p], super::memory_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
        None => stmt
            .query_map([], super::memory_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };
    Ok(rows)
}

/// Import memories, additive and idempotent. Returns how many rows landed.
///
/// Incoming ids are ignored; every imported row gets a fresh id. Duplicate
/// `(project, title, created_at)` triples are skipped silently.
pub fn import_memories(conn: &mut Connection, memories: &[Memory]) -> Result<usize> {
    let tx = conn.transaction()?;
    let mut imported = 0;

    for memory in memories {
        let exists: bool = tx.query_row(
            "SELECT COUNT(*) > 0 FROM memories \
             WHERE project = ?1 AND title = ?2 AND created_at = ?3",
            params![memory.project, memory.title, memory.created_at],
            |row| row.get(0),
        )?;
        if exists {
            continue;
        }

        tx.execute(
            "INSERT INTO memories (type, category, title, content, project, scope, \
             transferable, tags, salience, decayed_score, access_count, last_accessed, \
             created_at, metadata) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                memory.memory_type.as_str(),
                memory.category.as_str(),
                memory.title,
                memory.content,
                memory.project,
                memory.scope.as_str(),
                memory.transferable as i64,
                serde_json::to_string(&memory.tags)?,
                memory.salience.clamp(0.0, 1.0),
                memory.decayed_score.clamp(0.0, 1.0),
                memory.access_count,
                memory.last_accessed,
                memory.created_at,
                memory.metadata.as_ref().map(|m| m.to_string()),
            ],
        )?;
        let id = tx.last_insert_rowid();
        super::fts_insert(&tx, id, &memory.title, &memory.content, &memory.tags)?;
        imported += 1;
    }

    tx.commit()?;
    tracing::info!(imported, skipped = memories.len() - imported, "import complete");
    Ok(imported)
}

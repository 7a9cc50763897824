//! Session-start context: a structured digest of what matters for a project.
//!
//! Pulls the strongest architecture decisions, conventions, open todos, and
//! recently touched memories; with a query, the top relevant hits come along
//! too. Rendering into prose is the host's job.

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::config::CortexConfig;
use crate::error::Result;
use crate::memory::search::{search_memories, SearchParams};

/// Entries surfaced per section.
const SECTION_LIMIT: usize = 5;

/// A compact reference to a memory inside a context digest.
#[derive(Debug, Serialize)]
pub struct ContextItem {
    pub id: i64,
    pub title: String,
    pub category: String,
    pub salience: f64,
}

/// Structured context summary returned by `get_context`.
#[derive(Debug, Serialize)]
pub struct ContextSummary {
    pub project: String,
    /// Architecture memories, strongest first.
    pub key_decisions: Vec<ContextItem>,
    /// Patterns and preferences in force.
    pub conventions: Vec<ContextItem>,
    /// Open todo items, newest first.
    pub pending: Vec<ContextItem>,
    /// Most recently accessed memories.
    pub recent: Vec<ContextItem>,
    /// Hits for the caller's query, when one was given.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub relevant: Vec<ContextItem>,
}

/// Build the context digest for a project.
pub fn get_context(
    conn: &Connection,
    query: Option<&str>,
    project: &str,
    config: &CortexConfig,
) -> Result<ContextSummary> {
    let key_decisions = section(
        conn,
        project,
        "category = 'architecture'",
        "salience DESC",
    )?;
    let conventions = section(
        conn,
        project,
        "category IN ('pattern', 'preference')",
        "salience DESC",
    )?;
    let pending = section(conn, project, "category = 'todo'", "created_at DESC")?;
    let recent = section(conn, project, "access_count > 0", "last_accessed DESC")?;

    let relevant = match query.map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => {
            let params = SearchParams {
                query: Some(q.to_string()),
                project: Some(project.to_string()),
                limit: SECTION_LIMIT,
                ..Default::default()
            };
            search_memories(conn, &params, config)?
                .into_iter()
                .map(|r| ContextItem {
                    id: r.memory.id,
                    title: r.memory.title,
                    category: r.memory.category.as_str().to_string(),
                    salience: r.memory.salience,
                })
                .collect()
        }
        None => Vec::new(),
    };

    Ok(ContextSummary {
        project: project.to_string(),
        key_decisions,
        conventions,
        pending,
        recent,
        relevant,
    })
}

/// One section: project-scoped (plus global) rows matching a predicate.
fn section(
    conn: &Connection,
    project: &str,
    predicate: &str,
    order: &str,
) -> Result<Vec<ContextItem>> {
    let sql = format!(
        "SELECT id, title, category, salience FROM memories \
         WHERE (project = ?1 OR scope = 'global') AND {predicate} \
         ORDER BY {order} LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![project, SECTION_LIMIT as i64], |row| {
            Ok(ContextItem {
                id: row.get(0)?,
                title: row.get(1)?,
                category: row.get(2)?,
                salience: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

//! Write path — content capping, scoring, storage, and auto-linking.
//!
//! [`add_memory`] is the single insert entry point. It runs the full pipeline
//! inside a transaction: enforce the content cap, score salience, suggest a
//! category, extract tags, insert into the memories table, sync the FTS5
//! index, and auto-link against similar neighbors. [`access_memory`] is the
//! single-memory reinforcement step.

use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;

use crate::config::CortexConfig;
use crate::db;
use crate::error::{CortexError, Result, MAX_CONTENT_BYTES};
use crate::memory::salience::{extract_tags, score_salience, suggest_category, Importance};
use crate::memory::types::{Category, Memory, MemoryType, Scope, GLOBAL_PROJECT};
use crate::memory::{decay, links};

/// Appended to content that had to be cut down to the 10 KiB cap.
pub const TRUNCATION_MARKER: &str = "\n[truncated]";

/// Maximum title length, in characters.
const MAX_TITLE_CHARS: usize = 200;

/// Most tags kept per memory.
const MAX_TAGS: usize = 12;

/// Caller input for a new memory. Unset fields are derived from the text.
#[derive(Debug, Clone, Default)]
pub struct NewMemory {
    pub title: String,
    pub content: String,
    /// Defaults to short-term.
    pub memory_type: Option<MemoryType>,
    pub category: Option<Category>,
    pub tags: Vec<String>,
    /// Explicit base importance; computed from the text when absent.
    pub salience: Option<f64>,
    pub importance: Option<Importance>,
    /// Defaults to the global sentinel.
    pub project: Option<String>,
    pub scope: Option<Scope>,
    pub transferable: bool,
    pub metadata: Option<serde_json::Value>,
    /// Raise `CONTENT_TOO_LARGE` instead of truncating oversized content.
    pub strict: bool,
}

/// Result returned from an insert.
#[derive(Debug, Serialize)]
pub struct AddMemoryResult {
    pub id: i64,
    pub category: Category,
    pub salience: f64,
    pub tags: Vec<String>,
    /// Ids auto-linked to the new memory.
    pub linked: Vec<i64>,
    /// Short-term count crossed the soft threshold; the host should schedule
    /// an asynchronous consolidation.
    pub needs_consolidation: bool,
}

/// Full write path: cap → score → insert → FTS sync → auto-link.
pub fn add_memory(
    conn: &mut Connection,
    input: NewMemory,
    config: &CortexConfig,
    db_path: Option<&Path>,
) -> Result<AddMemoryResult> {
    db::check_size_guardrail(db_path)?;

    let content = cap_content(&input.content, input.strict)?;
    let title = truncate_chars(&input.title, MAX_TITLE_CHARS);

    let salience = match input.salience {
        Some(s) => s.clamp(0.0, 1.0),
        None => score_salience(&title, &content, input.importance),
    };
    let category = input.category.unwrap_or_else(|| suggest_category(&title, &content));
    let tags = extract_tags(&title, &content, &input.tags, MAX_TAGS);

    let project = input.project.unwrap_or_else(|| GLOBAL_PROJECT.to_string());
    let scope = input.scope.unwrap_or(if project == GLOBAL_PROJECT {
        Scope::Global
    } else {
        Scope::Project
    });
    let memory_type = input.memory_type.unwrap_or(MemoryType::ShortTerm);
    let now = super::now_rfc3339();

    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO memories (type, category, title, content, project, scope, transferable, \
         tags, salience, decayed_score, access_count, last_accessed, created_at, metadata) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, 0, ?10, ?10, ?11)",
        params![
            memory_type.as_str(),
            category.as_str(),
            title,
            content,
            project,
            scope.as_str(),
            input.transferable as i64,
            serde_json::to_string(&tags)?,
            salience,
            now,
            input.metadata.as_ref().map(|m| m.to_string()),
        ],
    )?;
    let id = tx.last_insert_rowid();

    super::fts_insert(&tx, id, &title, &content, &tags)?;

    let linked = links::auto_link(&tx, id, &title, &content, &tags, &project)?;

    tx.commit()?;

    let short_count = super::count_of_type(conn, MemoryType::ShortTerm)?;
    let needs_consolidation = short_count > config.soft_short_term_threshold();

    tracing::debug!(id, %category, salience, links = linked.len(), "memory stored");

    Ok(AddMemoryResult { id, category, salience, tags, linked, needs_consolidation })
}

/// Reinforce a single memory: bump its access count, refresh `last_accessed`,
/// and boost salience by a diminishing amount. Also strengthens links to other
/// memories accessed within the co-access window.
pub fn access_memory(conn: &mut Connection, id: i64) -> Result<Memory> {
    let memory = super::get_memory(conn, id)?;
    let boosted =
        (memory.salience + decay::access_boost(memory.access_count)).clamp(0.0, 1.0);
    let now = super::now_rfc3339();

    let tx = conn.transaction()?;
    tx.execute(
        "UPDATE memories SET access_count = access_count + 1, last_accessed = ?1, salience = ?2 \
         WHERE id = ?3",
        params![now, boosted, id],
    )?;
    links::reinforce_co_access(&tx, id)?;
    tx.commit()?;

    super::get_memory(conn, id)
}

/// Enforce the 10 KiB content cap: reject in strict mode, otherwise truncate
/// at a char boundary and append the truncation marker.
fn cap_content(content: &str, strict: bool) -> Result<String> {
    if content.len() <= MAX_CONTENT_BYTES {
        return Ok(content.to_string());
    }
    if strict {
        return Err(CortexError::ContentTooLarge {
            size: content.len(),
            max: MAX_CONTENT_BYTES,
        });
    }

    let budget = MAX_CONTENT_BYTES - TRUNCATION_MARKER.len();
    let mut cut = budget;
    while !content.is_char_boundary(cut) {
        cut -= 1;
    }
    Ok(format!("{}{}", &content[..cut], TRUNCATION_MARKER))
}

/// Truncate to a maximum number of characters at a clean boundary.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

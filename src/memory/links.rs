//! Link graph — typed, weighted edges with auto-linking and Hebbian
//! reinforcement.
//!
//! Edges are rows in `memory_links`, keyed by the ordered
//! (source, target, relationship) triple. Memories that activate together
//! within the co-access window link together; strength saturates at 1.0 and
//! is never explicitly decayed.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::HashMap;

use crate::error::{CortexError, Result};
use crate::memory::similarity::{jaccard_from_sets, tokenize};
use crate::memory::types::{MemoryLink, Relationship};

/// Two accesses count as "together" when they land within this window.
pub const CO_ACCESS_WINDOW_SECS: i64 = 300;

/// New co-access edges start here.
const CO_ACCESS_INITIAL_STRENGTH: f64 = 0.1;

/// Existing edges strengthen by this much per co-access.
const CO_ACCESS_STEP: f64 = 0.05;

/// Content similarity floor below which auto-linking does not fire.
const RELATEDNESS_FLOOR: f64 = 0.1;

/// Most edges created per insert.
const MAX_AUTO_LINKS: usize = 3;

/// Candidate pool size for auto-linking.
const AUTO_LINK_CANDIDATES: usize = 20;

/// A neighbor returned from [`get_related`].
#[derive(Debug, Clone, Serialize)]
pub struct Neighbor {
    pub id: i64,
    pub title: String,
    pub strength: f64,
    /// `true` when the edge points from the queried memory to this one.
    pub outgoing: bool,
}

/// Neighbors grouped by relationship, each group ordered by strength desc.
#[derive(Debug, Serialize)]
pub struct RelatedMemories {
    pub references: Vec<Neighbor>,
    pub extends: Vec<Neighbor>,
    pub contradicts: Vec<Neighbor>,
    pub related: Vec<Neighbor>,
}

/// Create or strengthen an edge.
///
/// Rejects self-links and missing endpoints with `INVALID_RELATIONSHIP`.
/// Repeated calls are idempotent: strength only ever moves up toward the
/// given value and saturates at 1.0.
pub fn link_memories(
    conn: &Connection,
    source_id: i64,
    target_id: i64,
    relationship: Relationship,
    strength: f64,
) -> Result<MemoryLink> {
    if source_id == target_id {
        return Err(CortexError::InvalidRelationship(format!(
            "memory {source_id} cannot link to itself"
        )));
    }
    for id in [source_id, target_id] {
        let exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM memories WHERE id = ?1",
            [id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(CortexError::InvalidRelationship(format!("memory {id} does not exist")));
        }
    }

    let strength = strength.clamp(0.0, 1.0);
    let now = super::now_rfc3339();

    conn.execute(
        "INSERT INTO memory_links (source_id, target_id, relationship, strength, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT(source_id, target_id, relationship) \
         DO UPDATE SET strength = MIN(1.0, MAX(strength, excluded.strength))",
        params![source_id, target_id, relationship.as_str(), strength, now],
    )?;

    let (strength, created_at): (f64, String) = conn.query_row(
        "SELECT strength, created_at FROM memory_links \
         WHERE source_id = ?1 AND target_id = ?2 AND relationship = ?3",
        params![source_id, target_id, relationship.as_str()],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(MemoryLink { source_id, target_id, relationship, strength, created_at })
}

/// Neighbors of a memory grouped by relationship, ordered by strength desc.
/// Edges in both directions are included.
pub fn get_related(conn: &Connection, id: i64) -> Result<RelatedMemories> {
    // existence check so a bad id is MEMORY_NOT_FOUND, not an empty result
    super::get_memory(conn, id)?;

    let mut stmt = conn.prepare(
        "SELECT l.relationship, l.strength, l.source_id, l.target_id, m.title \
         FROM memory_links l \
         JOIN memories m ON m.id = CASE WHEN l.source_id = ?1 THEN l.target_id ELSE l.source_id END \
         WHERE l.source_id = ?1 OR l.target_id = ?1 \
         ORDER BY l.strength DESC",
    )?;

    let mut grouped: HashMap<Relationship, Vec<Neighbor>> = HashMap::new();
    let rows = stmt.query_map([id], |row| {
        let relationship: String = row.get(0)?;
        let strength: f64 = row.get(1)?;
        let source_id: i64 = row.get(2)?;
        let target_id: i64 = row.get(3)?;
        let title: String = row.get(4)?;
        Ok((relationship, strength, source_id, target_id, title))
    })?;

    for row in rows {
        let (relationship, strength, source_id, target_id, title) = row?;
        let Ok(relationship) = relationship.parse::<Relationship>() else {
            continue;
        };
        let outgoing = source_id == id;
        let neighbor_id = if outgoing { target_id } else { source_id };
        grouped
            .entry(relationship)
            .or_default()
            .push(Neighbor { id: neighbor_id, title, strength, outgoing });
    }

    Ok(RelatedMemories {
        references: grouped.remove(&Relationship::References).unwrap_or_default(),
        extends: grouped.remove(&Relationship::Extends).unwrap_or_default(),
        contradicts: grouped.remove(&Relationship::Contradicts).unwrap_or_default(),
        related: grouped.remove(&Relationship::Related).unwrap_or_default(),
    })
}

/// Auto-link a freshly inserted memory against its nearest FTS neighbors.
///
/// Candidates come from a tag+keyword match over the index, scoped to the same
/// project or global memories; the closest few by token Jaccard get `related`
/// edges weighted `0.2 + 0.5 * jaccard`, clamped to `[0.2, 0.9]`.
pub fn auto_link(
    conn: &Connection,
    id: i64,
    title: &str,
    content: &str,
    tags: &[String],
    project: &str,
) -> Result<Vec<i64>> {
    let mut terms = tokenize(title);
    for tag in tags {
        terms.insert(tag.to_lowercase());
    }
    if terms.is_empty() {
        return Ok(Vec::new());
    }

    let match_expr = terms
        .iter()
        .filter(|t| t.chars().any(char::is_alphanumeric))
        .map(|t| format!("\"{}\"", t.replace('"', "")))
        .collect::<Vec<_>>()
        .join(" OR ");
    if match_expr.is_empty() {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(
        "SELECT m.id, m.title, m.content \
         FROM memories_fts JOIN memories m ON m.id = memories_fts.rowid \
         WHERE memories_fts MATCH ?1 AND m.id != ?2 \
           AND (m.project = ?3 OR m.scope = 'global') \
         ORDER BY rank LIMIT ?4",
    )?;

    let candidates: Vec<(i64, String, String)> = stmt
        .query_map(
            params![match_expr, id, project, AUTO_LINK_CANDIDATES as i64],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let own_tokens = tokenize(&format!("{title} {content}"));
    let mut scored: Vec<(i64, f64)> = candidates
        .into_iter()
        .map(|(cid, ctitle, ccontent)| {
            let sim = jaccard_from_sets(&own_tokens, &tokenize(&format!("{ctitle} {ccontent}")));
            (cid, sim)
        })
        .filter(|(_, sim)| *sim > RELATEDNESS_FLOOR)
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut linked = Vec::new();
    for (cid, sim) in scored.into_iter().take(MAX_AUTO_LINKS) {
        let strength = (0.2 + 0.5 * sim).clamp(0.2, 0.9);
        link_memories(conn, id, cid, Relationship::Related, strength)?;
        linked.push(cid);
    }
    Ok(linked)
}

/// Hebbian reinforcement for one pair: create a weak `related` edge if none
/// exists in either direction, otherwise strengthen the existing edge.
///
/// Only fires when both memories were accessed within the co-access window.
pub fn strengthen_pair(conn: &Connection, a: i64, b: i64) -> Result<()> {
    if a == b {
        return Ok(());
    }

    let accessed: Vec<String> = {
        let mut stmt =
            conn.prepare("SELECT last_accessed FROM memories WHERE id IN (?1, ?2)")?;
        let rows = stmt
            .query_map(params![a, b], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows
    };
    if accessed.len() != 2 || !within_window(&accessed[0], &accessed[1]) {
        return Ok(());
    }

    let existing: Option<(i64, i64, f64)> = conn
        .query_row(
            "SELECT source_id, target_id, strength FROM memory_links \
             WHERE relationship = 'related' \
               AND ((source_id = ?1 AND target_id = ?2) OR (source_id = ?2 AND target_id = ?1))",
            params![a, b],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    match existing {
        Some((source, target, strength)) => {
            conn.execute(
                "UPDATE memory_links SET strength = MIN(1.0, ?1) \
                 WHERE source_id = ?2 AND target_id = ?3 AND relationship = 'related'",
                params![strength + CO_ACCESS_STEP, source, target],
            )?;
        }
        None => {
            link_memories(conn, a, b, Relationship::Related, CO_ACCESS_INITIAL_STRENGTH)?;
        }
    }
    Ok(())
}

/// After an explicit access, strengthen links to the most recently co-accessed
/// memories. Bounded to a handful of partners per call.
pub fn reinforce_co_access(conn: &Connection, id: i64) -> Result<()> {
    let cutoff = (chrono::Utc::now()
        - chrono::Duration::seconds(CO_ACCESS_WINDOW_SECS))
    .to_rfc3339();

    let partners: Vec<i64> = {
        let mut stmt = conn.prepare(
            "SELECT id FROM memories WHERE id != ?1 AND last_accessed >= ?2 AND access_count > 0 \
             ORDER BY last_accessed DESC LIMIT 5",
        )?;
        let rows = stmt
            .query_map(params![id, cutoff], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows
    };

    for partner in partners {
        strengthen_pair(conn, id, partner)?;
    }
    Ok(())
}

/// Mean salience of memories linked to `id` (either direction), for the
/// search-time link boost. `None` when unlinked.
pub fn linked_mean_salience(conn: &Connection, id: i64) -> Result<Option<f64>> {
    let mean: Option<f64> = conn.query_row(
        "SELECT AVG(m.salience) FROM memory_links l \
         JOIN memories m ON m.id = CASE WHEN l.source_id = ?1 THEN l.target_id ELSE l.source_id END \
         WHERE l.source_id = ?1 OR l.target_id = ?1",
        [id],
        |row| row.get(0),
    )?;
    Ok(mean)
}

/// Number of edges incident to a memory.
pub fn link_count(conn: &Connection, id: i64) -> Result<u32> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM memory_links WHERE source_id = ?1 OR target_id = ?1",
        [id],
        |row| row.get(0),
    )?;
    Ok(count as u32)
}

fn within_window(a: &str, b: &str) -> bool {
    use chrono::DateTime;
    let (Ok(a), Ok(b)) = (DateTime::parse_from_rfc3339(a), DateTime::parse_from_rfc3339(b))
    else {
        return false;
    };
    (a - b).num_seconds().abs() <= CO_ACCESS_WINDOW_SECS
}

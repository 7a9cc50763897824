//! Consolidation — the periodic maintenance pass.
//!
//! One pass, inside one transaction: recompute decayed scores, promote
//! eligible short-term memories, delete decayed ones, enforce the hard
//! capacity caps, merge near-duplicate short-term memories (rewriting their
//! link edges to the survivor), award the hub-memory salience bonus, and
//! persist the freshly computed decayed scores. Runs at most once per hour
//! unless forced; the previous report is returned when skipped.

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

use crate::config::CortexConfig;
use crate::db;
use crate::error::Result;
use crate::memory::similarity::tokenize;
use crate::memory::types::{Memory, MemoryType};
use crate::memory::{decay, links};

/// Combined title/content similarity above which short-term memories merge.
const MERGE_THRESHOLD: f64 = 0.25;

/// Weights for the combined merge similarity.
const MERGE_CONTENT_WEIGHT: f64 = 0.6;
const MERGE_TITLE_WEIGHT: f64 = 0.4;

/// Chars of a merged-away memory's content quoted in the survivor's summary.
const MERGE_SUMMARY_CHARS: usize = 120;

/// Minimum gap between unforced consolidation runs.
const MIN_RUN_GAP_SECS: i64 = 3600;

const META_LAST_RUN: &str = "last_consolidation_at";
const META_LAST_REPORT: &str = "last_consolidation_report";

/// Outcome of a consolidation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsolidationReport {
    /// Short-term memories promoted to long-term.
    pub consolidated: usize,
    /// Rows whose persisted decayed score moved.
    pub decayed: usize,
    pub deleted: usize,
    pub salience_evolved: usize,
    pub merged: usize,
    /// True when this is the previous run's report, returned because the pass
    /// was skipped.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cached: bool,
}

/// What a pass would change, computed without mutating.
#[derive(Debug, Serialize)]
pub struct ConsolidationPreview {
    pub would_promote: Vec<i64>,
    pub would_delete: Vec<i64>,
    pub would_evict: Vec<i64>,
}

/// Run a consolidation pass.
///
/// Unforced runs within an hour of the previous one return the cached report.
/// A `deadline` is checked between phases; phases completed before it hits
/// are committed, the rest are skipped.
pub fn run_consolidation(
    conn: &mut Connection,
    config: &CortexConfig,
    force: bool,
    deadline: Option<Instant>,
) -> Result<ConsolidationReport> {
    if !force {
        if let Some(report) = cached_report(conn)? {
            tracing::debug!("consolidation ran recently; returning cached report");
            return Ok(report);
        }
    }

    let started = Instant::now();
    let mut report = ConsolidationReport::default();

    let tx = conn.transaction()?;

    // 1. fresh decayed scores for everything, used by every later phase
    let memories = load_all(&tx)?;
    let fresh: HashMap<i64, f64> = memories
        .iter()
        .map(|m| (m.id, super::current_decayed_score(m, config.decay_rate)))
        .collect();

    // 2. promote
    let mut promoted: HashSet<i64> = HashSet::new();
    for memory in memories.iter().filter(|m| m.memory_type == MemoryType::ShortTerm) {
        let eligible = decay::promotion_eligible(
            memory.salience,
            fresh[&memory.id],
            memory.access_count,
            super::hours_since(&memory.created_at),
            config.salience_threshold,
            config.retention_hours,
        );
        if eligible {
            tx.execute("UPDATE memories SET type = 'long_term' WHERE id = ?1", [memory.id])?;
            promoted.insert(memory.id);
        }
    }
    report.consolidated = promoted.len();

    let mut deleted: HashSet<i64> = HashSet::new();

    if past(deadline) {
        tracing::warn!("consolidation deadline hit after promotion; committing partial pass");
        seal(tx, &mut report, config)?;
        vacuum_if(conn, deleted.len())?;
        return Ok(report);
    }

    // 3. delete decayed (never a memory promoted this pass)
    for memory in &memories {
        if promoted.contains(&memory.id) {
            continue;
        }
        if fresh[&memory.id] < memory.category.deletion_threshold() {
            super::delete_memory_row(&tx, memory)?;
            deleted.insert(memory.id);
        }
    }

    // 4. hard capacity caps
    deleted.extend(enforce_capacity(&tx, config)?);
    report.deleted = deleted.len();

    if past(deadline) {
        tracing::warn!("consolidation deadline hit after deletion; committing partial pass");
        seal(tx, &mut report, config)?;
        vacuum_if(conn, deleted.len())?;
        return Ok(report);
    }

    // 5. merge similar short-term memories
    report.merged = merge_similar(&tx, &deleted)?;

    // merge promotes survivors, so the long-term cap gets a second look
    deleted.extend(enforce_capacity(&tx, config)?);
    report.deleted = deleted.len();

    if past(deadline) {
        tracing::warn!("consolidation deadline hit after merge; committing partial pass");
        seal(tx, &mut report, config)?;
        vacuum_if(conn, deleted.len())?;
        return Ok(report);
    }

    // 6. hub bonus: well-connected memories gain salience
    report.salience_evolved = evolve_salience(&tx)?;

    seal(tx, &mut report, config)?;
    vacuum_if(conn, deleted.len() + report.merged)?;

    tracing::info!(
        promoted = report.consolidated,
        deleted = report.deleted,
        merged = report.merged,
        evolved = report.salience_evolved,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "consolidation complete"
    );
    Ok(report)
}

/// Steps 1–4 without mutation.
pub fn preview_consolidation(
    conn: &Connection,
    config: &CortexConfig,
) -> Result<ConsolidationPreview> {
    let memories = load_all(conn)?;
    let fresh: HashMap<i64, f64> = memories
        .iter()
        .map(|m| (m.id, super::current_decayed_score(m, config.decay_rate)))
        .collect();

    let mut would_promote = Vec::new();
    for memory in memories.iter().filter(|m| m.memory_type == MemoryType::ShortTerm) {
        if decay::promotion_eligible(
            memory.salience,
            fresh[&memory.id],
            memory.access_count,
            super::hours_since(&memory.created_at),
            config.salience_threshold,
            config.retention_hours,
        ) {
            would_promote.push(memory.id);
        }
    }

    let mut would_delete = Vec::new();
    for memory in &memories {
        if would_promote.contains(&memory.id) {
            continue;
        }
        if fresh[&memory.id] < memory.category.deletion_threshold() {
            would_delete.push(memory.id);
        }
    }

    // capacity, over the survivors, with promotions applied
    let mut would_evict = Vec::new();
    let survivors: Vec<&Memory> =
        memories.iter().filter(|m| !would_delete.contains(&m.id)).collect();
    for (memory_type, cap) in [
        (MemoryType::ShortTerm, config.max_short_term),
        (MemoryType::LongTerm, config.max_long_term),
    ] {
        let mut pool: Vec<&&Memory> = survivors
            .iter()
            .filter(|m| {
                let effective = if would_promote.contains(&m.id) {
                    MemoryType::LongTerm
                } else {
                    m.memory_type
                };
                effective == memory_type
            })
            .collect();
        if pool.len() > cap {
            pool.sort_by(|a, b| {
                a.salience
                    .partial_cmp(&b.salience)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.last_accessed.cmp(&b.last_accessed))
            });
            would_evict.extend(pool[..pool.len() - cap].iter().map(|m| m.id));
        }
    }

    Ok(ConsolidationPreview { would_promote, would_delete, would_evict })
}

// ── Phases ───────────────────────────────────────────────────────────────────

fn load_all(conn: &Connection) -> Result<Vec<Memory>> {
    let sql = format!("SELECT {} FROM memories", super::MEMORY_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], super::memory_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Delete the lowest-value tail of any lifecycle class over its cap.
/// Short-term evicts by `(salience, last_accessed)`; long-term also weighs
/// `access_count`.
fn enforce_capacity(conn: &Connection, config: &CortexConfig) -> Result<Vec<i64>> {
    let mut evicted = Vec::new();

    for (memory_type, cap, order) in [
        (MemoryType::ShortTerm, config.max_short_term, "salience ASC, last_accessed ASC"),
        (
            MemoryType::LongTerm,
            config.max_long_term,
            "salience ASC, access_count ASC, last_accessed ASC",
        ),
    ] {
        let count = super::count_of_type(conn, memory_type)?;
        if count <= cap {
            continue;
        }
        let excess = count - cap;
        let sql = format!(
            "SELECT {} FROM memories WHERE type = ?1 ORDER BY {order} LIMIT ?2",
            super::MEMORY_COLUMNS
        );
        let victims: Vec<Memory> = {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![memory_type.as_str(), excess as i64], super::memory_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };
        for victim in &victims {
            super::delete_memory_row(conn, victim)?;
            evicted.push(victim.id);
        }
        tracing::info!(
            memory_type = %memory_type,
            evicted = victims.len(),
            cap,
            "capacity cap enforced"
        );
    }

    Ok(evicted)
}

/// Greedy cluster-and-merge over short-term memories, grouped by
/// (project, category). Titles and contents are tokenized once per memory.
/// Each cluster collapses into its highest-salience member, which absorbs
/// bullet summaries, tags, and access counts of the rest, gains +0.1
/// salience, and graduates to long-term. Returns how many rows merged away.
fn merge_similar(conn: &Connection, already_deleted: &HashSet<i64>) -> Result<usize> {
    let all = load_all(conn)?;
    let short: Vec<&Memory> = all
        .iter()
        .filter(|m| m.memory_type == MemoryType::ShortTerm && !already_deleted.contains(&m.id))
        .collect();

    let mut groups: HashMap<(String, String), Vec<&Memory>> = HashMap::new();
    for memory in short {
        groups
            .entry((memory.project.clone(), memory.category.as_str().to_string()))
            .or_default()
            .push(memory);
    }

    let mut merged_total = 0;

    for (_, mut members) in groups {
        if members.len() < 2 {
            continue;
        }
        members.sort_by(|a, b| {
            b.salience.partial_cmp(&a.salience).unwrap_or(std::cmp::Ordering::Equal)
        });

        let title_tokens: HashMap<i64, _> =
            members.iter().map(|m| (m.id, tokenize(&m.title))).collect();
        let content_tokens: HashMap<i64, _> =
            members.iter().map(|m| (m.id, tokenize(&m.content))).collect();

        let mut clustered: HashSet<i64> = HashSet::new();
        for (i, base) in members.iter().enumerate() {
            if clustered.contains(&base.id) {
                continue;
            }
            let mut cluster: Vec<&Memory> = Vec::new();
            for other in members.iter().skip(i + 1) {
                if clustered.contains(&other.id) {
                    continue;
                }
                let content_sim = crate::memory::similarity::jaccard_from_sets(
                    &content_tokens[&base.id],
                    &content_tokens[&other.id],
                );
                let title_sim = crate::memory::similarity::jaccard_from_sets(
                    &title_tokens[&base.id],
                    &title_tokens[&other.id],
                );
                let combined =
                    MERGE_CONTENT_WEIGHT * content_sim + MERGE_TITLE_WEIGHT * title_sim;
                if combined >= MERGE_THRESHOLD {
                    cluster.push(other);
                }
            }
            if cluster.is_empty() {
                continue;
            }
            clustered.insert(base.id);
            for other in &cluster {
                clustered.insert(other.id);
            }
            merge_cluster(conn, base, &cluster)?;
            merged_total += cluster.len();
        }
    }

    Ok(merged_total)
}

/// Fold `others` into `base`: summaries, tags, access counts, salience bump,
/// promotion to long-term, link rewrite, then delete the absorbed rows.
fn merge_cluster(conn: &Connection, base: &Memory, others: &[&Memory]) -> Result<()> {
    const HEADER: &str = "\n\nConsolidated context:";
    let mut content = base.content.clone();
    if !content.contains("Consolidated context:")
        && content.len() + HEADER.len() <= crate::error::MAX_CONTENT_BYTES
    {
        content.push_str(HEADER);
    }
    if content.contains("Consolidated context:") {
        for other in others {
            let summary: String = other.content.chars().take(MERGE_SUMMARY_CHARS).collect();
            let bullet = format!("\n- {}: {}", other.title, summary);
            if content.len() + bullet.len() <= crate::error::MAX_CONTENT_BYTES {
                content.push_str(&bullet);
            }
        }
    }

    let mut tags = base.tags.clone();
    for other in others {
        for tag in &other.tags {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
    }

    let access_total: u32 =
        base.access_count + others.iter().map(|o| o.access_count).sum::<u32>();
    let salience = (base.salience + 0.1).clamp(0.0, 1.0);

    super::rewrite_memory_text(conn, base, &base.title, &content, &tags)?;
    conn.execute(
        "UPDATE memories SET type = 'long_term', salience = ?1, access_count = ?2 WHERE id = ?3",
        params![salience, access_total, base.id],
    )?;

    for other in others {
        rewrite_links(conn, other.id, base.id)?;
        super::delete_memory_row(conn, other)?;
    }
    Ok(())
}

/// Re-point every edge touching `from` at `to`, folding duplicates together
/// instead of leaving dangling or conflicting rows.
fn rewrite_links(conn: &Connection, from: i64, to: i64) -> Result<()> {
    let edges: Vec<(i64, i64, i64, String, f64)> = {
        let mut stmt = conn.prepare(
            "SELECT id, source_id, target_id, relationship, strength \
             FROM memory_links WHERE source_id = ?1 OR target_id = ?1",
        )?;
        let rows = stmt
            .query_map([from], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows
    };

    for (edge_id, source, target, relationship, strength) in edges {
        let new_source = if source == from { to } else { source };
        let new_target = if target == from { to } else { target };
        conn.execute("DELETE FROM memory_links WHERE id = ?1", [edge_id])?;
        if new_source == new_target {
            continue;
        }
        conn.execute(
            "INSERT INTO memory_links (source_id, target_id, relationship, strength, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(source_id, target_id, relationship) \
             DO UPDATE SET strength = MIN(1.0, MAX(strength, excluded.strength))",
            params![new_source, new_target, relationship, strength, super::now_rfc3339()],
        )?;
    }
    Ok(())
}

/// Hub bonus: `link_count >= 2` earns `min(0.1, 0.03 * log2(link_count))`.
fn evolve_salience(conn: &Connection) -> Result<usize> {
    let ids: Vec<i64> = {
        let mut stmt = conn.prepare("SELECT id FROM memories")?;
        let rows =
            stmt.query_map([], |row| row.get(0))?.collect::<std::result::Result<Vec<_>, _>>()?;
        rows
    };

    let mut evolved = 0;
    for id in ids {
        let count = links::link_count(conn, id)?;
        if count < 2 {
            continue;
        }
        let bonus = (0.03 * (count as f64).log2()).min(0.1);
        conn.execute(
            "UPDATE memories SET salience = MIN(1.0, salience + ?1) WHERE id = ?2",
            params![bonus, id],
        )?;
        evolved += 1;
    }
    Ok(evolved)
}

/// Persist decayed scores for all surviving rows (recomputed against possibly
/// bumped salience), record bookkeeping, and commit. Consumes the transaction
/// so the caller's connection is free again for the vacuum.
fn seal(
    tx: rusqlite::Transaction<'_>,
    report: &mut ConsolidationReport,
    config: &CortexConfig,
) -> Result<()> {
    report.decayed = persist_decayed_scores(&tx, config)?;

    db::set_metadata(&tx, META_LAST_RUN, &super::now_rfc3339())?;
    db::set_metadata(&tx, META_LAST_REPORT, &serde_json::to_string(report)?)?;
    tx.commit()?;
    Ok(())
}

/// Reclaim file space after a pass that deleted rows.
fn vacuum_if(conn: &Connection, deletions: usize) -> Result<()> {
    if deletions > 0 {
        conn.execute("VACUUM", [])?;
    }
    Ok(())
}

fn persist_decayed_scores(conn: &Connection, config: &CortexConfig) -> Result<usize> {
    let memories = load_all(conn)?;
    let mut changed = 0;
    for memory in &memories {
        let score = super::current_decayed_score(memory, config.decay_rate);
        if (score - memory.decayed_score).abs() > f64::EPSILON {
            conn.execute(
                "UPDATE memories SET decayed_score = ?1 WHERE id = ?2",
                params![score, memory.id],
            )?;
            changed += 1;
        }
    }
    Ok(changed)
}

/// The previous report, if the last run was under an hour ago.
fn cached_report(conn: &Connection) -> Result<Option<ConsolidationReport>> {
    let Some(last_run) = db::get_metadata(conn, META_LAST_RUN)? else {
        return Ok(None);
    };
    let Ok(last) = chrono::DateTime::parse_from_rfc3339(&last_run) else {
        return Ok(None);
    };
    let elapsed = chrono::Utc::now().signed_duration_since(last.with_timezone(&chrono::Utc));
    if elapsed.num_seconds() >= MIN_RUN_GAP_SECS {
        return Ok(None);
    }

    let report = db::get_metadata(conn, META_LAST_REPORT)?
        .and_then(|json| serde_json::from_str::<ConsolidationReport>(&json).ok())
        .unwrap_or_default();
    Ok(Some(ConsolidationReport { cached: true, ..report }))
}

fn past(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

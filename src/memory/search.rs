//! Read path — full-text search with blended relevance ranking, plus the
//! reinforcement side effects applied after a search returns.
//!
//! Ranking blends normalized BM25 with the decay model, the link graph, and
//! recency/category/tag boosts. The search itself is a read-only snapshot;
//! [`reinforce_results`] runs afterwards in its own write transaction, and its
//! failure never fails the search.

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::config::CortexConfig;
use crate::error::Result;
use crate::memory::salience::suggest_category;
use crate::memory::similarity::{jaccard_from_sets, tokenize};
use crate::memory::types::{Category, Memory};
use crate::memory::{decay, links};

/// Relevance weights, summing to 1.0 across all components.
const W_BM25: f64 = 0.30;
const W_DECAYED: f64 = 0.25;
const W_SALIENCE: f64 = 0.10;
const W_RECENCY_HOUR: f64 = 0.10;
const W_RECENCY_DAY: f64 = 0.05;
const W_CATEGORY: f64 = 0.10;
const W_LINKS: f64 = 0.15;
const W_TAGS: f64 = 0.10;

/// How many of the top results receive reinforcement side effects.
const REINFORCE_TOP: usize = 5;

/// Query tokens absent from the top result's content before the query is
/// appended as enrichment context.
const ENRICHMENT_MIN_NEW_TOKENS: usize = 30;

/// Result ordering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Blended relevance (or decayed score when the query is empty).
    #[default]
    Query,
    /// Most recently accessed first.
    Recent,
    /// Highest salience first.
    Important,
}

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub query: Option<String>,
    pub project: Option<String>,
    pub category: Option<Category>,
    pub min_salience: Option<f64>,
    pub include_global: bool,
    /// Also return memories whose fresh decayed score is below their
    /// category's deletion threshold.
    pub include_decayed: bool,
    pub limit: usize,
    pub mode: SearchMode,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            query: None,
            project: None,
            category: None,
            min_salience: None,
            include_global: true,
            include_decayed: false,
            limit: 10,
            mode: SearchMode::Query,
        }
    }
}

/// A ranked search hit.
#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub memory: Memory,
    pub relevance: f64,
}

/// Run a search. Read-only; reinforcement is the caller's second step.
pub fn search_memories(
    conn: &Connection,
    params: &SearchParams,
    config: &CortexConfig,
) -> Result<Vec<SearchResult>> {
    let candidate_limit = (params.limit.max(1) * 4).max(50);

    let query = params.query.as_deref().map(str::trim).filter(|q| !q.is_empty());

    // candidates: (memory, raw bm25 score) — raw is 0 without a query
    let candidates: Vec<(Memory, f64)> = match query {
        Some(q) => fts_candidates(conn, q, candidate_limit)?,
        None => plain_candidates(conn, candidate_limit)?,
    };

    let max_bm25 = candidates.iter().map(|(_, s)| *s).fold(0.0_f64, f64::max);
    let query_tokens = query.map(tokenize);
    let query_category = query.map(|q| suggest_category(q, q));

    let mut results: Vec<SearchResult> = Vec::new();
    for (mut memory, bm25_raw) in candidates {
        if !passes_filters(&memory, params) {
            continue;
        }

        let fresh = super::current_decayed_score(&memory, config.decay_rate);
        if !params.include_decayed && fresh < memory.category.deletion_threshold() {
            continue;
        }
        memory.decayed_score = fresh;

        let relevance = match (params.mode, query) {
            (SearchMode::Query, Some(_)) => blended_relevance(
                conn,
                &memory,
                bm25_raw,
                max_bm25,
                query_tokens.as_ref(),
                query_category,
            )?,
            // no query (or an explicit recency/importance mode): the ordering
            // key doubles as the reported relevance
            (SearchMode::Query, None) => fresh,
            (SearchMode::Recent | SearchMode::Important, _) => fresh,
        };

        results.push(SearchResult { memory, relevance });
    }

    match params.mode {
        SearchMode::Query => {
            results.sort_by(|a, b| {
                b.relevance.partial_cmp(&a.relevance).unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        SearchMode::Recent => {
            results.sort_by(|a, b| b.memory.last_accessed.cmp(&a.memory.last_accessed));
        }
        SearchMode::Important => {
            results.sort_by(|a, b| {
                b.memory
                    .salience
                    .partial_cmp(&a.memory.salience)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
    }

    results.truncate(params.limit.max(1));
    Ok(results)
}

/// Apply the post-search side effects to the top results, in one write
/// transaction: access reinforcement, pairwise Hebbian linking, and query
/// enrichment of the best hit. Callers log failures and move on; a failed
/// reinforcement never fails the search that produced `ids`.
pub fn reinforce_results(conn: &mut Connection, ids: &[i64], query: Option<&str>) -> Result<()> {
    let top: Vec<i64> = ids.iter().take(REINFORCE_TOP).copied().collect();
    if top.is_empty() {
        return Ok(());
    }

    let now = super::now_rfc3339();
    let tx = conn.transaction()?;

    for &id in &top {
        use rusqlite::OptionalExtension;
        // a row deleted since the search is simply skipped
        let row: Option<(f64, u32)> = tx
            .query_row(
                "SELECT salience, access_count FROM memories WHERE id = ?1",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((salience, access_count)) = row else {
            continue;
        };
        let boosted = (salience + decay::access_boost(access_count)).clamp(0.0, 1.0);
        tx.execute(
            "UPDATE memories SET access_count = access_count + 1, last_accessed = ?1, \
             salience = ?2 WHERE id = ?3",
            params![now, boosted, id],
        )?;
    }

    // memories recalled together link together
    for (i, &a) in top.iter().enumerate() {
        for &b in &top[i + 1..] {
            links::strengthen_pair(&tx, a, b)?;
        }
    }

    if let Some(query) = query {
        enrich_top_result(&tx, top[0], query)?;
    }

    tx.commit()?;
    Ok(())
}

/// Escape a user query for FTS5 MATCH syntax.
///
/// Wraps each whitespace-delimited word in double quotes (implicit AND, with
/// a prefix star so "postgres" still finds "postgresql"). Quoting neutralizes
/// the FTS operators (`- : * ^ ( ) & | . / , { } +`) and forces boolean
/// keywords (`AND`, `OR`, `NOT`) to match literally.
pub fn escape_fts_query(query: &str) -> String {
    query
        .split_whitespace()
        // a word with no alphanumerics tokenizes to an empty phrase; drop it
        .filter(|word| word.chars().any(char::is_alphanumeric))
        .map(|word| {
            let clean = word.replace('"', "");
            format!("\"{clean}\"*")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Internal helpers ─────────────────────────────────────────────────────────

/// FTS candidates with their raw (positive, bigger-is-better) BM25 scores.
fn fts_candidates(conn: &Connection, query: &str, limit: usize) -> Result<Vec<(Memory, f64)>> {
    let escaped = escape_fts_query(query);
    if escaped.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {}, rank FROM memories_fts JOIN memories m ON m.id = memories_fts.rowid \
         WHERE memories_fts MATCH ?1 ORDER BY rank LIMIT ?2",
        qualified_columns()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![escaped, limit as i64], |row| {
            let memory = super::memory_from_row(row)?;
            // FTS5 rank is negative; flip it so bigger means better
            let rank: f64 = row.get(15)?;
            Ok((memory, -rank))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Candidates for the empty-query path, pre-ordered by persisted decayed
/// score so the cheap ordering survives the re-ranking pass.
fn plain_candidates(conn: &Connection, limit: usize) -> Result<Vec<(Memory, f64)>> {
    let sql = format!(
        "SELECT {} FROM memories m ORDER BY m.decayed_score DESC, m.id DESC LIMIT ?1",
        qualified_columns()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([limit as i64], |row| Ok((super::memory_from_row(row)?, 0.0)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// [`super::MEMORY_COLUMNS`] qualified with the `m.` table alias.
fn qualified_columns() -> String {
    super::MEMORY_COLUMNS
        .split(", ")
        .map(|c| format!("m.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn passes_filters(memory: &Memory, params: &SearchParams) -> bool {
    if let Some(project) = &params.project {
        let global = memory.project == crate::memory::types::GLOBAL_PROJECT
            || memory.scope == crate::memory::types::Scope::Global;
        let matches_project = memory.project == *project;
        if !(matches_project || (params.include_global && global)) {
            return false;
        }
    }
    if let Some(category) = params.category {
        if memory.category != category {
            return false;
        }
    }
    if let Some(min) = params.min_salience {
        if memory.salience < min {
            return false;
        }
    }
    true
}

/// The weighted relevance blend for a query search.
fn blended_relevance(
    conn: &Connection,
    memory: &Memory,
    bm25_raw: f64,
    max_bm25: f64,
    query_tokens: Option<&std::collections::HashSet<String>>,
    query_category: Option<Category>,
) -> Result<f64> {
    let bm25_norm = if max_bm25 > 0.0 { (bm25_raw / max_bm25).clamp(0.0, 1.0) } else { 0.0 };

    let hours = super::hours_since(&memory.last_accessed);
    let recency = if hours < 1.0 {
        W_RECENCY_HOUR
    } else if hours < 24.0 {
        W_RECENCY_DAY
    } else {
        0.0
    };

    let category_boost = match query_category {
        Some(qc) if qc == memory.category => W_CATEGORY,
        _ => 0.0,
    };

    let link_boost = links::linked_mean_salience(conn, memory.id)?.unwrap_or(0.0) * W_LINKS;

    let tag_boost = match query_tokens {
        Some(tokens) if !memory.tags.is_empty() => {
            let tag_set = memory.tags.iter().map(|t| t.to_lowercase()).collect();
            jaccard_from_sets(tokens, &tag_set) * W_TAGS
        }
        _ => 0.0,
    };

    Ok(bm25_norm * W_BM25
        + memory.decayed_score * W_DECAYED
        + memory.salience * W_SALIENCE
        + recency
        + category_boost
        + link_boost
        + tag_boost)
}

/// Append the query to the top result's content when it contributes enough
/// new tokens, bounded so the stored content stays under the 10 KiB cap.
fn enrich_top_result(conn: &Connection, id: i64, query: &str) -> Result<()> {
    let memory = match super::get_memory(conn, id) {
        Ok(memory) => memory,
        Err(crate::error::CortexError::MemoryNotFound(_)) => return Ok(()),
        Err(err) => return Err(err),
    };
    let content_tokens = tokenize(&memory.content);
    let new_tokens =
        tokenize(query).iter().filter(|t| !content_tokens.contains(*t)).count();
    if new_tokens < ENRICHMENT_MIN_NEW_TOKENS {
        return Ok(());
    }

    let addition = format!("\n\nContext: {query}");
    if memory.content.len() + addition.len() > crate::error::MAX_CONTENT_BYTES {
        return Ok(());
    }
    let enriched = format!("{}{}", memory.content, addition);
    super::rewrite_memory_text(conn, &memory, &memory.title, &enriched, &memory.tags)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::memory::store::{add_memory, NewMemory};

    fn insert(conn: &mut Connection, title: &str, content: &str, project: &str) -> i64 {
        let config = CortexConfig::default();
        add_memory(
            conn,
            NewMemory {
                title: title.into(),
                content: content.into(),
                project: Some(project.into()),
                ..Default::default()
            },
            &config,
            None,
        )
        .unwrap()
        .id
    }

    fn query_params(query: &str) -> SearchParams {
        SearchParams { query: Some(query.into()), ..Default::default() }
    }

    #[test]
    fn query_finds_matching_memory_first() {
        let mut conn = open_memory_database().unwrap();
        let config = CortexConfig::default();
        let id = insert(&mut conn, "Use PostgreSQL", "We chose PostgreSQL for ACID.", "p");
        insert(&mut conn, "Lunch menu", "Soup and salad today.", "p");

        let results = search_memories(&conn, &query_params("postgresql"), &config).unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].memory.id, id);
        assert!(results[0].relevance > 0.0);
    }

    #[test]
    fn empty_query_orders_by_decayed_score() {
        let mut conn = open_memory_database().unwrap();
        let config = CortexConfig::default();
        for (title, salience) in [("low", 0.3), ("high", 0.9), ("mid", 0.6)] {
            let mut input = NewMemory {
                title: title.into(),
                content: "body text".into(),
                project: Some("p".into()),
                ..Default::default()
            };
            input.salience = Some(salience);
            add_memory(&mut conn, input, &config, None).unwrap();
        }

        let results = search_memories(&conn, &SearchParams::default(), &config).unwrap();
        let scores: Vec<f64> = results.iter().map(|r| r.memory.decayed_score).collect();
        let mut sorted = scores.clone();
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
        assert_eq!(scores, sorted);
    }

    #[test]
    fn special_characters_do_not_break_matching() {
        let mut conn = open_memory_database().unwrap();
        let config = CortexConfig::default();
        let id = insert(&mut conn, "cache/evict + ttl", "Eviction policy for the cache.", "p");

        let results = search_memories(&conn, &query_params("cache/evict"), &config).unwrap();
        assert!(results.iter().any(|r| r.memory.id == id));
        assert!(results[0].relevance > 0.0);
    }

    #[test]
    fn boolean_operators_match_literally() {
        let mut conn = open_memory_database().unwrap();
        let config = CortexConfig::default();
        insert(&mut conn, "Notes", "Weighing redis OR memcached for the cache.", "p");

        // must not be parsed as an FTS boolean query
        let results = search_memories(&conn, &query_params("redis OR memcached"), &config);
        assert!(results.is_ok());
        assert!(!results.unwrap().is_empty());
    }

    #[test]
    fn project_filter_hides_other_projects_but_keeps_global() {
        let mut conn = open_memory_database().unwrap();
        let config = CortexConfig::default();
        let mine = insert(&mut conn, "database choice", "postgres here", "mine");
        let theirs = insert(&mut conn, "database choice", "postgres there", "theirs");
        let global = {
            let mut input = NewMemory {
                title: "database convention".into(),
                content: "postgres everywhere".into(),
                project: Some("*".into()),
                ..Default::default()
            };
            input.scope = Some(crate::memory::types::Scope::Global);
            add_memory(&mut conn, input, &config, None).unwrap().id
        };

        let params = SearchParams {
            query: Some("postgres".into()),
            project: Some("mine".into()),
            ..Default::default()
        };
        let results = search_memories(&conn, &params, &config).unwrap();
        let ids: Vec<i64> = results.iter().map(|r| r.memory.id).collect();
        assert!(ids.contains(&mine));
        assert!(ids.contains(&global));
        assert!(!ids.contains(&theirs));

        let no_global = SearchParams { include_global: false, ..params };
        let results = search_memories(&conn, &no_global, &config).unwrap();
        let ids: Vec<i64> = results.iter().map(|r| r.memory.id).collect();
        assert!(!ids.contains(&global));
    }

    #[test]
    fn min_salience_and_category_filters() {
        let mut conn = open_memory_database().unwrap();
        let config = CortexConfig::default();
        let mut faint = NewMemory {
            title: "faint memo".into(),
            content: "postgres detail".into(),
            project: Some("p".into()),
            ..Default::default()
        };
        faint.salience = Some(0.3);
        let faint_id = add_memory(&mut conn, faint, &config, None).unwrap().id;
        let mut arch = NewMemory {
            title: "postgres decision".into(),
            content: "we chose postgres".into(),
            project: Some("p".into()),
            category: Some(Category::Architecture),
            ..Default::default()
        };
        arch.salience = Some(0.9);
        let arch_id = add_memory(&mut conn, arch, &config, None).unwrap().id;

        let params = SearchParams {
            query: Some("postgres".into()),
            min_salience: Some(0.5),
            ..Default::default()
        };
        let ids: Vec<i64> = search_memories(&conn, &params, &config)
            .unwrap()
            .into_iter()
            .map(|r| r.memory.id)
            .collect();
        assert!(ids.contains(&arch_id));
        assert!(!ids.contains(&faint_id));

        let params = SearchParams {
            query: Some("postgres".into()),
            category: Some(Category::Architecture),
            ..Default::default()
        };
        let ids: Vec<i64> = search_memories(&conn, &params, &config)
            .unwrap()
            .into_iter()
            .map(|r| r.memory.id)
            .collect();
        assert_eq!(ids, vec![arch_id]);
    }

    #[test]
    fn decayed_memories_hidden_unless_requested() {
        let mut conn = open_memory_database().unwrap();
        let config = CortexConfig::default();
        let mut input = NewMemory {
            title: "stale note".into(),
            content: "postgres trivia".into(),
            project: Some("p".into()),
            ..Default::default()
        };
        input.salience = Some(0.3);
        let id = add_memory(&mut conn, input, &config, None).unwrap().id;
        // 0.3 * 0.995^200 ≈ 0.11, well under the note threshold of 0.25
        let old = (chrono::Utc::now() - chrono::Duration::hours(200)).to_rfc3339();
        conn.execute("UPDATE memories SET last_accessed = ?1 WHERE id = ?2", params![old, id])
            .unwrap();

        let results = search_memories(&conn, &query_params("postgres"), &config).unwrap();
        assert!(results.is_empty());

        let params =
            SearchParams { include_decayed: true, ..query_params("postgres") };
        let results = search_memories(&conn, &params, &config).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].memory.decayed_score < 0.25);
    }

    #[test]
    fn recent_and_important_modes_reorder() {
        let mut conn = open_memory_database().unwrap();
        let config = CortexConfig::default();
        let a = insert(&mut conn, "older high", "alpha body", "p");
        conn.execute("UPDATE memories SET salience = 0.95 WHERE id = ?1", [a]).unwrap();
        let stale = (chrono::Utc::now() - chrono::Duration::hours(3)).to_rfc3339();
        conn.execute("UPDATE memories SET last_accessed = ?1 WHERE id = ?2", params![stale, a])
            .unwrap();
        let b = insert(&mut conn, "newer low", "beta body", "p");
        conn.execute("UPDATE memories SET salience = 0.4 WHERE id = ?1", [b]).unwrap();

        let recent = SearchParams { mode: SearchMode::Recent, ..Default::default() };
        let results = search_memories(&conn, &recent, &config).unwrap();
        assert_eq!(results[0].memory.id, b);

        let important = SearchParams { mode: SearchMode::Important, ..Default::default() };
        let results = search_memories(&conn, &important, &config).unwrap();
        assert_eq!(results[0].memory.id, a);
    }

    #[test]
    fn limit_respected() {
        let mut conn = open_memory_database().unwrap();
        let config = CortexConfig::default();
        for i in 0..8 {
            insert(&mut conn, &format!("entry {i}"), "shared postgres body", "p");
        }
        let params = SearchParams { limit: 3, ..query_params("postgres") };
        let results = search_memories(&conn, &params, &config).unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn reinforce_bumps_top_five_and_links_pairs() {
        let mut conn = open_memory_database().unwrap();
        let config = CortexConfig::default();
        // token-disjoint titles and contents so no auto-links exist up front
        let ids: Vec<i64> = (0..6)
            .map(|i| {
                insert(
                    &mut conn,
                    &format!("itemtitle{i}"),
                    &format!("alphaword{i} betaword{i} gammaword{i}"),
                    "p",
                )
            })
            .collect();

        reinforce_results(&mut conn, &ids, None).unwrap();

        for &id in ids.iter().take(5) {
            let count: u32 = conn
                .query_row("SELECT access_count FROM memories WHERE id = ?1", [id], |r| r.get(0))
                .unwrap();
            assert_eq!(count, 1);
        }
        // sixth result untouched
        let count: u32 = conn
            .query_row("SELECT access_count FROM memories WHERE id = ?1", [ids[5]], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);

        // 5 choose 2 pairwise co-access edges
        let links: i64 =
            conn.query_row("SELECT COUNT(*) FROM memory_links", [], |r| r.get(0)).unwrap();
        assert_eq!(links, 10);
    }

    #[test]
    fn reinforce_empty_is_a_no_op() {
        let mut conn = open_memory_database().unwrap();
        reinforce_results(&mut conn, &[], Some("anything")).unwrap();
    }

    #[test]
    fn enrichment_needs_many_new_tokens() {
        let mut conn = open_memory_database().unwrap();
        let config = CortexConfig::default();
        let id = insert(&mut conn, "short", "tiny body", "p");

        // short query: content unchanged
        reinforce_results(&mut conn, &[id], Some("tiny query")).unwrap();
        let memory = crate::memory::get_memory(&conn, id).unwrap();
        assert_eq!(memory.content, "tiny body");

        // 30+ novel tokens: query appended as context
        let long_query: String = (0..35).map(|i| format!("novelterm{i} ")).collect();
        reinforce_results(&mut conn, &[id], Some(long_query.trim())).unwrap();
        let memory = crate::memory::get_memory(&conn, id).unwrap();
        assert!(memory.content.contains("Context:"));
        assert!(memory.content.len() <= crate::error::MAX_CONTENT_BYTES);
    }

    #[test]
    fn escape_fts_query_quotes_everything() {
        assert_eq!(escape_fts_query("hello world"), "\"hello\"* \"world\"*");
        assert_eq!(escape_fts_query("redis OR memcached"), "\"redis\"* \"OR\"* \"memcached\"*");
        assert_eq!(escape_fts_query("cache/evict + ttl"), "\"cache/evict\"* \"ttl\"*");
        assert_eq!(escape_fts_query("say \"hi\""), "\"say\"* \"hi\"*");
        assert_eq!(escape_fts_query("   "), "");
    }

    #[test]
    fn prefix_matching_reaches_longer_terms() {
        let mut conn = open_memory_database().unwrap();
        let config = CortexConfig::default();
        let id = insert(&mut conn, "Use PostgreSQL", "We chose PostgreSQL for ACID.", "p");
        let results = search_memories(&conn, &query_params("postgres"), &config).unwrap();
        assert_eq!(results[0].memory.id, id);
    }
}

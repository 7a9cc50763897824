//! Filtered deletion with a preview and a bulk-delete safety gate.
//!
//! `forget` first counts what a filter matches. Dry runs return the preview
//! without touching anything; live runs over the safety threshold are refused
//! unless the caller passes `confirm: true`.

use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use std::path::Path;

use crate::config::CortexConfig;
use crate::db;
use crate::error::{CortexError, Result};
use crate::memory::types::{Category, Memory};

/// Filter for a forget operation. Filters combine with AND; an empty filter
/// matches nothing rather than everything.
#[derive(Debug, Clone, Default)]
pub struct ForgetParams {
    pub ids: Option<Vec<i64>>,
    pub category: Option<Category>,
    /// Only memories created more than this many days ago.
    pub older_than_days: Option<u32>,
    pub project: Option<String>,
    pub dry_run: bool,
    pub confirm: bool,
}

impl ForgetParams {
    fn is_empty(&self) -> bool {
        self.ids.is_none()
            && self.category.is_none()
            && self.older_than_days.is_none()
            && self.project.is_none()
    }
}

/// A matched memory shown in previews.
#[derive(Debug, Serialize)]
pub struct ForgetCandidate {
    pub id: i64,
    pub title: String,
    pub category: Category,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct ForgetResult {
    pub deleted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<Vec<ForgetCandidate>>,
}

/// Delete (or preview deleting) every memory the filter matches.
pub fn forget(
    conn: &mut Connection,
    params: &ForgetParams,
    config: &CortexConfig,
    db_path: Option<&Path>,
) -> Result<ForgetResult> {
    if params.is_empty() {
        return Ok(ForgetResult { deleted: 0, preview: Some(Vec::new()) });
    }

    let matches = find_matches(conn, params)?;

    if params.dry_run {
        let preview = matches
            .iter()
            .map(|m| ForgetCandidate {
                id: m.id,
                title: m.title.clone(),
                category: m.category,
                created_at: m.created_at.clone(),
            })
            .collect();
        return Ok(ForgetResult { deleted: 0, preview: Some(preview) });
    }

    if matches.len() > config.bulk_delete_threshold && !params.confirm {
        return Err(CortexError::BulkDeleteBlocked {
            count: matches.len(),
            threshold: config.bulk_delete_threshold,
        });
    }

    db::check_size_guardrail(db_path)?;

    let tx = conn.transaction()?;
    for memory in &matches {
        super::delete_memory_row(&tx, memory)?;
    }
    tx.commit()?;

    tracing::info!(deleted = matches.len(), "forget completed");
    Ok(ForgetResult { deleted: matches.len(), preview: None })
}

/// Rows matching the filter, fetched in full for FTS-aware deletion.
fn find_matches(conn: &Connection, params: &ForgetParams) -> Result<Vec<Memory>> {
    let mut clauses: Vec<String> = Vec::new();
    let mut bind: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(ids) = &params.ids {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        clauses.push(format!("id IN ({placeholders})"));
        for id in ids {
            bind.push(Box::new(*id));
        }
    }
    if let Some(category) = params.category {
        clauses.push("category = ?".into());
        bind.push(Box::new(category.as_str().to_string()));
    }
    if let Some(days) = params.older_than_days {
        let cutoff = (chrono::Utc::now() - chrono::Duration::days(days as i64)).to_rfc3339();
        clauses.push("created_at < ?".into());
        bind.push(Box::new(cutoff));
    }
    if let Some(project) = &params.project {
        clauses.push("project = ?".into());
        bind.push(Box::new(project.clone()));
    }

    let sql = format!(
        "SELECT {} FROM memories WHERE {} ORDER BY id",
        super::MEMORY_COLUMNS,
        clauses.join(" AND ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(bind.iter().map(|b| b.as_ref())), super::memory_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::memory::store::{add_memory, NewMemory};

    fn insert(conn: &mut Connection, title: &str, category: Category) -> i64 {
        add_memory(
            conn,
            NewMemory {
                title: title.into(),
                content: format!("body of {title}"),
                category: Some(category),
                project: Some("proj".into()),
                ..Default::default()
            },
            &CortexConfig::default(),
            None,
        )
        .unwrap()
        .id
    }

    #[test]
    fn forget_by_ids_removes_rows_and_index() {
        let mut conn = open_memory_database().unwrap();
        let config = CortexConfig::default();
        let keep = insert(&mut conn, "keeper unique", Category::Note);
        let drop = insert(&mut conn, "dropper unique", Category::Note);

        let result = forget(
            &mut conn,
            &ForgetParams { ids: Some(vec![drop]), ..Default::default() },
            &config,
            None,
        )
        .unwrap();
        assert_eq!(result.deleted, 1);

        assert!(crate::memory::get_memory(&conn, keep).is_ok());
        assert!(crate::memory::get_memory(&conn, drop).is_err());

        let hits: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM memories_fts WHERE memories_fts MATCH '\"dropper\"'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(hits, 0);
    }

    #[test]
    fn dry_run_previews_without_deleting() {
        let mut conn = open_memory_database().unwrap();
        let config = CortexConfig::default();
        let id = insert(&mut conn, "previewed", Category::Todo);

        let result = forget(
            &mut conn,
            &ForgetParams {
                category: Some(Category::Todo),
                dry_run: true,
                ..Default::default()
            },
            &config,
            None,
        )
        .unwrap();
        assert_eq!(result.deleted, 0);
        let preview = result.preview.unwrap();
        assert_eq!(preview.len(), 1);
        assert_eq!(preview[0].id, id);
        assert!(crate::memory::get_memory(&conn, id).is_ok());
    }

    #[test]
    fn bulk_delete_blocked_without_confirm() {
        let mut conn = open_memory_database().unwrap();
        let config = CortexConfig { bulk_delete_threshold: 50, ..Default::default() };
        for i in 0..51 {
            insert(&mut conn, &format!("bulk {i}"), Category::Note);
        }

        let params = ForgetParams { category: Some(Category::Note), ..Default::default() };
        let err = forget(&mut conn, &params, &config, None).unwrap_err();
        assert_eq!(err.code(), "BULK_DELETE_BLOCKED");

        let confirmed = ForgetParams { confirm: true, ..params };
        let result = forget(&mut conn, &confirmed, &config, None).unwrap();
        assert_eq!(result.deleted, 51);
    }

    #[test]
    fn threshold_exactly_met_needs_no_confirm() {
        let mut conn = open_memory_database().unwrap();
        let config = CortexConfig { bulk_delete_threshold: 3, ..Default::default() };
        for i in 0..3 {
            insert(&mut conn, &format!("edge {i}"), Category::Note);
        }
        let params = ForgetParams { category: Some(Category::Note), ..Default::default() };
        let result = forget(&mut conn, &params, &config, None).unwrap();
        assert_eq!(result.deleted, 3);
    }

    #[test]
    fn older_than_filters_by_age() {
        let mut conn = open_memory_database().unwrap();
        let config = CortexConfig::default();
        let old = insert(&mut conn, "ancient", Category::Note);
        let fresh = insert(&mut conn, "fresh", Category::Note);
        let backdated = (chrono::Utc::now() - chrono::Duration::days(30)).to_rfc3339();
        conn.execute(
            "UPDATE memories SET created_at = ?1 WHERE id = ?2",
            rusqlite::params![backdated, old],
        )
        .unwrap();

        let result = forget(
            &mut conn,
            &ForgetParams { older_than_days: Some(7), ..Default::default() },
            &config,
            None,
        )
        .unwrap();
        assert_eq!(result.deleted, 1);
        assert!(crate::memory::get_memory(&conn, fresh).is_ok());
    }

    #[test]
    fn empty_filter_matches_nothing() {
        let mut conn = open_memory_database().unwrap();
        let config = CortexConfig::default();
        insert(&mut conn, "survivor", Category::Note);

        let result =
            forget(&mut conn, &ForgetParams::default(), &config, None).unwrap();
        assert_eq!(result.deleted, 0);
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM memories", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn forget_cascades_links() {
        let mut conn = open_memory_database().unwrap();
        let config = CortexConfig::default();
        let a = insert(&mut conn, "left part", Category::Note);
        let b = insert(&mut conn, "right part", Category::Note);
        crate::memory::links::link_memories(
            &conn,
            a,
            b,
            crate::memory::types::Relationship::Related,
            0.5,
        )
        .unwrap();

        forget(
            &mut conn,
            &ForgetParams { ids: Some(vec![a]), ..Default::default() },
            &config,
            None,
        )
        .unwrap();

        let links: i64 =
            conn.query_row("SELECT COUNT(*) FROM memory_links", [], |r| r.get(0)).unwrap();
        assert_eq!(links, 0);
    }
}

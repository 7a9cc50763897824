//! Memory store statistics.

use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::memory::types::{Category, MemoryType};

/// Response from memory_stats.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_memories: u64,
    pub by_type: HashMap<String, u64>,
    pub by_category: HashMap<String, u64>,
    pub links: u64,
    pub sessions: u64,
    pub average_salience: f64,
    pub db_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_memory: Option<String>,
}

/// Compute store-wide statistics, optionally scoped to a project (which also
/// counts global-scope memories).
pub fn memory_stats(
    conn: &Connection,
    project: Option<&str>,
    db_path: Option<&Path>,
) -> Result<StatsResponse> {
    let (where_clause, param) = project_filter(project);

    let total: i64 = count(conn, &format!("SELECT COUNT(*) FROM memories {where_clause}"), &param)?;

    let mut by_type = HashMap::new();
    for t in [MemoryType::ShortTerm, MemoryType::LongTerm, MemoryType::Episodic] {
        by_type.insert(t.as_str().to_string(), 0);
    }
    for (key, n) in grouped(conn, "type", &where_clause, &param)? {
        by_type.insert(key, n);
    }

    let mut by_category = HashMap::new();
    for c in Category::ALL {
        by_category.insert(c.as_str().to_string(), 0);
    }
    for (key, n) in grouped(conn, "category", &where_clause, &param)? {
        by_category.insert(key, n);
    }

    let links: i64 = conn.query_row("SELECT COUNT(*) FROM memory_links", [], |r| r.get(0))?;
    let sessions: i64 = conn.query_row("SELECT COUNT(*) FROM sessions", [], |r| r.get(0))?;

    let average_salience: f64 = {
        let sql = format!("SELECT COALESCE(AVG(salience), 0.0) FROM memories {where_clause}");
        match &param {
            Some(p) => conn.query_row(&sql, params![p], |r| r.get(0))?,
            None => conn.query_row(&sql, [], |r| r.get(0))?,
        }
    };

    let (oldest, newest): (Option<String>, Option<String>) = {
        let sql =
            format!("SELECT MIN(created_at), MAX(created_at) FROM memories {where_clause}");
        match &param {
            Some(p) => conn.query_row(&sql, params![p], |r| Ok((r.get(0)?, r.get(1)?)))?,
            None => conn.query_row(&sql, [], |r| Ok((r.get(0)?, r.get(1)?)))?,
        }
    };

    let db_size_bytes =
        db_path.and_then(|p| std::fs::metadata(p).ok()).map(|m| m.len()).unwrap_or(0);

    Ok(StatsResponse {
        total_memories: total as u64,
        by_type,
        by_category,
        links: links as u64,
        sessions: sessions as u64,
        average_salience,
        db_size_bytes,
        oldest_memory: oldest,
        newest_memory: newest,
    })
}

fn count(conn: &Connection, sql: &str, param: &Option<String>) -> Result<i64> {
    let n = match param {
        Some(p) => conn.query_row(sql, params![p], |r| r.get(0))?,
        None => conn.query_row(sql, [], |r| r.get(0))?,
    };
    Ok(n)
}

fn grouped(
    conn: &Connection,
    column: &str,
    where_clause: &str,
    param: &Option<String>,
) -> Result<Vec<(String, u64)>> {
    let sql = format!("SELECT {column}, COUNT(*) FROM memories {where_clause} GROUP BY {column}");
    let mut stmt = conn.prepare(&sql)?;
    let rows: Vec<(String, i64)> = match param {
        Some(p) => stmt
            .query_map(params![p], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?,
        None => stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };
    Ok(rows.into_iter().map(|(k, n)| (k, n as u64)).collect())
}

/// WHERE clause for optional project scoping (project rows plus globals).
fn project_filter(project: Option<&str>) -> (String, Option<String>) {
    match project {
        Some(p) => (
            "WHERE (project = ?1 OR scope = 'global')".to_string(),
            Some(p.to_string()),
        ),
        None => (String::new(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CortexConfig;
    use crate::db::open_memory_database;
    use crate::memory::store::{add_memory, NewMemory};
    use crate::memory::types::Scope;

    fn insert(conn: &mut Connection, title: &str, category: Category, project: &str) {
        add_memory(
            conn,
            NewMemory {
                title: title.into(),
                content: format!("body {title}"),
                category: Some(category),
                project: Some(project.into()),
                ..Default::default()
            },
            &CortexConfig::default(),
            None,
        )
        .unwrap();
    }

    #[test]
    fn empty_store_stats() {
        let conn = open_memory_database().unwrap();
        let stats = memory_stats(&conn, None, None).unwrap();
        assert_eq!(stats.total_memories, 0);
        assert_eq!(stats.by_type["short_term"], 0);
        assert_eq!(stats.by_category["note"], 0);
        assert_eq!(stats.average_salience, 0.0);
        assert!(stats.oldest_memory.is_none());
    }

    #[test]
    fn counts_by_type_and_category() {
        let mut conn = open_memory_database().unwrap();
        insert(&mut conn, "one", Category::Note, "p");
        insert(&mut conn, "two", Category::Note, "p");
        insert(&mut conn, "three", Category::Architecture, "p");

        let stats = memory_stats(&conn, None, None).unwrap();
        assert_eq!(stats.total_memories, 3);
        assert_eq!(stats.by_type["short_term"], 3);
        assert_eq!(stats.by_type["long_term"], 0);
        assert_eq!(stats.by_category["note"], 2);
        assert_eq!(stats.by_category["architecture"], 1);
        assert!(stats.oldest_memory.is_some());
    }

    #[test]
    fn project_scope_includes_globals() {
        let mut conn = open_memory_database().unwrap();
        insert(&mut conn, "mine", Category::Note, "p");
        insert(&mut conn, "theirs", Category::Note, "q");
        add_memory(
            &mut conn,
            NewMemory {
                title: "shared".into(),
                content: "body".into(),
                project: Some("q".into()),
                scope: Some(Scope::Global),
                ..Default::default()
            },
            &CortexConfig::default(),
            None,
        )
        .unwrap();

        let stats = memory_stats(&conn, Some("p"), None).unwrap();
        assert_eq!(stats.total_memories, 2);
    }
}

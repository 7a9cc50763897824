#![allow(dead_code)]

use cortex::config::CortexConfig;
use cortex::memory::salience::Importance;
use cortex::memory::store::{add_memory, NewMemory};
use cortex::memory::types::{Category, MemoryType};
use rusqlite::{params, Connection};

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    cortex::db::open_memory_database().unwrap()
}

pub fn test_config() -> CortexConfig {
    CortexConfig::default()
}

/// Insert a memory with explicit salience and category. Returns its id.
pub fn insert_memory(
    conn: &mut Connection,
    title: &str,
    content: &str,
    category: Category,
    salience: f64,
) -> i64 {
    add_memory(
        conn,
        NewMemory {
            title: title.into(),
            content: content.into(),
            category: Some(category),
            salience: Some(salience),
            project: Some("testproj".into()),
            ..Default::default()
        },
        &test_config(),
        None,
    )
    .unwrap()
    .id
}

/// Insert with an importance hint instead of explicit salience.
pub fn insert_with_importance(
    conn: &mut Connection,
    title: &str,
    content: &str,
    category: Category,
    importance: Importance,
) -> i64 {
    add_memory(
        conn,
        NewMemory {
            title: title.into(),
            content: content.into(),
            category: Some(category),
            importance: Some(importance),
            project: Some("testproj".into()),
            ..Default::default()
        },
        &test_config(),
        None,
    )
    .unwrap()
    .id
}

/// Backdate both created_at and last_accessed to simulate aging.
pub fn backdate_hours(conn: &Connection, id: i64, hours: i64) {
    let old = (chrono::Utc::now() - chrono::Duration::hours(hours)).to_rfc3339();
    conn.execute(
        "UPDATE memories SET created_at = ?1, last_accessed = ?1 WHERE id = ?2",
        params![old, id],
    )
    .unwrap();
}

pub fn memory_type_of(conn: &Connection, id: i64) -> MemoryType {
    let type_str: String = conn
        .query_row("SELECT type FROM memories WHERE id = ?1", [id], |r| r.get(0))
        .unwrap();
    type_str.parse().unwrap()
}

pub fn count_all(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM memories", [], |r| r.get(0)).unwrap()
}

pub fn count_of_type(conn: &Connection, memory_type: MemoryType) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM memories WHERE type = ?1",
        [memory_type.as_str()],
        |r| r.get(0),
    )
    .unwrap()
}

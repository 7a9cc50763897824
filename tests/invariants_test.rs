//! Store-wide invariants held under mixed operation sequences.

mod helpers;

use cortex::config::CortexConfig;
use cortex::memory::consolidate::run_consolidation;
use cortex::memory::search::{reinforce_results, search_memories, SearchParams};
use cortex::memory::store::{access_memory, add_memory, NewMemory};
use cortex::memory::types::{Category, MemoryType};
use helpers::{count_of_type, test_db};

/// Every memory row satisfies `0 ≤ decayed_score ≤ salience ≤ 1`.
fn assert_score_bounds(conn: &rusqlite::Connection) {
    let mut stmt =
        conn.prepare("SELECT id, salience, decayed_score FROM memories").unwrap();
    let rows: Vec<(i64, f64, f64)> = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    for (id, salience, decayed) in rows {
        assert!((0.0..=1.0).contains(&salience), "memory {id}: salience {salience}");
        assert!((0.0..=1.0).contains(&decayed), "memory {id}: decayed {decayed}");
        assert!(
            decayed <= salience + 1e-9,
            "memory {id}: decayed {decayed} > salience {salience}"
        );
    }
}

/// Every memory has exactly one FTS row, and vice versa.
fn assert_fts_parity(conn: &rusqlite::Connection) {
    let memories: i64 =
        conn.query_row("SELECT COUNT(*) FROM memories", [], |r| r.get(0)).unwrap();
    let indexed: i64 =
        conn.query_row("SELECT COUNT(*) FROM memories_fts", [], |r| r.get(0)).unwrap();
    assert_eq!(memories, indexed, "memories and FTS index out of sync");
}

#[test]
fn mixed_workload_keeps_scores_and_index_consistent() {
    let mut conn = test_db();
    let config = CortexConfig::default();
    let categories =
        [Category::Note, Category::Error, Category::Pattern, Category::Architecture];

    for i in 0..40 {
        let id = add_memory(
            &mut conn,
            NewMemory {
                title: format!("workload item {i} topic{}", i % 7),
                content: format!("body text for workload item number {i} cluster {}", i % 7),
                category: Some(categories[i % categories.len()]),
                salience: Some(0.2 + 0.02 * (i as f64 % 30.0)),
                project: Some(format!("proj{}", i % 3)),
                ..Default::default()
            },
            &config,
            None,
        )
        .unwrap()
        .id;

        if i % 3 == 0 {
            access_memory(&mut conn, id).unwrap();
        }
        if i % 5 == 0 {
            let params = SearchParams {
                query: Some(format!("topic{}", i % 7)),
                ..Default::default()
            };
            let results = search_memories(&conn, &params, &config).unwrap();
            let ids: Vec<i64> = results.iter().map(|r| r.memory.id).collect();
            reinforce_results(&mut conn, &ids, None).unwrap();
        }

        assert_score_bounds(&conn);
        assert_fts_parity(&conn);
    }
}

#[test]
fn consolidation_enforces_caps_strictly() {
    let mut conn = test_db();
    let config = CortexConfig { max_short_term: 10, max_long_term: 8, ..Default::default() };

    for i in 0..30 {
        let id = add_memory(
            &mut conn,
            NewMemory {
                title: format!("capacity probe {i} slot{i}"),
                content: format!("wholly unrelated payload number {i} marker{i}"),
                salience: Some(0.3 + 0.02 * (i as f64)),
                project: Some("caps".into()),
                ..Default::default()
            },
            &config,
            None,
        )
        .unwrap()
        .id;
        if i % 2 == 0 {
            access_memory(&mut conn, id).unwrap();
        }
    }

    run_consolidation(&mut conn, &config, true, None).unwrap();

    assert!(count_of_type(&conn, MemoryType::ShortTerm) <= 10);
    assert!(count_of_type(&conn, MemoryType::LongTerm) <= 8);
    assert_score_bounds(&conn);
    assert_fts_parity(&conn);
}

#[test]
fn deleting_memories_never_leaves_dangling_edges() {
    let mut conn = test_db();
    let config = CortexConfig::default();

    // shared vocabulary so auto-linking builds a real graph
    for i in 0..12 {
        add_memory(
            &mut conn,
            NewMemory {
                title: format!("graph node {i}"),
                content: format!("shared lattice vocabulary with twist number {i}"),
                salience: Some(if i % 2 == 0 { 0.25 } else { 0.8 }),
                project: Some("graph".into()),
                ..Default::default()
            },
            &config,
            None,
        )
        .unwrap();
    }

    // age everything so the weak half decays below threshold (0.995^100 ≈ 0.61)
    let old = (chrono::Utc::now() - chrono::Duration::hours(100)).to_rfc3339();
    conn.execute("UPDATE memories SET last_accessed = ?1, created_at = ?1", [&old]).unwrap();

    run_consolidation(&mut conn, &config, true, None).unwrap();

    let dangling: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM memory_links l \
             WHERE NOT EXISTS (SELECT 1 FROM memories m WHERE m.id = l.source_id) \
                OR NOT EXISTS (SELECT 1 FROM memories m WHERE m.id = l.target_id)",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(dangling, 0);
    assert_fts_parity(&conn);
}

#[test]
fn empty_query_no_filters_orders_by_decayed_score() {
    let mut conn = test_db();
    let config = CortexConfig::default();
    for (i, salience) in [0.9, 0.2, 0.6, 0.4, 0.8].iter().enumerate() {
        add_memory(
            &mut conn,
            NewMemory {
                title: format!("plain {i}"),
                content: format!("unranked body {i}"),
                salience: Some(*salience),
                project: Some("p".into()),
                ..Default::default()
            },
            &config,
            None,
        )
        .unwrap();
    }

    let results = search_memories(&conn, &SearchParams::default(), &config).unwrap();
    let scores: Vec<f64> = results.iter().map(|r| r.memory.decayed_score).collect();
    for pair in scores.windows(2) {
        assert!(pair[0] >= pair[1], "results not ordered by decayed score: {scores:?}");
    }
}

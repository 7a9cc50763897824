use anyhow::Result;

use cortex::config::CortexConfig;
use cortex::memory::search::{search_memories, SearchParams};

/// Search from the command line. Read-only: no reinforcement side effects.
pub fn search(config: &CortexConfig, query: &str, limit: usize) -> Result<()> {
    let conn = cortex::db::open_database(config.resolved_db_path())?;

    let params = SearchParams {
        query: Some(query.to_string()),
        project: config.project.clone(),
        limit,
        ..Default::default()
    };
    let results = search_memories(&conn, &params, config)?;

    if results.is_empty() {
        println!("no matches");
        return Ok(());
    }
    for result in results {
        println!(
            "{:>6.3}  #{:<5} [{}] {}",
            result.relevance, result.memory.id, result.memory.category, result.memory.title
        );
    }
    Ok(())
}

use anyhow::Result;

use cortex::config::CortexConfig;
use cortex::memory::stats::memory_stats;

/// Print store statistics as JSON.
pub fn stats(config: &CortexConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = cortex::db::open_database(&db_path)?;
    let stats = memory_stats(&conn, config.project.as_deref(), Some(&db_path))?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

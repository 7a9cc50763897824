use anyhow::Result;

use cortex::config::CortexConfig;
use cortex::memory::export::export_memories;

/// Export memories as JSON to stdout.
pub fn export(config: &CortexConfig, project: Option<&str>) -> Result<()> {
    let conn = cortex::db::open_database(config.resolved_db_path())?;
    let memories = export_memories(&conn, project)?;
    println!("{}", serde_json::to_string_pretty(&memories)?);
    tracing::info!(count = memories.len(), "exported");
    Ok(())
}

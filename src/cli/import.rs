use anyhow::{Context, Result};
use std::path::Path;

use cortex::config::CortexConfig;
use cortex::memory::export::import_memories;
use cortex::memory::types::Memory;

/// Import memories from a JSON file. Duplicate (project, title, created_at)
/// rows are skipped.
pub fn import(config: &CortexConfig, file: &Path) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read import file: {}", file.display()))?;
    let memories: Vec<Memory> =
        serde_json::from_str(&json).context("failed to parse import JSON")?;

    let mut conn = cortex::db::open_database(config.resolved_db_path())?;
    let imported = import_memories(&mut conn, &memories)?;

    println!("imported {imported} of {} memories", memories.len());
    Ok(())
}

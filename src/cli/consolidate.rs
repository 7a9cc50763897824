use anyhow::Result;

use cortex::config::CortexConfig;
use cortex::memory::consolidate::{preview_consolidation, run_consolidation};

/// Run (or preview) a consolidation pass from the command line. Manual runs
/// force past the one-hour re-entry gate.
pub fn consolidate(config: &CortexConfig, dry_run: bool) -> Result<()> {
    let db_path = config.resolved_db_path();
    let mut conn = cortex::db::open_database(&db_path)?;

    if dry_run {
        let preview = preview_consolidation(&conn, config)?;
        println!("{}", serde_json::to_string_pretty(&preview)?);
        return Ok(());
    }

    let report = run_consolidation(&mut conn, config, true, None)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

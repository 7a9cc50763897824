use anyhow::Result;

use cortex::config::CortexConfig;

/// Delete the database files (main, WAL, SHM, lock) and start fresh.
pub fn reset(config: &CortexConfig, confirm: bool) -> Result<()> {
    if !confirm {
        anyhow::bail!("reset is irreversible; re-run with --confirm");
    }

    let db_path = config.resolved_db_path();
    let mut removed = 0;
    for suffix in ["", "-wal", "-shm", "-lock"] {
        let mut os = db_path.as_os_str().to_owned();
        os.push(suffix);
        let path = std::path::PathBuf::from(os);
        if path.exists() {
            std::fs::remove_file(&path)?;
            removed += 1;
        }
    }

    println!("removed {removed} files; a fresh database will be created on next start");
    Ok(())
}

use anyhow::Result;

use cortex::config::CortexConfig;
use cortex::db;

/// Full health check: schema version, integrity, row counts, file size.
pub fn doctor(config: &CortexConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    let report = db::check_database_health(&conn, Some(&db_path))?;

    println!("database:        {}", db_path.display());
    println!("schema version:  {}", report.schema_version);
    println!(
        "integrity:       {}",
        if report.integrity_ok { "ok".to_string() } else { report.integrity_details.clone() }
    );
    println!("memories:        {}", report.memory_count);
    println!("links:           {}", report.link_count);
    println!("sessions:        {}", report.session_count);
    println!("file size:       {} bytes", report.db_size_bytes);

    if !report.integrity_ok {
        anyhow::bail!("integrity check failed; restore from a backup or export");
    }
    Ok(())
}

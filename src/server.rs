//! MCP server initialization over stdio.
//!
//! Wires the database, advisory lock, and tool handler into a running server.
//! A startup consolidation pass runs first (skipped when the last run is
//! recent), and a periodic pass fires on the configured interval for as long
//! as the server lives.

use anyhow::Result;
use rmcp::ServiceExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::CortexConfig;
use crate::db;
use crate::memory::consolidate;
use crate::tools::CortexTools;

/// Start the MCP server on stdio and block until the client disconnects.
pub async fn serve_stdio(config: CortexConfig) -> Result<()> {
    tracing::info!("starting Cortex MCP server on stdio");

    let db_path = config.resolved_db_path();
    let _lock = db::LockGuard::acquire(&db_path)?;
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    let db = Arc::new(Mutex::new(conn));
    let config = Arc::new(config);

    // startup pass; the engine skips it when the last run is under an hour old
    run_consolidation_task(&db, &config);
    spawn_periodic_consolidation(Arc::clone(&db), Arc::clone(&config));

    let tools = CortexTools::new(Arc::clone(&db), Arc::clone(&config), Some(db_path));
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running — waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// One consolidation attempt against the shared handle; failures are logged,
/// never raised.
fn run_consolidation_task(db: &Arc<Mutex<rusqlite::Connection>>, config: &Arc<CortexConfig>) {
    match db.lock() {
        Ok(mut conn) => {
            if let Err(err) = consolidate::run_consolidation(&mut conn, config, false, None) {
                tracing::warn!(%err, "consolidation failed");
            }
        }
        Err(err) => tracing::warn!(%err, "db lock poisoned; skipping consolidation"),
    }
}

/// Re-run consolidation every `consolidation_interval` seconds.
fn spawn_periodic_consolidation(db: Arc<Mutex<rusqlite::Connection>>, config: Arc<CortexConfig>) {
    let period = Duration::from_secs(config.consolidation_interval.max(60));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        interval.tick().await; // first tick fires immediately; startup already ran
        loop {
            interval.tick().await;
            let db = Arc::clone(&db);
            let config = Arc::clone(&config);
            let outcome = tokio::task::spawn_blocking(move || {
                run_consolidation_task(&db, &config);
            })
            .await;
            if let Err(err) = outcome {
                tracing::warn!(%err, "periodic consolidation task panicked");
            }
        }
    });
}

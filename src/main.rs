mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cortex::config::CortexConfig;
use cortex::server;

#[derive(Parser)]
#[command(name = "cortex", version, about = "Persistent memory engine for conversational assistants")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio transport)
    Serve,
    /// Run a consolidation pass now
    Consolidate {
        /// Report what would change without mutating
        #[arg(long)]
        dry_run: bool,
    },
    /// Export memories as JSON to stdout
    Export {
        /// Limit to one project (plus transferable globals)
        #[arg(long)]
        project: Option<String>,
    },
    /// Import memories from a JSON file
    Import {
        /// Path to a JSON array of memory rows
        file: std::path::PathBuf,
    },
    /// Show store statistics
    Stats,
    /// Search memories from the command line
    Search {
        /// Keyword query
        query: String,
        /// Maximum results
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Check database health
    Doctor,
    /// Delete the database and start fresh
    Reset {
        /// Required; this is irreversible
        #[arg(long)]
        confirm: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = CortexConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC and JSON exports.
    let filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match cli.command {
        Command::Serve => server::serve_stdio(config).await?,
        Command::Consolidate { dry_run } => cli::consolidate(&config, dry_run)?,
        Command::Export { project } => cli::export(&config, project.as_deref())?,
        Command::Import { file } => cli::import(&config, &file)?,
        Command::Stats => cli::stats(&config)?,
        Command::Search { query, limit } => cli::search(&config, &query, limit)?,
        Command::Doctor => cli::doctor(&config)?,
        Command::Reset { confirm } => cli::reset(&config, confirm)?,
    }

    Ok(())
}

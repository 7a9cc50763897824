//! MCP tool surface — the 15 operations the host exposes.
//!
//! [`CortexTools`] owns the shared state (database handle, configuration,
//! current project) and routes tool calls into the engine. Database work runs
//! in `spawn_blocking`; fire-and-forget side effects (search reinforcement,
//! capacity-triggered consolidation) are spawned as detached tasks whose
//! failures are logged, never surfaced to the caller.

pub mod forget;
pub mod links;
pub mod recall;
pub mod remember;
pub mod session;
pub mod transfer;

use rmcp::handler::server::tool::{Parameters, ToolRouter};
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use rusqlite::Connection;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use crate::config::CortexConfig;
use crate::error::CortexError;
use crate::memory::salience::Importance;
use crate::memory::search::{SearchMode, SearchParams};
use crate::memory::store::NewMemory;
use crate::memory::types::{Category, Memory, MemoryType, Relationship};
use crate::memory::{consolidate, context, export, sessions, stats, store};

use forget::ForgetParams;
use links::{GetRelatedParams, LinkMemoriesParams};
use recall::{AccessMemoryParams, RecallParams};
use remember::RememberParams;
use session::{EndSessionParams, GetContextParams, StartSessionParams};
use transfer::{
    ConsolidateParams, ExportParams, ImportParams, MemoryStatsParams, SetProjectParams,
};

/// The Cortex MCP tool handler.
#[derive(Clone)]
pub struct CortexTools {
    tool_router: ToolRouter<Self>,
    db: Arc<Mutex<Connection>>,
    config: Arc<CortexConfig>,
    project: Arc<RwLock<String>>,
    db_path: Option<PathBuf>,
}

/// Render an engine error for the tool host: stable code, message, and the
/// actionable suggestion when there is one.
fn tool_err(err: CortexError) -> String {
    match err.suggestion() {
        Some(hint) => format!("[{}] {err} — {hint}", err.code()),
        None => format!("[{}] {err}", err.code()),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("serialization failed: {e}"))
}

#[tool_router]
impl CortexTools {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        config: Arc<CortexConfig>,
        db_path: Option<PathBuf>,
    ) -> Self {
        let project = Arc::new(RwLock::new(config.detect_project()));
        Self { tool_router: Self::tool_router(), db, config, project, db_path }
    }

    /// Run a closure against the database on the blocking pool.
    async fn with_db<T, F>(&self, f: F) -> Result<T, String>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> crate::error::Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|e| CortexError::Busy(format!("db lock poisoned: {e}")))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))?
        .map_err(tool_err)
    }

    fn current_project(&self) -> String {
        self.project.read().map(|p| p.clone()).unwrap_or_else(|e| e.into_inner().clone())
    }

    /// Fire-and-forget consolidation after the short-term soft threshold.
    fn spawn_consolidation(&self) {
        let db = Arc::clone(&self.db);
        let config = Arc::clone(&self.config);
        tokio::task::spawn_blocking(move || match db.lock() {
            Ok(mut conn) => {
                if let Err(err) = consolidate::run_consolidation(&mut conn, &config, false, None)
                {
                    tracing::warn!(%err, "background consolidation failed");
                }
            }
            Err(err) => tracing::warn!(%err, "db lock poisoned; skipping consolidation"),
        });
    }

    /// Fire-and-forget reinforcement of search results.
    fn spawn_reinforcement(&self, ids: Vec<i64>, query: Option<String>) {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || match db.lock() {
            Ok(mut conn) => {
                if let Err(err) =
                    crate::memory::search::reinforce_results(&mut conn, &ids, query.as_deref())
                {
                    tracing::warn!(%err, "search reinforcement failed");
                }
            }
            Err(err) => tracing::warn!(%err, "db lock poisoned; skipping reinforcement"),
        });
    }

    /// Store a new memory.
    #[tool(description = "Store a memory. Salience, category, and tags are derived from the text unless given. Returns the new id.")]
    async fn remember(
        &self,
        Parameters(params): Parameters<RememberParams>,
    ) -> Result<String, String> {
        if params.title.trim().is_empty() {
            return Err("title must not be empty".into());
        }
        let memory_type = params
            .r#type
            .as_deref()
            .map(|t| t.parse::<MemoryType>())
            .transpose()?;
        let category = params.category.as_deref().map(|c| c.parse::<Category>()).transpose()?;
        let importance =
            params.importance.as_deref().map(|i| i.parse::<Importance>()).transpose()?;
        let project = params.project.unwrap_or_else(|| self.current_project());

        let input = NewMemory {
            title: params.title,
            content: params.content,
            memory_type,
            category,
            tags: params.tags.unwrap_or_default(),
            salience: None,
            importance,
            project: Some(project),
            scope: None,
            transferable: false,
            metadata: None,
            strict: params.strict.unwrap_or(false),
        };

        let config = Arc::clone(&self.config);
        let db_path = self.db_path.clone();
        let result = self
            .with_db(move |conn| store::add_memory(conn, input, &config, db_path.as_deref()))
            .await?;

        if result.needs_consolidation {
            self.spawn_consolidation();
        }

        tracing::info!(id = result.id, category = %result.category, "memory stored");
        to_json(&serde_json::json!({
            "id": result.id,
            "category": result.category,
            "salience": result.salience,
            "tags": result.tags,
            "linked": result.linked,
        }))
    }

    /// Search memories by keyword relevance blended with salience.
    #[tool(description = "Search memories. Blends keyword relevance with decayed salience, recency, links, and tags. Modes: query|recent|important.")]
    async fn recall(
        &self,
        Parameters(params): Parameters<RecallParams>,
    ) -> Result<String, String> {
        let mode = match params.mode.as_deref() {
            None | Some("query") => SearchMode::Query,
            Some("recent") => SearchMode::Recent,
            Some("important") => SearchMode::Important,
            Some(other) => return Err(format!("unknown recall mode: {other}")),
        };
        let category = params.category.as_deref().map(|c| c.parse::<Category>()).transpose()?;
        let project = params.project.unwrap_or_else(|| self.current_project());

        let search = SearchParams {
            query: params.query.clone(),
            project: Some(project),
            category,
            min_salience: params.min_salience,
            include_global: params.include_global.unwrap_or(true),
            include_decayed: false,
            limit: params.limit.unwrap_or(10),
            mode,
        };

        let config = Arc::clone(&self.config);
        let results = self
            .with_db(move |conn| crate::memory::search::search_memories(conn, &search, &config))
            .await?;

        let ids: Vec<i64> = results.iter().map(|r| r.memory.id).collect();
        if !ids.is_empty() {
            self.spawn_reinforcement(ids, params.query);
        }

        to_json(&results)
    }

    /// Structured context digest for a project.
    #[tool(description = "Structured context for a project: key decisions, conventions, pending todos, recent activity, and query-relevant memories.")]
    async fn get_context(
        &self,
        Parameters(params): Parameters<GetContextParams>,
    ) -> Result<String, String> {
        let project = params.project.unwrap_or_else(|| self.current_project());
        let config = Arc::clone(&self.config);
        let summary = self
            .with_db(move |conn| {
                context::get_context(conn, params.query.as_deref(), &project, &config)
            })
            .await?;
        to_json(&summary)
    }

    /// Delete memories matching a filter, with preview and confirm gates.
    #[tool(description = "Delete memories by ids, category, or age. dry_run previews; deletes over the safety threshold need confirm=true.")]
    async fn forget(
        &self,
        Parameters(params): Parameters<ForgetParams>,
    ) -> Result<String, String> {
        let category = params.category.as_deref().map(|c| c.parse::<Category>()).transpose()?;
        let filter = crate::memory::forget::ForgetParams {
            ids: params.ids,
            category,
            older_than_days: params.older_than,
            project: None,
            dry_run: params.dry_run.unwrap_or(false),
            confirm: params.confirm.unwrap_or(false),
        };

        let config = Arc::clone(&self.config);
        let db_path = self.db_path.clone();
        let result = self
            .with_db(move |conn| {
                crate::memory::forget::forget(conn, &filter, &config, db_path.as_deref())
            })
            .await?;
        to_json(&result)
    }

    /// Open a session and return its id plus the project context.
    #[tool(description = "Start a work session. Returns the session id and the project's context digest.")]
    async fn start_session(
        &self,
        Parameters(params): Parameters<StartSessionParams>,
    ) -> Result<String, String> {
        let project = params.project.unwrap_or_else(|| self.current_project());
        let config = Arc::clone(&self.config);
        let (session, digest) = self
            .with_db(move |conn| {
                let session = sessions::start_session(conn, &project)?;
                let digest = context::get_context(conn, None, &project, &config)?;
                Ok((session, digest))
            })
            .await?;
        to_json(&serde_json::json!({ "session": session, "context": digest }))
    }

    /// Close a session and return its activity stats.
    #[tool(description = "End a session. Tallies memories created/accessed during it; an optional summary is stored as an episodic memory.")]
    async fn end_session(
        &self,
        Parameters(params): Parameters<EndSessionParams>,
    ) -> Result<String, String> {
        let config = Arc::clone(&self.config);
        let session = self
            .with_db(move |conn| {
                sessions::end_session(conn, params.session_id, params.summary.as_deref(), &config)
            })
            .await?;
        to_json(&session)
    }

    /// Run (or preview) a consolidation pass.
    #[tool(description = "Run the maintenance pass: promote, delete decayed, enforce caps, merge duplicates. dry_run previews the changes.")]
    async fn consolidate(
        &self,
        Parameters(params): Parameters<ConsolidateParams>,
    ) -> Result<String, String> {
        let config = Arc::clone(&self.config);
        if params.dry_run.unwrap_or(false) {
            let preview = self
                .with_db(move |conn| consolidate::preview_consolidation(conn, &config))
                .await?;
            to_json(&preview)
        } else {
            let report = self
                .with_db(move |conn| {
                    consolidate::run_consolidation(conn, &config, false, None)
                })
                .await?;
            to_json(&report)
        }
    }

    /// Store statistics.
    #[tool(description = "Counts by type and category, link/session totals, and database size.")]
    async fn memory_stats(
        &self,
        Parameters(params): Parameters<MemoryStatsParams>,
    ) -> Result<String, String> {
        let db_path = self.db_path.clone();
        let response = self
            .with_db(move |conn| {
                stats::memory_stats(conn, params.project.as_deref(), db_path.as_deref())
            })
            .await?;
        to_json(&response)
    }

    /// Neighbors of a memory, grouped by relationship.
    #[tool(description = "Neighbors of a memory in the link graph, grouped by relationship and ordered by strength.")]
    async fn get_related(
        &self,
        Parameters(params): Parameters<GetRelatedParams>,
    ) -> Result<String, String> {
        let related = self
            .with_db(move |conn| crate::memory::links::get_related(conn, params.id))
            .await?;
        to_json(&related)
    }

    /// Create or strengthen a typed edge between two memories.
    #[tool(description = "Create or strengthen a typed edge: references|extends|contradicts|related. Strength saturates at 1.0.")]
    async fn link_memories(
        &self,
        Parameters(params): Parameters<LinkMemoriesParams>,
    ) -> Result<String, String> {
        let relationship = params.relationship.parse::<Relationship>()?;
        let strength = params.strength.unwrap_or(0.5);
        let link = self
            .with_db(move |conn| {
                crate::memory::links::link_memories(
                    conn,
                    params.source_id,
                    params.target_id,
                    relationship,
                    strength,
                )
            })
            .await?;
        to_json(&link)
    }

    /// Reinforce a single memory.
    #[tool(description = "Reinforce one memory: bump its access count and salience, refresh recency, strengthen co-accessed links.")]
    async fn access_memory(
        &self,
        Parameters(params): Parameters<AccessMemoryParams>,
    ) -> Result<String, String> {
        let memory = self.with_db(move |conn| store::access_memory(conn, params.id)).await?;
        to_json(&memory)
    }

    /// Export memories as a JSON array.
    #[tool(description = "Export memories as a JSON array, optionally scoped to one project plus transferable globals.")]
    async fn export_memories(
        &self,
        Parameters(params): Parameters<ExportParams>,
    ) -> Result<String, String> {
        let rows = self
            .with_db(move |conn| export::export_memories(conn, params.project.as_deref()))
            .await?;
        to_json(&rows)
    }

    /// Import a JSON array of memories. Additive and idempotent.
    #[tool(description = "Import a JSON array of memory rows. Additive; duplicate (project, title, created_at) rows are skipped.")]
    async fn import_memories(
        &self,
        Parameters(params): Parameters<ImportParams>,
    ) -> Result<String, String> {
        let memories: Vec<Memory> = serde_json::from_value(params.data)
            .map_err(|e| format!("import data must be an array of memory rows: {e}"))?;
        let imported =
            self.with_db(move |conn| export::import_memories(conn, &memories)).await?;
        to_json(&serde_json::json!({ "imported": imported }))
    }

    /// Current project scope.
    #[tool(description = "The current project scope.")]
    async fn get_project(&self) -> Result<String, String> {
        to_json(&serde_json::json!({ "project": self.current_project() }))
    }

    /// Change the current project scope.
    #[tool(description = "Change the current project scope (\"*\" for global).")]
    async fn set_project(
        &self,
        Parameters(params): Parameters<SetProjectParams>,
    ) -> Result<String, String> {
        if params.project.trim().is_empty() {
            return Err("project must not be empty".into());
        }
        match self.project.write() {
            Ok(mut guard) => *guard = params.project.clone(),
            Err(mut poisoned) => **poisoned.get_mut() = params.project.clone(),
        }
        to_json(&serde_json::json!({ "project": params.project }))
    }
}

#[tool_handler]
impl ServerHandler for CortexTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Cortex is a persistent memory engine. Use remember to store memories, \
                 recall to search them, get_context for a project digest, and consolidate \
                 to run maintenance."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

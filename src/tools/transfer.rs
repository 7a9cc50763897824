//! `export_memories`, `import_memories`, `consolidate`, `memory_stats`, and
//! project-scope tool parameter definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `export_memories` tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ExportParams {
    /// Limit the export to one project (plus transferable globals).
    #[schemars(description = "Limit the export to one project (plus transferable globals)")]
    pub project: Option<String>,
}

/// Parameters for the `import_memories` tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ImportParams {
    /// A JSON array of memory rows, as produced by export_memories.
    #[schemars(description = "JSON array of memory rows, as produced by export_memories")]
    pub data: serde_json::Value,
}

/// Parameters for the `consolidate` tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ConsolidateParams {
    /// Report what would change without mutating.
    #[schemars(description = "Report what would change without mutating")]
    pub dry_run: Option<bool>,
}

/// Parameters for the `memory_stats` tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryStatsParams {
    /// Scope the counts to one project (plus globals).
    #[schemars(description = "Scope the counts to one project (plus globals)")]
    pub project: Option<String>,
}

/// Parameters for the `set_project` tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SetProjectParams {
    /// New current project scope ("*" for global).
    #[schemars(description = "New current project scope (\"*\" for global)")]
    pub project: String,
}

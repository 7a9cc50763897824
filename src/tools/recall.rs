//! `recall` and `access_memory` tool parameter definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `recall` tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecallParams {
    /// Keyword query; empty returns the highest-scored memories.
    #[schemars(description = "Keyword query; empty returns the highest-scored memories")]
    pub query: Option<String>,

    /// Project scope; defaults to the engine's current project.
    #[schemars(description = "Project scope; defaults to the current project")]
    pub project: Option<String>,

    /// Restrict to one category.
    #[schemars(description = "Restrict to one category")]
    pub category: Option<String>,

    /// Minimum salience floor in [0, 1].
    #[schemars(description = "Minimum salience floor (0..1)")]
    pub min_salience: Option<f64>,

    /// Maximum results (default 10).
    #[schemars(description = "Maximum results (default 10)")]
    pub limit: Option<usize>,

    /// Include global-scope memories from other projects (default true).
    #[schemars(description = "Include global memories from other projects (default true)")]
    pub include_global: Option<bool>,

    /// Ordering mode: query (relevance), recent, or important.
    #[schemars(description = "Ordering mode: query (default)|recent|important")]
    pub mode: Option<String>,
}

/// Parameters for the `access_memory` tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AccessMemoryParams {
    /// Id of the memory to reinforce.
    #[schemars(description = "Id of the memory to reinforce")]
    pub id: i64,
}

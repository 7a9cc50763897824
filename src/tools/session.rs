//! `start_session`, `end_session`, and `get_context` tool parameter
//! definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `start_session` tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StartSessionParams {
    /// Project for the session; defaults to the current project.
    #[schemars(description = "Project for the session; defaults to the current project")]
    pub project: Option<String>,
}

/// Parameters for the `end_session` tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct EndSessionParams {
    /// Id returned by start_session.
    #[schemars(description = "Id returned by start_session")]
    pub session_id: i64,

    /// Optional summary, stored as an episodic memory.
    #[schemars(description = "Optional summary, stored as an episodic memory")]
    pub summary: Option<String>,
}

/// Parameters for the `get_context` tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetContextParams {
    /// Optional query to pull relevant memories into the digest.
    #[schemars(description = "Optional query to pull relevant memories into the digest")]
    pub query: Option<String>,

    /// Project scope; defaults to the current project.
    #[schemars(description = "Project scope; defaults to the current project")]
    pub project: Option<String>,
}

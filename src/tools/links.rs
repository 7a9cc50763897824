//! `get_related` and `link_memories` tool parameter definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `get_related` tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetRelatedParams {
    /// Memory id whose neighbors to fetch.
    #[schemars(description = "Memory id whose neighbors to fetch")]
    pub id: i64,
}

/// Parameters for the `link_memories` tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct LinkMemoriesParams {
    /// Source memory id.
    #[schemars(description = "Source memory id")]
    pub source_id: i64,

    /// Target memory id; must differ from the source.
    #[schemars(description = "Target memory id; must differ from the source")]
    pub target_id: i64,

    /// Relationship: references, extends, contradicts, or related.
    #[schemars(description = "Relationship: references|extends|contradicts|related")]
    pub relationship: String,

    /// Edge strength in [0, 1]; defaults to 0.5.
    #[schemars(description = "Edge strength (0..1), default 0.5")]
    pub strength: Option<f64>,
}

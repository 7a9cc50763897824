//! `remember` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `remember` tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RememberParams {
    /// Short summary of the memory (≤ 200 chars).
    #[schemars(description = "Short summary of the memory")]
    pub title: String,

    /// Full text content, capped at 10 KiB.
    #[schemars(description = "Full text content (truncated past 10 KiB unless strict)")]
    pub content: String,

    /// Category: architecture, pattern, preference, error, context, learning,
    /// todo, note, relationship, or custom. Suggested from the text if unset.
    #[schemars(
        description = "Category: architecture|pattern|preference|error|context|learning|todo|note|relationship|custom. Derived from the text when omitted."
    )]
    pub category: Option<String>,

    /// Extra tags merged with the automatically extracted ones.
    #[schemars(description = "Extra tags merged with the extracted ones")]
    pub tags: Option<Vec<String>>,

    /// Importance hint: high, medium, or low. Sets a salience floor/ceiling.
    #[schemars(description = "Importance hint: high|medium|low")]
    pub importance: Option<String>,

    /// Lifecycle type: short_term (default), long_term, or episodic.
    #[schemars(description = "Lifecycle type: short_term (default)|long_term|episodic")]
    pub r#type: Option<String>,

    /// Project scope; defaults to the engine's current project.
    #[schemars(description = "Project scope; defaults to the current project")]
    pub project: Option<String>,

    /// Reject oversized content instead of truncating.
    #[schemars(description = "Reject content over 10 KiB instead of truncating")]
    pub strict: Option<bool>,
}

//! `forget` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `forget` tool. Filters combine with AND.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ForgetParams {
    /// Specific memory ids to delete.
    #[schemars(description = "Specific memory ids to delete")]
    pub ids: Option<Vec<i64>>,

    /// Delete every memory in this category.
    #[schemars(description = "Delete every memory in this category")]
    pub category: Option<String>,

    /// Only memories created more than this many days ago.
    #[schemars(description = "Only memories created more than this many days ago")]
    pub older_than: Option<u32>,

    /// Preview the matches without deleting.
    #[schemars(description = "Preview the matches without deleting")]
    pub dry_run: Option<bool>,

    /// Required when the match count exceeds the bulk-delete threshold.
    #[schemars(description = "Required when matches exceed the bulk-delete threshold")]
    pub confirm: Option<bool>,
}

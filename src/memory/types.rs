//! Core memory type definitions.
//!
//! Defines [`MemoryType`] (the lifecycle classes), [`Category`] (classification
//! with per-category deletion thresholds), [`Scope`], [`Relationship`] (typed
//! link-graph edges), and the [`Memory`], [`MemoryLink`], and [`Session`]
//! records matching the table schemas.

use serde::{Deserialize, Serialize};

/// Lifecycle class of a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// Recent working-context entry; decays per hour.
    ShortTerm,
    /// Consolidated entry; decays per day.
    LongTerm,
    /// Time-anchored entry (session markers); decays like long-term.
    Episodic,
}

impl MemoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShortTerm => "short_term",
            Self::LongTerm => "long_term",
            Self::Episodic => "episodic",
        }
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short_term" => Ok(Self::ShortTerm),
            "long_term" => Ok(Self::LongTerm),
            "episodic" => Ok(Self::Episodic),
            _ => Err(format!("unknown memory type: {s}")),
        }
    }
}

/// Classification of a memory. Affects the deletion threshold during
/// consolidation: structural knowledge survives longer than scratch notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Architecture,
    Pattern,
    Preference,
    Error,
    Context,
    Learning,
    Todo,
    Note,
    Relationship,
    Custom,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Self::Architecture,
        Self::Pattern,
        Self::Preference,
        Self::Error,
        Self::Context,
        Self::Learning,
        Self::Todo,
        Self::Note,
        Self::Relationship,
        Self::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Architecture => "architecture",
            Self::Pattern => "pattern",
            Self::Preference => "preference",
            Self::Error => "error",
            Self::Context => "context",
            Self::Learning => "learning",
            Self::Todo => "todo",
            Self::Note => "note",
            Self::Relationship => "relationship",
            Self::Custom => "custom",
        }
    }

    /// Decayed score below which a memory of this category becomes eligible
    /// for deletion.
    pub fn deletion_threshold(&self) -> f64 {
        match self {
            Self::Architecture => 0.15,
            Self::Pattern | Self::Preference => 0.20,
            Self::Error | Self::Learning | Self::Context | Self::Relationship | Self::Custom => {
                0.22
            }
            Self::Note | Self::Todo => 0.25,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "architecture" => Ok(Self::Architecture),
            "pattern" => Ok(Self::Pattern),
            "preference" => Ok(Self::Preference),
            "error" => Ok(Self::Error),
            "context" => Ok(Self::Context),
            "learning" => Ok(Self::Learning),
            "todo" => Ok(Self::Todo),
            "note" => Ok(Self::Note),
            "relationship" => Ok(Self::Relationship),
            "custom" => Ok(Self::Custom),
            _ => Err(format!("unknown category: {s}")),
        }
    }
}

/// Visibility scope for a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Visible only to queries for the owning project.
    Project,
    /// Visible cross-project.
    Global,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Global => "global",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project" => Ok(Self::Project),
            "global" => Ok(Self::Global),
            _ => Err(format!("unknown scope: {s}")),
        }
    }
}

/// Typed relationship carried by a link-graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    /// One memory cites another.
    References,
    /// Builds on the target.
    Extends,
    /// Overrides the target.
    Contradicts,
    /// Default association.
    Related,
}

impl Relationship {
    pub const ALL: [Relationship; 4] =
        [Self::References, Self::Extends, Self::Contradicts, Self::Related];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::References => "references",
            Self::Extends => "extends",
            Self::Contradicts => "contradicts",
            Self::Related => "related",
        }
    }
}

impl std::fmt::Display for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Relationship {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "references" => Ok(Self::References),
            "extends" => Ok(Self::Extends),
            "contradicts" => Ok(Self::Contradicts),
            "related" => Ok(Self::Related),
            _ => Err(format!("unknown relationship: {s}")),
        }
    }
}

/// The project sentinel meaning "visible everywhere".
pub const GLOBAL_PROJECT: &str = "*";

/// A memory record, matching the `memories` table schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// Rowid primary key; assigned on insert, never reused.
    pub id: i64,
    /// Lifecycle class.
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    pub category: Category,
    /// Short summary (≤ ~200 chars).
    pub title: String,
    /// Body, at most 10 KiB as stored.
    pub content: String,
    /// Scoping key, or `"*"` for the global sentinel.
    pub project: String,
    pub scope: Scope,
    /// Included in cross-project exports when set.
    pub transferable: bool,
    /// Lowercased, deduplicated.
    pub tags: Vec<String>,
    /// Base importance in `[0.0, 1.0]`.
    pub salience: f64,
    /// Effective score after decay; recomputed on the fly, persisted during
    /// consolidation.
    pub decayed_score: f64,
    pub access_count: u32,
    /// RFC 3339 timestamp of the last reinforcement.
    pub last_accessed: String,
    /// RFC 3339 creation timestamp, immutable after insert.
    pub created_at: String,
    /// Free-form JSON bag; unknown keys are preserved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// A typed, weighted directed edge between two memories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryLink {
    pub source_id: i64,
    pub target_id: i64,
    pub relationship: Relationship,
    /// Edge weight in `[0.0, 1.0]`; saturates, never explicitly decayed.
    pub strength: f64,
    pub created_at: String,
}

/// A bounded work period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub project: String,
    pub started_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub memories_created: u32,
    pub memories_accessed: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_type_round_trips() {
        for t in [MemoryType::ShortTerm, MemoryType::LongTerm, MemoryType::Episodic] {
            assert_eq!(t.as_str().parse::<MemoryType>().unwrap(), t);
        }
        assert!("working".parse::<MemoryType>().is_err());
    }

    #[test]
    fn category_round_trips() {
        for c in Category::ALL {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), c);
        }
    }

    #[test]
    fn deletion_thresholds_match_category_tiers() {
        assert_eq!(Category::Architecture.deletion_threshold(), 0.15);
        assert_eq!(Category::Pattern.deletion_threshold(), 0.20);
        assert_eq!(Category::Preference.deletion_threshold(), 0.20);
        assert_eq!(Category::Error.deletion_threshold(), 0.22);
        assert_eq!(Category::Note.deletion_threshold(), 0.25);
        assert_eq!(Category::Todo.deletion_threshold(), 0.25);
    }

    #[test]
    fn relationship_round_trips() {
        for r in Relationship::ALL {
            assert_eq!(r.as_str().parse::<Relationship>().unwrap(), r);
        }
        assert!("supersedes".parse::<Relationship>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&MemoryType::ShortTerm).unwrap();
        assert_eq!(json, "\"short_term\"");
        let json = serde_json::to_string(&Relationship::Contradicts).unwrap();
        assert_eq!(json, "\"contradicts\"");
    }
}

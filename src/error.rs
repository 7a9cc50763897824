//! Engine error taxonomy with stable codes.
//!
//! Every error carries a machine-readable [`CortexError::code`] for the tool
//! host, a recoverability flag, and (for recoverable errors) a human-actionable
//! suggestion. Binary edges (`main.rs`, `cli/`) wrap these in `anyhow`.

use thiserror::Error;

/// Hard cap on stored content, in bytes.
pub const MAX_CONTENT_BYTES: usize = 10 * 1024;

/// File size at which mutating writes emit a warning diagnostic.
pub const DB_WARN_BYTES: u64 = 50 * 1024 * 1024;

/// File size at which mutating writes are rejected.
pub const DB_LIMIT_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum CortexError {
    /// The storage layer was never initialized.
    #[error("database not initialized")]
    NotInitialized,

    /// Database file has crossed the hard size limit; mutations are refused.
    #[error("database file is {size} bytes, over the {limit} byte limit")]
    DatabaseBlocked { size: u64, limit: u64 },

    /// Transient lock contention that outlived the busy timeout.
    #[error("database busy: {0}")]
    Busy(String),

    /// Integrity check failed or the file is unreadable.
    #[error("database corrupt: {0}")]
    Corrupt(String),

    #[error("memory not found: {0}")]
    MemoryNotFound(i64),

    #[error("session not found: {0}")]
    SessionNotFound(i64),

    /// The search query could not be turned into a valid full-text match.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Content over the 10 KiB cap while the caller requested strict mode.
    #[error("content is {size} bytes, over the {max} byte limit")]
    ContentTooLarge { size: usize, max: usize },

    /// A bulk delete matched more rows than the safety threshold allows
    /// without explicit confirmation.
    #[error("bulk delete would remove {count} memories (threshold {threshold}); pass confirm=true")]
    BulkDeleteBlocked { count: usize, threshold: usize },

    /// Self-link, missing endpoint, or unknown relationship type.
    #[error("invalid relationship: {0}")]
    InvalidRelationship(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlite(rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, CortexError>;

impl CortexError {
    /// Stable machine-readable code for the tool host.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotInitialized => "DB_NOT_INIT",
            Self::DatabaseBlocked { .. } => "DB_BLOCKED",
            Self::Busy(_) => "DB_BUSY",
            Self::Corrupt(_) => "DB_CORRUPT",
            Self::MemoryNotFound(_) => "MEMORY_NOT_FOUND",
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::InvalidQuery(_) => "INVALID_QUERY",
            Self::ContentTooLarge { .. } => "CONTENT_TOO_LARGE",
            Self::BulkDeleteBlocked { .. } => "BULK_DELETE_BLOCKED",
            Self::InvalidRelationship(_) => "INVALID_RELATIONSHIP",
            Self::Json(_) => "INVALID_QUERY",
            Self::Sqlite(_) => "DB_ERROR",
        }
    }

    /// Whether the caller can do something about it.
    pub fn recoverable(&self) -> bool {
        !matches!(self, Self::NotInitialized | Self::Corrupt(_))
    }

    /// Human-actionable hint surfaced alongside recoverable errors.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::DatabaseBlocked { .. } => {
                Some("run consolidate or forget old memories to reclaim space")
            }
            Self::Busy(_) => Some("another writer holds the database; retry shortly"),
            Self::Corrupt(_) => Some("restore the database from a backup or export"),
            Self::BulkDeleteBlocked { .. } => {
                Some("re-run with confirm=true, or narrow the filter")
            }
            Self::ContentTooLarge { .. } => Some("shorten the content or drop strict mode"),
            _ => None,
        }
    }
}

/// Map SQLite errors, surfacing busy/locked as the retriable [`CortexError::Busy`].
impl From<rusqlite::Error> for CortexError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg)
                if matches!(
                    e.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                Self::Busy(msg.clone().unwrap_or_else(|| e.to_string()))
            }
            rusqlite::Error::SqliteFailure(e, msg)
                if e.code == rusqlite::ErrorCode::DatabaseCorrupt =>
            {
                Self::Corrupt(msg.clone().unwrap_or_else(|| e.to_string()))
            }
            _ => Self::Sqlite(err),
        }
    }
}

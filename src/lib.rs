//! Persistent memory engine for conversational assistants.
//!
//! Cortex is an embedded store for short textual memories: it classifies and
//! scores them on the way in, searches them by keyword relevance blended with
//! temporal salience, auto-links related entries, and periodically
//! consolidates short-term memories into long-term storage while decaying and
//! evicting stale ones.
//!
//! # Architecture
//!
//! - **Storage**: SQLite (WAL) with an FTS5 full-text index over title,
//!   content, and tags
//! - **Ranking**: normalized BM25 blended with a decay model, the link
//!   graph, and recency/category/tag boosts
//! - **Lifecycle**: short-term entries decay per hour, long-term per day;
//!   a consolidation pass promotes, merges, and evicts under hard caps
//! - **Transport**: MCP over stdio
//!
//! # Modules
//!
//! - [`config`] — configuration from `hooks.json` and environment overrides
//! - [`db`] — database initialization, schema, migrations, guardrails
//! - [`error`] — the stable-code error taxonomy
//! - [`memory`] — the engine: store, search, links, consolidation, sessions
//! - [`tools`] — the MCP tool surface
//! - [`server`] — stdio server wiring

pub mod config;
pub mod db;
pub mod error;
pub mod memory;
pub mod server;
pub mod tools;

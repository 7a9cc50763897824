//! Command-line maintenance and inspection commands.
//!
//! Each command opens the configured database directly (no server involved)
//! and prints results to stdout; diagnostics go to stderr via `tracing`.

mod consolidate;
mod doctor;
mod export;
mod import;
mod reset;
mod search;
mod stats;

pub use consolidate::consolidate;
pub use doctor::doctor;
pub use export::export;
pub use import::import;
pub use reset::reset;
pub use search::search;
pub use stats::stats;

//! Configuration loading from `~/.claude-cortex/hooks.json` plus environment
//! overrides, and resolution of the data directory (with the legacy
//! `~/.claude-memory/` fallback).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Fraction of `max_short_term` at which an insert schedules an asynchronous
/// consolidation.
pub const SOFT_CAPACITY_FRACTION: f64 = 0.9;

/// All knobs are optional in the config file; every field has a default.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct CortexConfig {
    /// Hard cap on short-term memories after consolidation.
    pub max_short_term: usize,
    /// Hard cap on long-term memories after consolidation.
    pub max_long_term: usize,
    /// Base decay rate per hour (short-term) or day (long-term).
    pub decay_rate: f64,
    /// Minimum salience for long-term promotion.
    pub salience_threshold: f64,
    /// Seconds between periodic consolidation runs.
    pub consolidation_interval: u64,
    /// Override for project auto-detection.
    pub project: Option<String>,
    /// Matches above this count require `confirm: true` on forget.
    pub bulk_delete_threshold: usize,
    /// Hours before an unaccessed short-term memory becomes
    /// promotion-eligible on age alone.
    pub retention_hours: f64,
    pub log_level: String,
    /// Database path override; normally derived from the data directory.
    pub db_path: Option<String>,
}

impl Default for CortexConfig {
    fn default() -> Self {
        Self {
            max_short_term: 250,
            max_long_term: 5000,
            decay_rate: 0.995,
            salience_threshold: 0.6,
            consolidation_interval: 4 * 3600,
            project: None,
            bulk_delete_threshold: 50,
            retention_hours: 24.0,
            log_level: "info".into(),
            db_path: None,
        }
    }
}

impl CortexConfig {
    /// Load from the default config path, then apply env overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env overrides. A missing file
    /// yields defaults; a malformed file is an error (silent fallback would
    /// hide typos in capacity limits).
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            serde_json::from_str(&contents).context("failed to parse config JSON")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            CortexConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (CORTEX_DB, CORTEX_PROJECT,
    /// CORTEX_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CORTEX_DB") {
            self.db_path = Some(val);
        }
        if let Ok(val) = std::env::var("CORTEX_PROJECT") {
            self.project = Some(val);
        }
        if let Ok(val) = std::env::var("CORTEX_LOG_LEVEL") {
            self.log_level = val;
        }
    }

    /// Resolve the database path: explicit override, else
    /// `<data dir>/memories.db`.
    pub fn resolved_db_path(&self) -> PathBuf {
        match &self.db_path {
            Some(p) => expand_tilde(p),
            None => data_dir().join("memories.db"),
        }
    }

    /// The active project scope: configured override, else the name of the
    /// current working directory, else the global sentinel.
    pub fn detect_project(&self) -> String {
        if let Some(p) = &self.project {
            return p.clone();
        }
        std::env::current_dir()
            .ok()
            .and_then(|d| d.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| crate::memory::types::GLOBAL_PROJECT.to_string())
    }

    /// Insert count at which an asynchronous consolidation is scheduled.
    pub fn soft_short_term_threshold(&self) -> usize {
        (self.max_short_term as f64 * SOFT_CAPACITY_FRACTION) as usize
    }
}

/// Data directory: `~/.claude-cortex/`, unless only the legacy
/// `~/.claude-memory/` exists, which is then reused transparently.
pub fn data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("home directory must exist");
    let current = home.join(".claude-cortex");
    let legacy = home.join(".claude-memory");
    if !current.exists() && legacy.exists() {
        tracing::info!(path = %legacy.display(), "using legacy data directory");
        return legacy;
    }
    current
}

/// Default config file path: `~/.claude-cortex/hooks.json`.
pub fn default_config_path() -> PathBuf {
    data_dir().join("hooks.json")
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir().expect("home directory must exist").join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = CortexConfig::default();
        assert_eq!(config.max_short_term, 250);
        assert_eq!(config.max_long_term, 5000);
        assert_eq!(config.decay_rate, 0.995);
        assert_eq!(config.salience_threshold, 0.6);
        assert_eq!(config.consolidation_interval, 14_400);
        assert_eq!(config.bulk_delete_threshold, 50);
    }

    #[test]
    fn parse_json_config() {
        let json = r#"{
            "maxShortTerm": 100,
            "maxLongTerm": 1000,
            "decayRate": 0.99,
            "project": "cortex-dev"
        }"#;
        let config: CortexConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_short_term, 100);
        assert_eq!(config.max_long_term, 1000);
        assert_eq!(config.decay_rate, 0.99);
        assert_eq!(config.project.as_deref(), Some("cortex-dev"));
        // defaults still apply for unset fields
        assert_eq!(config.salience_threshold, 0.6);
        assert_eq!(config.bulk_delete_threshold, 50);
    }

    #[test]
    fn unknown_keys_are_tolerated() {
        let json = r#"{"maxShortTerm": 10, "futureKnob": true}"#;
        let config: CortexConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_short_term, 10);
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hooks.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(CortexConfig::load_from(&path).is_err());
    }

    #[test]
    fn missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CortexConfig::load_from(dir.path().join("hooks.json")).unwrap();
        assert_eq!(config.max_short_term, 250);
    }

    #[test]
    fn soft_threshold_is_ninety_percent() {
        let config = CortexConfig { max_short_term: 100, ..Default::default() };
        assert_eq!(config.soft_short_term_threshold(), 90);
    }
}

// model = "claude-opus-4-5"
// created = "2026-02-03"
// modified = "2026-02-03"
// driver = "Isaac Clayton"

//! Tunables for buffers and ropes.
//!
//! Every field has a default, so a TOML document only needs to name the
//! values it overrides:
//!
//! ```
//! let config = tandem::Config::from_toml_str("group_interval_ms = 0").unwrap();
//! assert_eq!(config.group_interval_ms, 0);
//! assert_eq!(config.history_limit, 1024);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Buffer configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Transactions committed within this many milliseconds of the previous
    /// one are merged into a single undo step. Zero disables grouping.
    pub group_interval_ms: u64,
    /// Maximum number of undo steps kept per history branch.
    pub history_limit: usize,
    /// Insertions of at least this many bytes build their chunks on worker
    /// threads.
    pub parallel_threshold: usize,
    /// Number of worker threads used for large insertions.
    pub parallel_workers: usize,
    /// Dropped anchors are collected every this many commits.
    pub anchor_gc_interval: usize,
}

impl Default for Config {
    fn default() -> Self {
        return Config {
            group_interval_ms: 300,
            history_limit: 1024,
            parallel_threshold: 64 * 1024,
            parallel_workers: 4,
            anchor_gc_interval: 256,
        };
    }
}

impl Config {
    /// Parse a configuration from TOML, filling missing fields with defaults.
    pub fn from_toml_str(source: &str) -> Result<Config> {
        let config: Config = toml::from_str(source)?;
        config.validate()?;
        return Ok(config);
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.history_limit == 0 {
            return Err(Error::Config("history_limit must be at least 1".into()));
        }
        if self.parallel_workers == 0 {
            return Err(Error::Config("parallel_workers must be at least 1".into()));
        }
        return Ok(());
    }

    #[inline]
    pub fn group_interval(&self) -> Duration {
        return Duration::from_millis(self.group_interval_ms);
    }
}

//! Environment-driven settings for the `habits` binary.

use anyhow::{Context, Result};
use habit_engine::Zone;
use tracing::Level;

/// IANA zone name (or `local`) used to derive calendar days.
pub const TZ_VAR: &str = "HABITS_TZ";
/// Log level for stderr diagnostics (`error`, `warn`, `info`, `debug`, `trace`).
pub const LOG_VAR: &str = "HABITS_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    pub zone: Zone,
    pub log_level: Level,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            zone: Zone::Local,
            log_level: Level::WARN,
        }
    }
}

impl CliConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(tz) = lookup(TZ_VAR).filter(|v| !v.trim().is_empty()) {
            config.zone = tz
                .parse()
                .with_context(|| format!("reading {TZ_VAR}={tz}"))?;
        }
        if let Some(level) = lookup(LOG_VAR).filter(|v| !v.trim().is_empty()) {
            config.log_level = level
                .trim()
                .parse()
                .with_context(|| format!("reading {LOG_VAR}={level}"))?;
        }
        Ok(config)
    }

    /// A `--tz` flag beats the environment.
    pub fn with_zone(mut self, zone: Option<Zone>) -> Self {
        if let Some(zone) = zone {
            self.zone = zone;
        }
        self
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

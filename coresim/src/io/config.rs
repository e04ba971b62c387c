//! Simulation configuration stored as TOML (default `coresim.toml`).

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::ledger::DEFAULT_QUARANTINE_THRESHOLD;
use crate::core::sampler::FaultModel;
use crate::error::ConfigError;

/// Default config file name, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "coresim.toml";

/// Simulation parameters (TOML).
///
/// Missing fields fall back to the defaults of the reference simulation:
/// five cores, 30% faults, 0.5-1.5 s tasks, 1 s polls, a grace threshold of
/// three successes and a ten second run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// Number of cores to spawn.
    pub core_count: usize,

    /// Probability in `[0, 1]` that a task faults.
    pub fault_probability: f64,

    /// Inter-task delay bounds `[min, max]` in seconds.
    pub delay_range_secs: [f64; 2],

    /// Seconds between monitor polls.
    pub poll_interval_secs: f64,

    /// Successes a core must accrue before faults stop quarantining it.
    pub quarantine_threshold: u64,

    /// Wall-clock length of a timed run in seconds.
    pub duration_secs: f64,

    /// Run seed. A fresh seed is drawn per run when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Continue with the cores that started when some fail to spawn.
    pub allow_partial_spawn: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            core_count: 5,
            fault_probability: 0.3,
            delay_range_secs: [0.5, 1.5],
            poll_interval_secs: 1.0,
            quarantine_threshold: DEFAULT_QUARANTINE_THRESHOLD,
            duration_secs: 10.0,
            seed: None,
            allow_partial_spawn: false,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.core_count == 0 {
            return Err(ConfigError::CoreCount);
        }
        self.fault_model()?;
        self.poll_interval()?;
        self.duration()?;
        Ok(())
    }

    /// Worker sampling parameters.
    pub fn fault_model(&self) -> Result<FaultModel, ConfigError> {
        FaultModel::new(self.fault_probability, self.delay_range_secs)
    }

    pub fn poll_interval(&self) -> Result<Duration, ConfigError> {
        positive_secs(self.poll_interval_secs).ok_or(ConfigError::PollInterval(self.poll_interval_secs))
    }

    pub fn duration(&self) -> Result<Duration, ConfigError> {
        positive_secs(self.duration_secs).ok_or(ConfigError::Duration(self.duration_secs))
    }
}

fn positive_secs(secs: f64) -> Option<Duration> {
    if secs.is_nan() || secs <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `SimConfig::default()`.
pub fn load_config(path: &Path) -> Result<SimConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config missing, using defaults");
        let cfg = SimConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: SimConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    debug!(path = %path.display(), core_count = cfg.core_count, "config loaded");
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &SimConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

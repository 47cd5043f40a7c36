//! Policy configuration stored under `.stabilizer/config.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::io::build::RunOptions;

/// Stabilizer configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to the original policy constants,
/// which carry no stated derivation and are therefore kept configurable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StabilizerConfig {
    /// Verification failures tolerated per step before escalating.
    pub max_step_retries: u32,

    /// Missing/invalid plan rounds tolerated before stopping or accepting.
    pub max_planning_retries: u32,

    /// Full plan->execute->verify cycles before escalating and stopping.
    pub max_cycles: u32,

    /// Minimum fraction of the baseline the plan's summed impact must cover.
    pub coverage_threshold: f64,

    /// Line budget for each command's output block in combined reports.
    pub build_output_max_lines: usize,

    /// Wall-clock budget per build/test command in seconds.
    pub command_timeout_secs: u64,

    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            max_step_retries: 3,
            max_planning_retries: 3,
            max_cycles: 3,
            coverage_threshold: 0.7,
            build_output_max_lines: 200,
            command_timeout_secs: 15 * 60,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl StabilizerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_step_retries == 0 {
            return Err(anyhow!("max_step_retries must be > 0"));
        }
        if self.max_planning_retries == 0 {
            return Err(anyhow!("max_planning_retries must be > 0"));
        }
        if self.max_cycles == 0 {
            return Err(anyhow!("max_cycles must be > 0"));
        }
        if !(self.coverage_threshold > 0.0 && self.coverage_threshold <= 1.0) {
            return Err(anyhow!("coverage_threshold must be within (0, 1]"));
        }
        if self.build_output_max_lines == 0 {
            return Err(anyhow!("build_output_max_lines must be > 0"));
        }
        if self.command_timeout_secs == 0 {
            return Err(anyhow!("command_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        Ok(())
    }

    /// Execution knobs derived from this config.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            timeout: Duration::from_secs(self.command_timeout_secs),
            output_limit_bytes: self.output_limit_bytes,
            max_output_lines: self.build_output_max_lines,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `StabilizerConfig::default()`.
pub fn load_config(path: &Path) -> Result<StabilizerConfig> {
    if !path.exists() {
        let cfg = StabilizerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: StabilizerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &StabilizerConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

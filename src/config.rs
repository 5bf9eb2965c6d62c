// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde::Serialize;

use crate::jobs::JobLimits;
use crate::types::{MemUnits, Priority, TimeUnits};

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Memory units shared by all resident processes.
    pub memory_capacity: MemUnits,

    /// Maximum number of jobs accepted from one job source.
    pub max_jobs: usize,

    /// Maximum cumulative memory requirement of one job source.
    pub max_total_memory: MemUnits,

    /// How long idle activities block on their queue per iteration.
    pub poll_interval_ms: u64,

    pub round_robin: RoundRobinConfig,
    pub priority: PriorityConfig,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundRobinConfig {
    /// CPU units granted per dispatch.
    pub quantum: TimeUnits,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    /// Units of ready-state waiting that earn one priority boost.
    pub aging_interval: TimeUnits,

    /// Ceiling for priorities raised by aging.
    pub max_priority: Priority,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            memory_capacity: 2048,
            max_jobs: 30,
            max_total_memory: 2048,
            poll_interval_ms: 10,
            round_robin: RoundRobinConfig::default(),
            priority: PriorityConfig::default(),
        }
    }
}

impl Default for RoundRobinConfig {
    fn default() -> Self {
        Self {
            quantum: crate::sched::round_robin::DEFAULT_QUANTUM,
        }
    }
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            aging_interval: crate::sched::priority::DEFAULT_AGING_INTERVAL,
            max_priority: crate::task::MAX_PRIORITY,
        }
    }
}

// Maximum size for config file (1 MB)
const MAX_CONFIG_SIZE: u64 = 1024 * 1024;

impl Config {
    /// Load the configuration from `path`, or the defaults when none is
    /// given. The result is validated either way.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => parse_config_file(path)?,
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.memory_capacity == 0 {
            bail!("memory_capacity must be positive");
        }
        if self.max_jobs == 0 {
            bail!("max_jobs must be positive");
        }
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be positive");
        }
        if self.round_robin.quantum == 0 {
            bail!("round_robin.quantum must be positive");
        }
        if self.priority.aging_interval == 0 {
            bail!("priority.aging_interval must be positive");
        }
        if self.priority.max_priority == 0 {
            bail!("priority.max_priority must be positive");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn job_limits(&self) -> JobLimits {
        JobLimits {
            max_jobs: self.max_jobs,
            max_total_memory: self.max_total_memory,
            memory_capacity: self.memory_capacity,
        }
    }
}

pub fn parse_config_file(path: &Path) -> Result<Config> {
    let metadata = fs::metadata(path)
        .with_context(|| format!("Failed to read metadata for {}", path.display()))?;
    if metadata.len() > MAX_CONFIG_SIZE {
        bail!(
            "Config file {} is too large: {} bytes exceeds maximum of {}",
            path.display(),
            metadata.len(),
            MAX_CONFIG_SIZE
        );
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse_config_content(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

pub fn parse_config_content(content: &str) -> Result<Config> {
    if content.is_empty() {
        return Ok(Config::default());
    }
    toml::from_str(content).context("Failed to deserialize config")
}

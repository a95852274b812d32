//! Static launch configuration
//!
//! Known data centers, runner table and streaming daemon requirements.
//! Parsed once at start-up and shared read-only for the process lifetime.

use crate::error::AppError;
use crate::models::{HwReqs, WindowSystem};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Static configuration for one runner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConf {
    pub ver: String,
    pub window_system: WindowSystem,
    #[serde(flatten)]
    pub hw: HwReqs,
}

/// Immutable process-wide launch configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticConfig {
    /// Data centers ordered West to East
    pub known_dcs: Vec<String>,
    pub runners: HashMap<String, RunnerConf>,
    pub streamd_reqs: HwReqs,
}

impl StaticConfig {
    pub fn new(
        known_dcs: Vec<String>,
        runners: HashMap<String, RunnerConf>,
        streamd_reqs: HwReqs,
    ) -> Self {
        Self {
            known_dcs,
            runners,
            streamd_reqs,
        }
    }

    /// Parse the three JSON documents the service is deployed with
    pub fn from_json(data_centers: &str, runners_conf: &str, streamd_reqs: &str) -> Result<Self> {
        let known_dcs: Vec<String> =
            serde_json::from_str(data_centers).context("Invalid data centers list")?;
        let runners: HashMap<String, RunnerConf> =
            serde_json::from_str(runners_conf).context("Invalid runners configuration")?;
        let streamd_reqs: HwReqs =
            serde_json::from_str(streamd_reqs).context("Invalid streamd requirements")?;

        Ok(Self::new(known_dcs, runners, streamd_reqs))
    }

    /// Look up a runner's configuration.
    ///
    /// A release pointing at an unconfigured runner is a deployment defect,
    /// never defaulted.
    pub fn runner(&self, name: &str) -> Result<&RunnerConf, AppError> {
        self.runners
            .get(name)
            .ok_or_else(|| AppError::ConfigurationDefect {
                runner: name.to_string(),
            })
    }
}

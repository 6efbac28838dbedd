//! Configuration file support
//!
//! A TOML file; every key is optional:
//!
//! ```toml
//! root = "main.rep"
//!
//! [scheduler]
//! initial_easiness = 2.5
//! first_interval_minutes = 240
//!
//! [report]
//! max_lines = 100
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, IoContext, Result};
use crate::schedule::SchedulerParams;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    /// Lines printed by the learning schedule report
    pub max_lines: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { max_lines: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Repertoire directory
    pub root: PathBuf,

    pub scheduler: SchedulerParams,

    pub report: ReportOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("main.rep"),
            scheduler: SchedulerParams::default(),
            report: ReportOptions::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.scheduler.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).at(path)?;
        Self::from_toml(&text)
    }
}

// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model::{JobDefinition, RawJobFile, RawSchedulerConfig, SchedulerConfig};
use crate::config::validate::validate_job_structure;
use crate::errors::Result;

/// Read a scheduler configuration file without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawSchedulerConfig> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawSchedulerConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Load and validate a scheduler configuration file.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<SchedulerConfig> {
    let raw = load_from_path(&path)?;
    SchedulerConfig::try_from(raw)
}

/// Like [`load_and_validate`], but a missing file yields the defaults.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<SchedulerConfig> {
    let path = path.as_ref();
    if !path.exists() {
        info!(path = %path.display(), "no scheduler config found; using defaults");
        return Ok(SchedulerConfig::default());
    }
    load_and_validate(path)
}

/// Parse a job definition from TOML text and check its structure.
pub fn parse_job(contents: &str) -> Result<JobDefinition> {
    let raw: RawJobFile = toml::from_str(contents)?;
    let def = JobDefinition::from(raw);
    validate_job_structure(&def)?;
    Ok(def)
}

/// Load a job-definition file.
pub fn load_job(path: impl AsRef<Path>) -> Result<JobDefinition> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_job(&contents)
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("Scheduler.toml")
}

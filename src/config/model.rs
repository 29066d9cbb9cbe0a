// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::model::{DEFAULT_JOB_FACTOR, JobType, Priority, Script};

/// Scheduler configuration as read from a TOML file.
///
/// ```toml
/// [scheduler]
/// job_factor = 1000
/// restart_base_delay_ms = 1000
/// privileged_priorities = ["idle", "high", "highest"]
///
/// [store]
/// kind = "file"
/// path = ".gridsched/jobs"
///
/// [[user]]
/// name = "admin"
/// password = "secret"
/// admin = true
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSchedulerConfig {
    #[serde(default)]
    pub scheduler: SchedulerSection,

    #[serde(default)]
    pub store: StoreSection,

    /// Known users from `[[user]]` entries.
    #[serde(default)]
    pub user: Vec<UserEntry>,
}

/// Validated scheduler configuration.
///
/// Only constructible through `TryFrom<RawSchedulerConfig>` (see
/// `config::validate`) or [`SchedulerConfig::default`].
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub scheduler: SchedulerSection,
    pub store: StoreSection,
    pub user: Vec<UserEntry>,
}

impl SchedulerConfig {
    pub(crate) fn new_unchecked(
        scheduler: SchedulerSection,
        store: StoreSection,
        user: Vec<UserEntry>,
    ) -> Self {
        Self {
            scheduler,
            store,
            user,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new_unchecked(SchedulerSection::default(), StoreSection::default(), Vec::new())
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// Spacing between task-id ranges: `task = job * job_factor + seq`.
    #[serde(default = "default_job_factor")]
    pub job_factor: u64,

    /// Delay before the first retry of a task that ended in error.
    #[serde(default = "default_restart_base_delay_ms")]
    pub restart_base_delay_ms: u64,

    /// Upper bound of the retry delay.
    #[serde(default = "default_restart_max_delay_ms")]
    pub restart_max_delay_ms: u64,

    /// Priority tiers only privileged identities may use.
    #[serde(default = "default_privileged_priorities")]
    pub privileged_priorities: Vec<Priority>,

    /// Capacity of the core's event channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Start dispatching as soon as the process boots.
    #[serde(default = "default_start_on_boot")]
    pub start_on_boot: bool,
}

fn default_job_factor() -> u64 {
    DEFAULT_JOB_FACTOR
}

fn default_restart_base_delay_ms() -> u64 {
    1000
}

fn default_restart_max_delay_ms() -> u64 {
    60_000
}

fn default_privileged_priorities() -> Vec<Priority> {
    vec![Priority::Idle, Priority::High, Priority::Highest]
}

fn default_channel_capacity() -> usize {
    256
}

fn default_start_on_boot() -> bool {
    true
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            job_factor: default_job_factor(),
            restart_base_delay_ms: default_restart_base_delay_ms(),
            restart_max_delay_ms: default_restart_max_delay_ms(),
            privileged_priorities: default_privileged_priorities(),
            channel_capacity: default_channel_capacity(),
            start_on_boot: default_start_on_boot(),
        }
    }
}

/// Which job store backs the persistence hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    File,
}

/// `[store]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    #[serde(default)]
    pub kind: StoreKind,

    /// Directory for the file store (ignored by the memory store).
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".gridsched/jobs")
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            path: default_store_path(),
        }
    }
}

/// `[[user]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct UserEntry {
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub admin: bool,
}

/// Job-definition file as read from TOML.
///
/// ```toml
/// [job]
/// name = "render"
/// priority = "normal"
/// cancel_on_error = true
///
/// [task.A]
/// cmd = "echo A"
///
/// [task.B]
/// cmd = "echo B"
/// after = ["A"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawJobFile {
    #[serde(default)]
    pub job: JobSection,

    /// All tasks from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, TaskDefinition>,
}

/// `[job]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct JobSection {
    #[serde(default = "default_job_name")]
    pub name: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub cancel_on_error: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub project: String,
    #[serde(default, rename = "type")]
    pub job_type: JobType,
}

fn default_job_name() -> String {
    "unnamed".to_string()
}

impl Default for JobSection {
    fn default() -> Self {
        Self {
            name: default_job_name(),
            priority: Priority::default(),
            cancel_on_error: false,
            description: String::new(),
            project: String::new(),
            job_type: JobType::default(),
        }
    }
}

/// A job as submitted by a client, before admission.
///
/// This is plain data: it is validated again at admission time, whatever
/// transport produced it.
#[derive(Debug, Clone)]
pub struct JobDefinition {
    pub name: String,
    pub priority: Priority,
    pub cancel_on_error: bool,
    pub description: String,
    pub project: String,
    pub job_type: JobType,
    /// Tasks keyed by name. Task ids are assigned in key order.
    pub tasks: BTreeMap<String, TaskDefinition>,
}

impl JobDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        let section = JobSection::default();
        Self {
            name: name.into(),
            priority: section.priority,
            cancel_on_error: section.cancel_on_error,
            description: section.description,
            project: section.project,
            job_type: section.job_type,
            tasks: BTreeMap::new(),
        }
    }
}

impl From<RawJobFile> for JobDefinition {
    fn from(raw: RawJobFile) -> Self {
        Self {
            name: raw.job.name,
            priority: raw.job.priority,
            cancel_on_error: raw.job.cancel_on_error,
            description: raw.job.description,
            project: raw.job.project,
            job_type: raw.job.job_type,
            tasks: raw.task,
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskDefinition {
    /// Shell command run by the process backend.
    pub cmd: String,

    /// Ordered dependency list; parent results arrive in this order.
    #[serde(default)]
    pub after: Vec<String>,

    #[serde(default)]
    pub precious_result: bool,

    /// Attempts allowed when the task ends in error.
    #[serde(default = "default_max_executions")]
    pub max_executions: u32,

    /// Attempts allowed when the node running the task fails.
    #[serde(default = "default_max_executions_on_failure")]
    pub max_executions_on_failure: u32,

    #[serde(default)]
    pub selection_script: Option<Script>,
    #[serde(default)]
    pub pre_script: Option<Script>,
    #[serde(default)]
    pub post_script: Option<Script>,
    #[serde(default)]
    pub cleaning_script: Option<Script>,

    /// Makes this task choose between two follow-up tasks once it finishes.
    #[serde(default)]
    pub branch: Option<BranchDefinition>,
}

/// `[task.<name>.branch]` section.
///
/// ```toml
/// [task.check.branch]
/// script = { source = "test \"$GRIDSCHED_RESULT\" = ok" }
/// if = "deploy"
/// else = "report"
/// ```
///
/// The script runs after the task succeeded: exit 0 takes `if`, anything
/// else takes `else`. The task that is not taken is skipped, along with the
/// tasks that only depend on it.
#[derive(Debug, Clone, Deserialize)]
pub struct BranchDefinition {
    pub script: Script,
    #[serde(rename = "if")]
    pub if_target: String,
    #[serde(rename = "else")]
    pub else_target: String,
}

fn default_max_executions() -> u32 {
    1
}

fn default_max_executions_on_failure() -> u32 {
    2
}

impl TaskDefinition {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            after: Vec::new(),
            precious_result: false,
            max_executions: default_max_executions(),
            max_executions_on_failure: default_max_executions_on_failure(),
            selection_script: None,
            pre_script: None,
            post_script: None,
            cleaning_script: None,
            branch: None,
        }
    }
}

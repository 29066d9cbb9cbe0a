// src/model/result.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{JobId, TaskId};

/// Outcome of one task execution as kept in the job result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task: TaskId,
    pub task_name: String,
    pub value: Option<String>,
    pub error: Option<String>,
    #[serde(default)]
    pub logs: String,
}

impl TaskResult {
    pub fn success(task: TaskId, task_name: impl Into<String>, value: Option<String>, logs: String) -> Self {
        Self {
            task,
            task_name: task_name.into(),
            value,
            error: None,
            logs,
        }
    }

    pub fn failure(task: TaskId, task_name: impl Into<String>, error: impl Into<String>, logs: String) -> Self {
        Self {
            task,
            task_name: task_name.into(),
            value: None,
            error: Some(error.into()),
            logs,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Result payload handed to the job owner once the job is terminal.
///
/// Keyed by task name; the latest attempt of each task wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub job: Option<JobId>,
    pub results: BTreeMap<String, TaskResult>,
    /// Names of the tasks flagged as precious, in task-id order.
    pub precious: Vec<String>,
}

impl JobResult {
    pub fn new(job: JobId) -> Self {
        Self {
            job: Some(job),
            ..Self::default()
        }
    }

    pub fn record(&mut self, result: TaskResult) {
        self.results.insert(result.task_name.clone(), result);
    }

    pub fn get(&self, task_name: &str) -> Option<&TaskResult> {
        self.results.get(task_name)
    }

    /// Results of the precious tasks only.
    pub fn precious_results(&self) -> impl Iterator<Item = &TaskResult> {
        self.precious.iter().filter_map(|name| self.results.get(name))
    }

    pub fn has_errors(&self) -> bool {
        self.results.values().any(TaskResult::is_error)
    }
}

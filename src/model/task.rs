// src/model/task.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{TaskId, TaskStatus};

/// Opaque script hook: source text plus a language tag and ordered params.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default = "default_script_language")]
    pub language: String,
    pub source: String,
    #[serde(default)]
    pub params: Vec<String>,
}

fn default_script_language() -> String {
    "sh".to_string()
}

impl Script {
    pub fn shell(source: impl Into<String>) -> Self {
        Self {
            language: default_script_language(),
            source: source.into(),
            params: Vec::new(),
        }
    }
}

/// Optional hooks run around a task execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskScripts {
    /// Must succeed on the node before the task runs there.
    pub selection: Option<Script>,
    pub pre: Option<Script>,
    pub post: Option<Script>,
    /// Run on the node when its execution resource is released.
    pub cleaning: Option<Script>,
    /// Run after a successful execution to pick a [`Branch`].
    #[serde(default)]
    pub branch: Option<Script>,
}

/// Side taken by a branching task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    If,
    Else,
}

/// Follow-up tasks of a branching task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchTargets {
    pub if_target: TaskId,
    pub else_target: TaskId,
}

impl BranchTargets {
    /// The target that is *not* taken.
    pub fn other_than(&self, taken: Branch) -> TaskId {
        match taken {
            Branch::If => self.else_target,
            Branch::Else => self.if_target,
        }
    }
}

/// A single schedulable unit of work inside a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub status: TaskStatus,
    pub command: String,
    /// Ordered: parent results are handed over in this order.
    pub dependencies: Vec<TaskId>,
    pub precious_result: bool,
    pub max_executions: u32,
    pub executions_left: u32,
    pub max_executions_on_failure: u32,
    pub failure_executions_left: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub host: Option<String>,
    #[serde(default)]
    pub scripts: TaskScripts,
    #[serde(default)]
    pub branch: Option<BranchTargets>,
}

impl Task {
    /// Consume one attempt from the error budget and return what is left.
    pub fn consume_execution(&mut self) -> u32 {
        self.executions_left = self.executions_left.saturating_sub(1);
        self.executions_left
    }

    /// Consume one attempt from the node-failure budget and return what is left.
    pub fn consume_failure_execution(&mut self) -> u32 {
        self.failure_executions_left = self.failure_executions_left.saturating_sub(1);
        self.failure_executions_left
    }

    /// Number of error retries already spent.
    pub fn executions_used(&self) -> u32 {
        self.max_executions.saturating_sub(self.executions_left)
    }
}

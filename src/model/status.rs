// src/model/status.rs

//! Status enumerations for jobs, tasks and the scheduler itself.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    /// Started, nothing running right now, work still pending.
    Stalled,
    Paused,
    Finished,
    Canceled,
    Failed,
    Killed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Finished | JobStatus::Canceled | JobStatus::Failed | JobStatus::Killed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Stalled => "STALLED",
            JobStatus::Paused => "PAUSED",
            JobStatus::Finished => "FINISHED",
            JobStatus::Canceled => "CANCELED",
            JobStatus::Failed => "FAILED",
            JobStatus::Killed => "KILLED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Submitted,
    Pending,
    Paused,
    Running,
    WaitingOnError,
    WaitingOnFailure,
    Failed,
    NotStarted,
    NotRestarted,
    Aborted,
    Faulty,
    Finished,
    Skipped,
}

impl TaskStatus {
    /// Statuses that satisfy a dependency edge.
    pub fn is_done(self) -> bool {
        matches!(
            self,
            TaskStatus::Finished | TaskStatus::Faulty | TaskStatus::Skipped
        )
    }

    /// Statuses a task never leaves.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Finished
                | TaskStatus::Faulty
                | TaskStatus::Skipped
                | TaskStatus::Failed
                | TaskStatus::NotStarted
                | TaskStatus::NotRestarted
                | TaskStatus::Aborted
        )
    }

    pub fn is_waiting(self) -> bool {
        matches!(self, TaskStatus::WaitingOnError | TaskStatus::WaitingOnFailure)
    }

    /// Not started yet, may still be dispatched.
    pub fn is_pending_like(self) -> bool {
        matches!(self, TaskStatus::Submitted | TaskStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Submitted => "SUBMITTED",
            TaskStatus::Pending => "PENDING",
            TaskStatus::Paused => "PAUSED",
            TaskStatus::Running => "RUNNING",
            TaskStatus::WaitingOnError => "WAITING_ON_ERROR",
            TaskStatus::WaitingOnFailure => "WAITING_ON_FAILURE",
            TaskStatus::Failed => "FAILED",
            TaskStatus::NotStarted => "NOT_STARTED",
            TaskStatus::NotRestarted => "NOT_RESTARTED",
            TaskStatus::Aborted => "ABORTED",
            TaskStatus::Faulty => "FAULTY",
            TaskStatus::Finished => "FINISHED",
            TaskStatus::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduler-wide state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Started,
    Stopped,
    /// Only already-running jobs keep dispatching.
    Paused,
    /// Immediate pause: nothing is dispatched.
    Frozen,
    ShuttingDown,
    Killed,
}

impl SchedulerState {
    /// Whether new jobs may be admitted in this state.
    pub fn accepts_submissions(self) -> bool {
        !matches!(
            self,
            SchedulerState::ShuttingDown | SchedulerState::Stopped | SchedulerState::Killed
        )
    }

    /// Whether the scheduling pass may dispatch anything at all.
    pub fn dispatches(self) -> bool {
        matches!(
            self,
            SchedulerState::Started | SchedulerState::Paused | SchedulerState::ShuttingDown
        )
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SchedulerState::Started => "started",
            SchedulerState::Stopped => "stopped",
            SchedulerState::Paused => "paused",
            SchedulerState::Frozen => "frozen",
            SchedulerState::ShuttingDown => "shutting_down",
            SchedulerState::Killed => "killed",
        };
        f.write_str(s)
    }
}

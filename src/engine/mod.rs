// src/engine/mod.rs

//! Scheduling core of gridsched.
//!
//! This module ties together:
//! - the job registry and its lifecycle transitions
//! - the scheduling policy that orders eligible tasks
//! - the main runtime event loop that reacts to:
//!   - front-end requests (submit, pause, kill, control orders, ...)
//!   - task start / completion reports from the resource backend
//!   - delayed restarts
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`]. Front-end code talks to the core through a
//! [`CoreHandle`].

use std::fmt;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::config::SchedulerConfig;
use crate::errors::Result;
use crate::events::{JobSnapshot, SchedulerSnapshot};
use crate::model::{Branch, Job, JobComparator, JobId, JobResult, Priority, TaskId};

/// Opaque handle of an acquired execution resource, issued by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExecutionHandle(pub u64);

impl fmt::Display for ExecutionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exec-{}", self.0)
    }
}

/// How a task execution ended, as reported by the resource backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// `branch` is set when the task ran a branch script.
    Success {
        value: Option<String>,
        logs: String,
        branch: Option<Branch>,
    },
    /// The task itself failed (non-zero exit, failing hook, ...).
    Error { message: String, logs: String },
    /// The node died or the execution timed out.
    NodeFailure { reason: String },
}

/// Why a delayed wake-up was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeKind {
    /// Move a waiting task back to pending.
    Restart,
    /// Let a task whose acquisition failed be dispatched again.
    RetryAcquire,
}

/// Scheduler-wide control orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerControl {
    Start,
    Stop,
    Pause,
    /// Immediate pause: nothing is dispatched any more.
    Freeze,
    Resume,
    Shutdown,
    Kill,
}

/// Requests sent by the front-end; each carries its reply channel.
#[derive(Debug)]
pub enum CoreRequest {
    Submit {
        job: Box<Job>,
        reply: oneshot::Sender<Result<JobId>>,
    },
    PauseJob {
        job: JobId,
        reply: oneshot::Sender<bool>,
    },
    ResumeJob {
        job: JobId,
        reply: oneshot::Sender<bool>,
    },
    KillJob {
        job: JobId,
        reply: oneshot::Sender<bool>,
    },
    ChangePriority {
        job: JobId,
        priority: Priority,
        reply: oneshot::Sender<bool>,
    },
    RemoveJob {
        job: JobId,
        reply: oneshot::Sender<bool>,
    },
    TakeResult {
        job: JobId,
        reply: oneshot::Sender<Result<Option<JobResult>>>,
    },
    Control {
        control: SchedulerControl,
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<SchedulerSnapshot>,
    },
    ListJobs {
        comparator: JobComparator,
        reply: oneshot::Sender<Vec<JobSnapshot>>,
    },
}

/// Events flowing into the runtime from the front-end, backends and timers.
#[derive(Debug)]
pub enum RuntimeEvent {
    Request(CoreRequest),
    /// The backend acquired a resource and the task began executing.
    TaskStarted {
        job: JobId,
        task: TaskId,
        handle: ExecutionHandle,
        host: String,
    },
    /// The backend could not provide a resource for the task.
    AcquireFailed {
        job: JobId,
        task: TaskId,
        reason: String,
    },
    TaskCompleted {
        job: JobId,
        task: TaskId,
        outcome: TaskOutcome,
    },
    /// A delay requested by the core has elapsed.
    Wake {
        job: JobId,
        task: TaskId,
        kind: WakeKind,
    },
    /// Ctrl-C: graceful shutdown first, kill on repeat.
    ShutdownRequested,
}

/// Options used by the core.
#[derive(Debug, Clone, Copy)]
pub struct CoreOptions {
    pub restart_base_delay: Duration,
    pub restart_max_delay: Duration,
    /// Exit once every admitted job is terminal (used for `--once`).
    pub exit_when_idle: bool,
    /// Delay before retrying a failed acquisition.
    pub acquire_retry_delay: Duration,
}

impl CoreOptions {
    pub fn from_config(cfg: &SchedulerConfig, exit_when_idle: bool) -> Self {
        Self {
            restart_base_delay: Duration::from_millis(cfg.scheduler.restart_base_delay_ms),
            restart_max_delay: Duration::from_millis(cfg.scheduler.restart_max_delay_ms),
            exit_when_idle,
            acquire_retry_delay: Duration::from_millis(cfg.scheduler.restart_base_delay_ms),
        }
    }

    /// Delay before the `attempt`-th retry (1-based) of an errored task.
    ///
    /// The first retry waits the base delay, later ones add `attempt`
    /// seconds each, capped at the configured maximum.
    pub fn next_waiting_time(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return self.restart_base_delay.min(self.restart_max_delay);
        }
        let extra: u64 = (2..=u64::from(attempt)).map(|n| n * 1000).sum();
        let delay = self.restart_base_delay + Duration::from_millis(extra);
        delay.min(self.restart_max_delay)
    }
}

impl Default for CoreOptions {
    fn default() -> Self {
        Self::from_config(&SchedulerConfig::default(), false)
    }
}

pub mod core;
pub mod event_handlers;
pub mod handle;
pub mod policy;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep, TaskLaunch, TaskRelease};
pub use handle::CoreHandle;
pub use policy::{Candidate, Policy, PriorityPolicy};
pub use runtime::Runtime;

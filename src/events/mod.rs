// src/events/mod.rs

//! Lifecycle events and their fan-out.
//!
//! - [`SchedulerEvent`] is the tagged union of everything the core
//!   publishes, each variant carrying a snapshot payload.
//! - [`listener`] defines the listener interface and a channel-backed
//!   implementation.
//! - [`dispatcher`] broadcasts to registered listeners and prunes the ones
//!   that fail.

pub mod dispatcher;
pub mod listener;
pub mod snapshot;

pub use dispatcher::EventDispatcher;
pub use listener::{ChannelListener, SchedulerEventListener};
pub use snapshot::{JobSnapshot, SchedulerSnapshot, TaskEvent, TaskSnapshot};

use crate::model::JobId;

/// Scheduler-wide status changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerStatusEvent {
    Started,
    Stopped,
    Paused,
    Frozen,
    Resumed,
    ShuttingDown,
    ShutDown,
    Killed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    Scheduler(SchedulerStatusEvent),
    JobSubmitted(JobSnapshot),
    JobPendingToRunning(JobSnapshot),
    JobRunningToFinished(JobSnapshot),
    JobPaused(JobSnapshot),
    JobResumed(JobSnapshot),
    JobKilled(JobSnapshot),
    JobPriorityChanged(JobSnapshot),
    JobRemoved(JobSnapshot),
    TaskPendingToRunning(TaskEvent),
    TaskRunningToFinished(TaskEvent),
    TaskWaitingForRestart(TaskEvent),
    /// The task sat on the side of a branch that was not taken.
    TaskSkipped(TaskEvent),
}

impl SchedulerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SchedulerEvent::Scheduler(_) => "scheduler_state_changed",
            SchedulerEvent::JobSubmitted(_) => "job_submitted",
            SchedulerEvent::JobPendingToRunning(_) => "job_pending_to_running",
            SchedulerEvent::JobRunningToFinished(_) => "job_running_to_finished",
            SchedulerEvent::JobPaused(_) => "job_paused",
            SchedulerEvent::JobResumed(_) => "job_resumed",
            SchedulerEvent::JobKilled(_) => "job_killed",
            SchedulerEvent::JobPriorityChanged(_) => "job_priority_changed",
            SchedulerEvent::JobRemoved(_) => "job_removed",
            SchedulerEvent::TaskPendingToRunning(_) => "task_pending_to_running",
            SchedulerEvent::TaskRunningToFinished(_) => "task_running_to_finished",
            SchedulerEvent::TaskWaitingForRestart(_) => "task_waiting_for_restart",
            SchedulerEvent::TaskSkipped(_) => "task_skipped",
        }
    }

    pub fn job_id(&self) -> Option<JobId> {
        match self {
            SchedulerEvent::Scheduler(_) => None,
            SchedulerEvent::JobSubmitted(job)
            | SchedulerEvent::JobPendingToRunning(job)
            | SchedulerEvent::JobRunningToFinished(job)
            | SchedulerEvent::JobPaused(job)
            | SchedulerEvent::JobResumed(job)
            | SchedulerEvent::JobKilled(job)
            | SchedulerEvent::JobPriorityChanged(job)
            | SchedulerEvent::JobRemoved(job) => Some(job.id),
            SchedulerEvent::TaskPendingToRunning(ev)
            | SchedulerEvent::TaskRunningToFinished(ev)
            | SchedulerEvent::TaskWaitingForRestart(ev)
            | SchedulerEvent::TaskSkipped(ev) => Some(ev.task.job),
        }
    }
}

/// Receiver of everything the core publishes.
///
/// The runtime shell hands each event to its sink synchronously, in the
/// order the core produced them.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &SchedulerEvent);
}

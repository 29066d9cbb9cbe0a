// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;

use crate::engine::core::CoreRuntime;
use crate::engine::{CoreRequest, ExecutionHandle, RuntimeEvent, WakeKind};
use crate::events::SchedulerEvent;
use crate::model::{JobId, Script, TaskId, TaskResult, TaskScripts};

/// Everything a backend needs to run one task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskLaunch {
    pub job: JobId,
    pub task: TaskId,
    pub task_name: String,
    pub command: String,
    pub scripts: TaskScripts,
    /// Results of the task's dependencies, in dependency order.
    pub parent_results: Vec<TaskResult>,
}

/// Hand a resource back to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRelease {
    pub job: JobId,
    pub task: TaskId,
    pub handle: ExecutionHandle,
    pub cleaning: Option<Script>,
    /// Stop the execution if it is still running.
    pub abort: bool,
}

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Ask the backend for a resource and run the task on it.
    Acquire(TaskLaunch),
    /// Give a resource back, aborting its execution if requested.
    Release(TaskRelease),
    /// Feed a [`RuntimeEvent::Wake`] back after `delay`.
    Wake {
        job: JobId,
        task: TaskId,
        kind: WakeKind,
        delay: Duration,
    },
    /// Publish to the event sink (front-end bookkeeping and listeners).
    Emit(SchedulerEvent),
    /// Save the current state of a job.
    Persist(JobId),
    /// Drop a job from the store.
    Forget(JobId),
    /// Request that the process exits.
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

/// Route one runtime event to the matching core operation.
///
/// Commands accumulate inside the core; [`CoreRuntime::step`] collects them.
pub fn handle_event(core: &mut CoreRuntime, event: RuntimeEvent) {
    match event {
        RuntimeEvent::Request(request) => handle_request(core, request),
        RuntimeEvent::TaskStarted {
            job,
            task,
            handle,
            host,
        } => core.task_started(job, task, handle, host),
        RuntimeEvent::AcquireFailed { job, task, reason } => {
            core.acquire_failed(job, task, &reason)
        }
        RuntimeEvent::TaskCompleted { job, task, outcome } => {
            core.task_completed(job, task, outcome)
        }
        RuntimeEvent::Wake { job, task, kind } => core.wake(job, task, kind),
        RuntimeEvent::ShutdownRequested => core.shutdown_requested(),
    }
}

fn handle_request(core: &mut CoreRuntime, request: CoreRequest) {
    match request {
        CoreRequest::Submit { job, reply } => reply_to(reply, core.submit(*job)),
        CoreRequest::PauseJob { job, reply } => reply_to(reply, core.pause_job(job)),
        CoreRequest::ResumeJob { job, reply } => reply_to(reply, core.resume_job(job)),
        CoreRequest::KillJob { job, reply } => reply_to(reply, core.kill_job(job)),
        CoreRequest::ChangePriority {
            job,
            priority,
            reply,
        } => reply_to(reply, core.change_priority(job, priority)),
        CoreRequest::RemoveJob { job, reply } => reply_to(reply, core.remove_job(job)),
        CoreRequest::TakeResult { job, reply } => reply_to(reply, core.take_result(job)),
        CoreRequest::Control { control, reply } => reply_to(reply, core.control(control)),
        CoreRequest::Snapshot { reply } => reply_to(reply, core.snapshot()),
        CoreRequest::ListJobs { comparator, reply } => {
            reply_to(reply, core.list_jobs(&comparator))
        }
    }
}

fn reply_to<T>(reply: oneshot::Sender<T>, value: T) {
    if reply.send(value).is_err() {
        debug!("requester went away before the reply was sent");
    }
}

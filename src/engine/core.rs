// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! owns the authoritative job registry and consumes [`RuntimeEvent`]s,
//! producing:
//! - an updated registry and scheduler state
//! - a list of commands describing what the IO shell should do next
//!   (acquire/release resources, publish events, persist jobs, ...)
//!
//! Every mutation of a job happens here, one event at a time, which keeps
//! the transitions of a job serialized. The async shell
//! (`engine::runtime::Runtime`) only moves events in and commands out.
//!
//! The core is intended to be extensively tested without channels,
//! processes or timers.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::mem;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::engine::event_handlers::{
    handle_event, CoreCommand, CoreStep, TaskLaunch, TaskRelease,
};
use crate::engine::policy::{Candidate, Policy, PriorityPolicy};
use crate::engine::{
    CoreOptions, ExecutionHandle, RuntimeEvent, SchedulerControl, TaskOutcome, WakeKind,
};
use crate::errors::{Result, SchedulerError};
use crate::events::snapshot::sorted_snapshots;
use crate::events::{
    JobSnapshot, SchedulerEvent, SchedulerSnapshot, SchedulerStatusEvent, TaskEvent,
};
use crate::model::{
    Job, JobComparator, JobId, JobResult, JobStatus, Priority, SchedulerState, TaskEnd, TaskId,
    TaskResult, TaskStatus, WaitReason,
};

/// Pure core runtime state.
///
/// It has **no** channels and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    state: SchedulerState,
    jobs: BTreeMap<JobId, Job>,
    /// Tasks with an acquisition in flight.
    launching: HashSet<TaskId>,
    /// Tasks whose last acquisition failed, waiting for a retry wake-up.
    backoff: HashSet<TaskId>,
    handles: HashMap<TaskId, ExecutionHandle>,
    policy: Box<dyn Policy>,
    options: CoreOptions,
    commands: Vec<CoreCommand>,
    keep_running: bool,
    admitted: u64,
}

impl CoreRuntime {
    pub fn new(options: CoreOptions, policy: Box<dyn Policy>) -> Self {
        Self {
            state: SchedulerState::Stopped,
            jobs: BTreeMap::new(),
            launching: HashSet::new(),
            backoff: HashSet::new(),
            handles: HashMap::new(),
            policy,
            options,
            commands: Vec::new(),
            keep_running: true,
            admitted: 0,
        }
    }

    pub fn with_default_policy(options: CoreOptions) -> Self {
        Self::new(options, Box::new(PriorityPolicy))
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn options(&self) -> &CoreOptions {
        &self.options
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(&id)
    }

    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    /// No job left with work to do.
    pub fn is_idle(&self) -> bool {
        self.jobs.values().all(|j| j.status().is_terminal())
    }

    pub fn is_launching(&self, task: TaskId) -> bool {
        self.launching.contains(&task)
    }

    pub fn handle_of(&self, task: TaskId) -> Option<ExecutionHandle> {
        self.handles.get(&task).copied()
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        handle_event(self, event);
        self.finish_step()
    }

    /// Run the scheduling pass and hand over everything queued so far.
    ///
    /// [`step`](Self::step) calls this; tests driving the core through its
    /// direct methods call it themselves.
    pub fn finish_step(&mut self) -> CoreStep {
        self.schedule();
        self.check_shutdown_complete();
        self.check_idle_exit();
        CoreStep {
            commands: mem::take(&mut self.commands),
            keep_running: self.keep_running,
        }
    }

    // ---------------------------------------------------------------------
    // Scheduler-wide control
    // ---------------------------------------------------------------------

    /// Apply a control order. Returns false when the current state forbids it.
    pub fn control(&mut self, control: SchedulerControl) -> bool {
        use SchedulerState as S;

        let state = self.state;
        let (allowed, next, event) = match control {
            SchedulerControl::Start => (state == S::Stopped, S::Started, SchedulerStatusEvent::Started),
            SchedulerControl::Stop => (
                !matches!(state, S::Stopped | S::ShuttingDown | S::Killed),
                S::Stopped,
                SchedulerStatusEvent::Stopped,
            ),
            SchedulerControl::Pause => (
                matches!(state, S::Started | S::Frozen),
                S::Paused,
                SchedulerStatusEvent::Paused,
            ),
            SchedulerControl::Freeze => (
                matches!(state, S::Started | S::Paused),
                S::Frozen,
                SchedulerStatusEvent::Frozen,
            ),
            SchedulerControl::Resume => (
                matches!(state, S::Paused | S::Frozen),
                S::Started,
                SchedulerStatusEvent::Resumed,
            ),
            SchedulerControl::Shutdown => (
                !matches!(state, S::ShuttingDown | S::Killed),
                S::ShuttingDown,
                SchedulerStatusEvent::ShuttingDown,
            ),
            SchedulerControl::Kill => (state != S::Killed, S::Killed, SchedulerStatusEvent::Killed),
        };

        if !allowed {
            debug!(?control, %state, "control order refused in current state");
            return false;
        }

        self.state = next;
        info!(from = %state, to = %next, "scheduler state changed");
        self.emit(SchedulerEvent::Scheduler(event));

        match control {
            SchedulerControl::Shutdown => self.resume_paused_jobs(),
            SchedulerControl::Kill => self.kill_everything(),
            _ => {}
        }
        true
    }

    /// Ctrl-C: shut down gracefully, kill if already shutting down.
    pub fn shutdown_requested(&mut self) {
        if self.state == SchedulerState::ShuttingDown {
            warn!("shutdown requested again; killing the scheduler");
            self.control(SchedulerControl::Kill);
        } else if !self.control(SchedulerControl::Shutdown) {
            self.request_exit();
        }
    }

    fn resume_paused_jobs(&mut self) {
        let paused: Vec<JobId> = self
            .jobs
            .values()
            .filter(|j| j.status() == JobStatus::Paused)
            .map(|j| j.id)
            .collect();
        for id in paused {
            self.resume_job(id);
        }
    }

    fn kill_everything(&mut self) {
        let mut releases = Vec::new();
        for (task, handle) in self.handles.drain() {
            let job = self.jobs.values().find(|j| j.task(task).is_some());
            let (job_id, cleaning) = match job {
                Some(job) => (
                    job.id,
                    job.task(task).and_then(|t| t.scripts.cleaning.clone()),
                ),
                None => continue,
            };
            releases.push(TaskRelease {
                job: job_id,
                task,
                handle,
                cleaning,
                abort: true,
            });
        }
        for release in releases {
            self.commands.push(CoreCommand::Release(release));
        }

        self.jobs.clear();
        self.launching.clear();
        self.backoff.clear();
        self.request_exit();
    }

    fn check_shutdown_complete(&mut self) {
        if self.state != SchedulerState::ShuttingDown || !self.keep_running {
            return;
        }
        if self.is_idle() && self.launching.is_empty() && self.handles.is_empty() {
            info!("no job left to run; scheduler shut down");
            self.emit(SchedulerEvent::Scheduler(SchedulerStatusEvent::ShutDown));
            self.request_exit();
        }
    }

    fn check_idle_exit(&mut self) {
        if !self.options.exit_when_idle || !self.keep_running || self.admitted == 0 {
            return;
        }
        if self.is_idle() && self.launching.is_empty() && self.handles.is_empty() {
            info!("every job is terminal; exiting");
            self.request_exit();
        }
    }

    fn request_exit(&mut self) {
        if self.keep_running {
            self.keep_running = false;
            self.commands.push(CoreCommand::RequestExit);
        }
    }

    // ---------------------------------------------------------------------
    // Registry operations
    // ---------------------------------------------------------------------

    /// Register an admitted job.
    pub fn submit(&mut self, job: Job) -> Result<JobId> {
        if !self.state.accepts_submissions() {
            return Err(SchedulerError::Unavailable(format!(
                "scheduler is {}; submissions are refused",
                self.state
            )));
        }
        if self.jobs.contains_key(&job.id) {
            return Err(SchedulerError::Internal(format!(
                "job {} is already registered",
                job.id
            )));
        }

        let id = job.id;
        info!(
            job = %id,
            name = %job.name,
            owner = %job.owner,
            priority = %job.priority,
            tasks = job.counters().total,
            "job submitted"
        );
        self.emit(SchedulerEvent::JobSubmitted(JobSnapshot::from(&job)));
        self.jobs.insert(id, job);
        self.admitted += 1;
        self.persist(id);
        Ok(id)
    }

    /// Re-register jobs loaded from a store. Returns how many were accepted.
    pub fn recover(&mut self, jobs: Vec<Job>) -> usize {
        let mut recovered = 0;
        for mut job in jobs {
            if let Err(err) = job.recover() {
                warn!(job = %job.id, error = %err, "cannot recover job; skipping it");
                continue;
            }
            info!(job = %job.id, status = %job.status(), "job recovered");
            self.jobs.insert(job.id, job);
            self.admitted += 1;
            recovered += 1;
        }
        recovered
    }

    /// Refused while shutting down: a shutdown waits for every job to end.
    pub fn pause_job(&mut self, id: JobId) -> bool {
        if self.state == SchedulerState::ShuttingDown {
            debug!(job = %id, "job pause refused during shutdown");
            return false;
        }
        let Some(job) = self.jobs.get_mut(&id) else {
            return false;
        };
        if !job.set_paused() {
            return false;
        }
        info!(job = %id, "job paused");
        let snapshot = JobSnapshot::from(&*job);
        self.emit(SchedulerEvent::JobPaused(snapshot));
        self.persist(id);
        true
    }

    pub fn resume_job(&mut self, id: JobId) -> bool {
        let Some(job) = self.jobs.get_mut(&id) else {
            return false;
        };
        if !job.set_unpaused() {
            return false;
        }
        info!(job = %id, status = %job.status(), "job resumed");
        let snapshot = JobSnapshot::from(&*job);
        self.emit(SchedulerEvent::JobResumed(snapshot));
        self.persist(id);
        true
    }

    /// Kill a job, aborting its running tasks, and forget it.
    pub fn kill_job(&mut self, id: JobId) -> bool {
        let Some(job) = self.jobs.get_mut(&id) else {
            return false;
        };
        if job.status() == JobStatus::Killed {
            return false;
        }

        let aborted = job.kill();
        job.mark_removed();
        info!(job = %id, aborted = aborted.len(), "job killed");
        let snapshot = JobSnapshot::from(&*job);

        self.release_tasks(id, &aborted, true);
        self.emit(SchedulerEvent::JobKilled(snapshot));
        self.jobs.remove(&id);
        self.commands.push(CoreCommand::Forget(id));
        true
    }

    pub fn change_priority(&mut self, id: JobId, priority: Priority) -> bool {
        let Some(job) = self.jobs.get_mut(&id) else {
            return false;
        };
        if job.status().is_terminal() {
            return false;
        }
        job.set_priority(priority);
        info!(job = %id, %priority, "job priority changed");
        let snapshot = JobSnapshot::from(&*job);
        self.emit(SchedulerEvent::JobPriorityChanged(snapshot));
        self.persist(id);
        true
    }

    /// Hand out the result of a terminal job and drop it from the registry.
    ///
    /// `Ok(None)` while the job is still running.
    pub fn take_result(&mut self, id: JobId) -> Result<Option<JobResult>> {
        let Some(job) = self.jobs.get(&id) else {
            return Err(SchedulerError::NotFound(id));
        };
        if !job.status().is_terminal() {
            return Ok(None);
        }
        Ok(self.remove_terminal(id).map(|job| job.result().clone()))
    }

    /// Purge a terminal job without handing out its result.
    pub fn remove_job(&mut self, id: JobId) -> bool {
        match self.jobs.get(&id) {
            Some(job) if job.status().is_terminal() => self.remove_terminal(id).is_some(),
            _ => false,
        }
    }

    fn remove_terminal(&mut self, id: JobId) -> Option<Job> {
        let mut job = self.jobs.remove(&id)?;
        job.mark_removed();
        info!(job = %id, status = %job.status(), "job removed");
        self.emit(SchedulerEvent::JobRemoved(JobSnapshot::from(&job)));
        self.commands.push(CoreCommand::Forget(id));
        Some(job)
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            state: self.state,
            jobs: self.jobs.values().map(JobSnapshot::from).collect(),
        }
    }

    pub fn list_jobs(&self, comparator: &JobComparator) -> Vec<JobSnapshot> {
        sorted_snapshots(self.jobs.values(), comparator)
    }

    // ---------------------------------------------------------------------
    // Backend reports
    // ---------------------------------------------------------------------

    pub fn task_started(
        &mut self,
        job_id: JobId,
        task_id: TaskId,
        handle: ExecutionHandle,
        host: String,
    ) {
        self.launching.remove(&task_id);

        let Some(job) = self.jobs.get_mut(&job_id) else {
            debug!(job = %job_id, task = %task_id, "start report for a forgotten job; releasing");
            self.push_release(job_id, task_id, handle, true);
            return;
        };

        let task_status = job.task(task_id).map(|t| t.status);
        let startable = !job.status().is_terminal()
            && job.status() != JobStatus::Paused
            && matches!(task_status, Some(TaskStatus::Submitted | TaskStatus::Pending));
        if !startable {
            debug!(
                job = %job_id,
                task = %task_id,
                status = ?task_status,
                "task is no longer dispatchable; releasing its resource"
            );
            self.push_release(job_id, task_id, handle, true);
            return;
        }

        let first_start = job.status() == JobStatus::Pending;
        if first_start {
            job.start();
        }
        if let Err(err) = job.start_task(task_id, host.clone()) {
            self.push_release(job_id, task_id, handle, true);
            self.fail_job_internal(job_id, task_id, err);
            return;
        }

        info!(job = %job_id, task = %task_id, %host, %handle, "task running");
        self.handles.insert(task_id, handle);

        if first_start {
            emit(
                &mut self.commands,
                SchedulerEvent::JobPendingToRunning(JobSnapshot::from(&*job)),
            );
        }
        if let Some(ev) = TaskEvent::new(job, task_id) {
            emit(&mut self.commands, SchedulerEvent::TaskPendingToRunning(ev));
        }
        self.persist(job_id);
    }

    pub fn acquire_failed(&mut self, job_id: JobId, task_id: TaskId, reason: &str) {
        self.launching.remove(&task_id);
        warn!(job = %job_id, task = %task_id, %reason, "resource acquisition failed; will retry");
        self.backoff.insert(task_id);
        self.commands.push(CoreCommand::Wake {
            job: job_id,
            task: task_id,
            kind: WakeKind::RetryAcquire,
            delay: self.options.acquire_retry_delay,
        });
    }

    pub fn task_completed(&mut self, job_id: JobId, task_id: TaskId, outcome: TaskOutcome) {
        let Some(job) = self.jobs.get_mut(&job_id) else {
            debug!(job = %job_id, task = %task_id, "completion for a forgotten job; ignoring");
            return;
        };
        let Some(task) = job.task(task_id) else {
            warn!(job = %job_id, task = %task_id, "completion for an unknown task; ignoring");
            return;
        };
        if task.status != TaskStatus::Running {
            debug!(
                job = %job_id,
                task = %task_id,
                status = %task.status,
                "stale completion; ignoring"
            );
            return;
        }
        let task_name = task.name.clone();
        let cleaning = task.scripts.cleaning.clone();

        if let Some(handle) = self.handles.remove(&task_id) {
            self.commands.push(CoreCommand::Release(TaskRelease {
                job: job_id,
                task: task_id,
                handle,
                cleaning,
                abort: false,
            }));
        }

        match outcome {
            TaskOutcome::Success { value, logs, branch } => {
                job.record_result(TaskResult::success(task_id, task_name, value, logs));
                info!(job = %job_id, task = %task_id, ?branch, "task finished");
                let end = branch.map_or(TaskEnd::Finished, TaskEnd::Branched);
                self.finish_task(job_id, task_id, end);
            }
            TaskOutcome::Error { message, logs } => {
                job.record_result(TaskResult::failure(task_id, task_name, message.clone(), logs));
                let left = match job.consume_execution(task_id) {
                    Ok(left) => left,
                    Err(err) => return self.fail_job_internal(job_id, task_id, err),
                };

                if left > 0 {
                    let attempt = job.task(task_id).map(|t| t.executions_used()).unwrap_or(1);
                    if let Err(err) = job.wait_for_restart(task_id, WaitReason::Error) {
                        return self.fail_job_internal(job_id, task_id, err);
                    }
                    let delay = self.options.next_waiting_time(attempt);
                    warn!(
                        job = %job_id,
                        task = %task_id,
                        %message,
                        executions_left = left,
                        delay_ms = delay.as_millis() as u64,
                        "task failed; restarting after delay"
                    );
                    if let Some(ev) = TaskEvent::new(job, task_id) {
                        emit(&mut self.commands, SchedulerEvent::TaskWaitingForRestart(ev));
                    }
                    self.commands.push(CoreCommand::Wake {
                        job: job_id,
                        task: task_id,
                        kind: WakeKind::Restart,
                        delay,
                    });
                } else if job.cancel_on_error {
                    warn!(job = %job_id, task = %task_id, %message, "task failed; canceling job");
                    self.end_job(job_id, task_id, JobStatus::Canceled);
                } else {
                    warn!(job = %job_id, task = %task_id, %message, "task failed; marking it faulty");
                    self.finish_task(job_id, task_id, TaskEnd::Faulty);
                }
            }
            TaskOutcome::NodeFailure { reason } => {
                job.record_result(TaskResult::failure(task_id, task_name, reason.clone(), String::new()));
                let left = match job.consume_failure_execution(task_id) {
                    Ok(left) => left,
                    Err(err) => return self.fail_job_internal(job_id, task_id, err),
                };

                if left > 0 {
                    if let Err(err) = job.wait_for_restart(task_id, WaitReason::NodeFailure) {
                        return self.fail_job_internal(job_id, task_id, err);
                    }
                    warn!(
                        job = %job_id,
                        task = %task_id,
                        %reason,
                        executions_left = left,
                        "node failed; restarting task"
                    );
                    if let Some(ev) = TaskEvent::new(job, task_id) {
                        emit(&mut self.commands, SchedulerEvent::TaskWaitingForRestart(ev));
                    }
                    self.commands.push(CoreCommand::Wake {
                        job: job_id,
                        task: task_id,
                        kind: WakeKind::Restart,
                        delay: Duration::ZERO,
                    });
                } else {
                    error!(job = %job_id, task = %task_id, %reason, "node failed too often; failing job");
                    self.end_job(job_id, task_id, JobStatus::Failed);
                }
            }
        }

        self.persist(job_id);
    }

    /// A delay requested through [`CoreCommand::Wake`] has elapsed.
    pub fn wake(&mut self, job_id: JobId, task_id: TaskId, kind: WakeKind) {
        match kind {
            WakeKind::RetryAcquire => {
                self.backoff.remove(&task_id);
            }
            WakeKind::Restart => {
                let Some(job) = self.jobs.get_mut(&job_id) else {
                    return;
                };
                let waiting = job.task(task_id).is_some_and(|t| t.status.is_waiting());
                if !waiting {
                    debug!(job = %job_id, task = %task_id, "restart no longer needed");
                    return;
                }
                if let Err(err) = job.restart_task(task_id) {
                    return self.fail_job_internal(job_id, task_id, err);
                }
                debug!(job = %job_id, task = %task_id, "task restarted");
                self.persist(job_id);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn finish_task(&mut self, job_id: JobId, task_id: TaskId, end: TaskEnd) {
        let Some(job) = self.jobs.get_mut(&job_id) else {
            return;
        };
        let skipped = match job.terminate_task(task_id, end) {
            Ok(termination) => {
                debug!(
                    job = %job_id,
                    task = %task_id,
                    eligible = ?termination.eligible,
                    skipped = ?termination.skipped,
                    "dependents updated"
                );
                termination.skipped
            }
            Err(err) => return self.fail_job_internal(job_id, task_id, err),
        };

        if let Some(ev) = TaskEvent::new(job, task_id) {
            emit(&mut self.commands, SchedulerEvent::TaskRunningToFinished(ev));
        }
        for skipped_task in skipped {
            if let Some(ev) = TaskEvent::new(job, skipped_task) {
                emit(&mut self.commands, SchedulerEvent::TaskSkipped(ev));
            }
        }

        if job.is_complete() && !job.status().is_terminal() {
            job.terminate();
            info!(job = %job_id, "job finished");
            emit(
                &mut self.commands,
                SchedulerEvent::JobRunningToFinished(JobSnapshot::from(&*job)),
            );
        }
    }

    /// End a job early (FAILED or CANCELED) because of `cause`.
    fn end_job(&mut self, job_id: JobId, cause: TaskId, status: JobStatus) {
        let Some(job) = self.jobs.get_mut(&job_id) else {
            return;
        };
        if job.status().is_terminal() {
            return;
        }
        let aborted = match job.failed(cause, status) {
            Ok(aborted) => aborted,
            Err(err) => {
                error!(job = %job_id, error = %err, "cannot end job");
                return;
            }
        };
        info!(job = %job_id, %status, cause = %cause, aborted = aborted.len(), "job ended");
        let snapshot = JobSnapshot::from(&*job);

        self.release_tasks(job_id, &aborted, true);
        self.emit(SchedulerEvent::JobRunningToFinished(snapshot));
        self.persist(job_id);
    }

    /// An eligibility computation or transition failed: only this job pays.
    fn fail_job_internal(&mut self, job_id: JobId, task_id: TaskId, err: SchedulerError) {
        error!(job = %job_id, task = %task_id, error = %err, "internal error; failing job");
        self.end_job(job_id, task_id, JobStatus::Failed);
    }

    fn release_tasks(&mut self, job_id: JobId, tasks: &[TaskId], abort: bool) {
        for &task in tasks {
            self.launching.remove(&task);
            self.backoff.remove(&task);
            if let Some(handle) = self.handles.remove(&task) {
                self.push_release(job_id, task, handle, abort);
            }
        }
    }

    fn push_release(&mut self, job_id: JobId, task: TaskId, handle: ExecutionHandle, abort: bool) {
        let cleaning = self
            .jobs
            .get(&job_id)
            .and_then(|j| j.task(task))
            .and_then(|t| t.scripts.cleaning.clone());
        self.commands.push(CoreCommand::Release(TaskRelease {
            job: job_id,
            task,
            handle,
            cleaning,
            abort,
        }));
    }

    /// Turn eligible tasks into acquisition requests, in policy order.
    fn schedule(&mut self) {
        if !self.state.dispatches() {
            return;
        }

        let mut candidates = Vec::new();
        for job in self.jobs.values() {
            let status = job.status();
            if status.is_terminal() || status == JobStatus::Paused {
                continue;
            }
            if status == JobStatus::Pending && self.state == SchedulerState::Paused {
                continue;
            }
            for task in job.eligible_tasks() {
                if self.launching.contains(&task) || self.backoff.contains(&task) {
                    continue;
                }
                let pending = job.task(task).is_some_and(|t| t.status.is_pending_like());
                if pending {
                    candidates.push(Candidate {
                        job: job.id,
                        task,
                        priority: job.priority,
                    });
                }
            }
        }

        if candidates.is_empty() {
            return;
        }
        self.policy.order(&mut candidates);

        for candidate in candidates {
            let Some(job) = self.jobs.get(&candidate.job) else {
                continue;
            };
            let Some(task) = job.task(candidate.task) else {
                continue;
            };
            let launch = TaskLaunch {
                job: job.id,
                task: task.id,
                task_name: task.name.clone(),
                command: task.command.clone(),
                scripts: task.scripts.clone(),
                parent_results: job.parent_results(task.id),
            };
            debug!(job = %launch.job, task = %launch.task, name = %launch.task_name, "dispatching task");
            self.launching.insert(candidate.task);
            self.commands.push(CoreCommand::Acquire(launch));
        }
    }

    fn emit(&mut self, event: SchedulerEvent) {
        emit(&mut self.commands, event);
    }

    fn persist(&mut self, id: JobId) {
        if self.jobs.contains_key(&id) {
            self.commands.push(CoreCommand::Persist(id));
        }
    }
}

fn emit(commands: &mut Vec<CoreCommand>, event: SchedulerEvent) {
    debug!(event = event.name(), job = ?event.job_id(), "emitting event");
    commands.push(CoreCommand::Emit(event));
}

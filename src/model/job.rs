// src/model/job.rs

//! Job aggregate and its lifecycle state machine.
//!
//! Tasks live in a flat map keyed by `TaskId`; dependencies are stored as
//! ids. Every counter and status mutation goes through the methods below so
//! that `pending + running + finished == total` holds after each of them.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{JobDefinition, validate_job};
use crate::dag::{DependencyResolver, TaskGraph};
use crate::errors::{Result, SchedulerError};
use crate::model::{
    Branch, BranchTargets, JobId, JobResult, JobStatus, Priority, Task, TaskId, TaskResult,
    TaskScripts, TaskStatus,
};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum JobType {
    #[default]
    #[serde(rename = "taskflow")]
    TaskFlow,
    #[serde(rename = "parameter_sweeping")]
    ParameterSweeping,
}

impl JobType {
    pub fn as_str(self) -> &'static str {
        match self {
            JobType::TaskFlow => "taskflow",
            JobType::ParameterSweeping => "parameter_sweeping",
        }
    }
}

/// Per-job task counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounters {
    pub total: u32,
    pub pending: u32,
    pub running: u32,
    pub finished: u32,
}

impl TaskCounters {
    pub fn is_consistent(&self) -> bool {
        self.pending + self.running + self.finished == self.total
    }
}

/// How a running task ends without taking the job down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEnd {
    Finished,
    /// Errored with no budget left; still unblocks its dependents.
    Faulty,
    /// Finished and chose a side of its branch.
    Branched(Branch),
}

/// What the end of a task changed in the rest of the job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Termination {
    /// Tasks that became dispatchable.
    pub eligible: Vec<TaskId>,
    /// Tasks that will never run because their branch was not taken.
    pub skipped: Vec<TaskId>,
}

/// Why a task is parked until its restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitReason {
    Error,
    NodeFailure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    /// Username of the submitting identity.
    pub owner: String,
    pub priority: Priority,
    pub job_type: JobType,
    pub project: String,
    pub description: String,
    pub cancel_on_error: bool,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub removed_at: Option<DateTime<Utc>>,
    status: JobStatus,
    counters: TaskCounters,
    tasks: BTreeMap<TaskId, Task>,
    precious: Vec<TaskId>,
    result: JobResult,
    /// Rebuilt from task statuses by [`Job::recover`] after loading.
    #[serde(skip)]
    resolver: DependencyResolver,
}

impl Job {
    /// Admit a definition as job `id`.
    ///
    /// Task ids are assigned in task-name order, starting at sequence 1.
    pub fn from_definition(
        id: JobId,
        owner: impl Into<String>,
        def: &JobDefinition,
        job_factor: u64,
    ) -> Result<Self> {
        validate_job(def, job_factor)?;

        let ids: BTreeMap<&str, TaskId> = def
            .tasks
            .keys()
            .enumerate()
            .map(|(i, name)| (name.as_str(), TaskId::derive(id, i as u64 + 1, job_factor)))
            .collect();

        let mut tasks = BTreeMap::new();
        let mut precious = Vec::new();
        for (name, tdef) in def.tasks.iter() {
            let task_id = lookup_task_id(&ids, name)?;
            let dependencies = tdef
                .after
                .iter()
                .map(|dep| lookup_task_id(&ids, dep))
                .collect::<Result<Vec<_>>>()?;

            if tdef.precious_result {
                precious.push(task_id);
            }
            let branch = match tdef.branch.as_ref() {
                Some(b) => Some(BranchTargets {
                    if_target: lookup_task_id(&ids, &b.if_target)?,
                    else_target: lookup_task_id(&ids, &b.else_target)?,
                }),
                None => None,
            };

            tasks.insert(
                task_id,
                Task {
                    id: task_id,
                    name: name.clone(),
                    status: TaskStatus::Submitted,
                    command: tdef.cmd.clone(),
                    dependencies,
                    precious_result: tdef.precious_result,
                    max_executions: tdef.max_executions,
                    executions_left: tdef.max_executions,
                    max_executions_on_failure: tdef.max_executions_on_failure,
                    failure_executions_left: tdef.max_executions_on_failure,
                    started_at: None,
                    finished_at: None,
                    host: None,
                    scripts: TaskScripts {
                        selection: tdef.selection_script.clone(),
                        pre: tdef.pre_script.clone(),
                        post: tdef.post_script.clone(),
                        cleaning: tdef.cleaning_script.clone(),
                        branch: tdef.branch.as_ref().map(|b| b.script.clone()),
                    },
                    branch,
                },
            );
        }

        let total = tasks.len() as u32;
        let mut result = JobResult::new(id);
        result.precious = precious
            .iter()
            .filter_map(|t| tasks.get(t))
            .map(|t: &Task| t.name.clone())
            .collect();

        let resolver = DependencyResolver::new(build_graph(&tasks));

        Ok(Self {
            id,
            name: def.name.clone(),
            owner: owner.into(),
            priority: def.priority,
            job_type: def.job_type,
            project: def.project.clone(),
            description: def.description.clone(),
            cancel_on_error: def.cancel_on_error,
            submitted_at: Utc::now(),
            started_at: None,
            finished_at: None,
            removed_at: None,
            status: JobStatus::Pending,
            counters: TaskCounters {
                total,
                pending: total,
                running: 0,
                finished: 0,
            },
            tasks,
            precious,
            result,
            resolver,
        })
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn counters(&self) -> TaskCounters {
        self.counters
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn task_by_name(&self, name: &str) -> Option<&Task> {
        self.tasks.values().find(|t| t.name == name)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn status_map(&self) -> BTreeMap<TaskId, TaskStatus> {
        self.tasks.iter().map(|(id, t)| (*id, t.status)).collect()
    }

    /// Tasks the resolver currently considers dispatchable.
    pub fn eligible_tasks(&self) -> Vec<TaskId> {
        self.resolver.eligible().collect()
    }

    pub fn resolver(&self) -> &DependencyResolver {
        &self.resolver
    }

    pub fn precious_tasks(&self) -> &[TaskId] {
        &self.precious
    }

    pub fn result(&self) -> &JobResult {
        &self.result
    }

    pub fn is_complete(&self) -> bool {
        self.counters.finished == self.counters.total
    }

    /// Results of the parents of `task`, in dependency order.
    pub fn parent_results(&self, task: TaskId) -> Vec<TaskResult> {
        let Some(task) = self.tasks.get(&task) else {
            return Vec::new();
        };
        task.dependencies
            .iter()
            .filter_map(|dep| self.tasks.get(dep))
            .filter_map(|parent| self.result.get(&parent.name).cloned())
            .collect()
    }

    pub fn record_result(&mut self, result: TaskResult) {
        self.result.record(result);
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    /// PENDING -> RUNNING; every submitted task becomes pending.
    pub fn start(&mut self) {
        self.status = JobStatus::Running;
        self.started_at = Some(Utc::now());
        self.counters.pending = self.counters.total - self.counters.finished;
        self.counters.running = 0;
        for task in self.tasks.values_mut() {
            if task.status == TaskStatus::Submitted {
                task.status = TaskStatus::Pending;
            }
        }
        debug!(job = %self.id, "job started");
    }

    /// A dispatched task began executing on `host`.
    pub fn start_task(&mut self, id: TaskId, host: impl Into<String>) -> Result<()> {
        let task = self.tasks.get_mut(&id).ok_or_else(|| unknown_task(self.id, id))?;
        if task.status != TaskStatus::Pending {
            return Err(SchedulerError::Internal(format!(
                "task {id} cannot start from {}",
                task.status
            )));
        }
        if self.counters.pending == 0 {
            return Err(SchedulerError::Internal(format!(
                "job {} has no pending task left to start",
                self.id
            )));
        }
        self.resolver.start(id)?;

        task.status = TaskStatus::Running;
        task.started_at = Some(Utc::now());
        task.finished_at = None;
        task.host = Some(host.into());

        self.counters.pending -= 1;
        self.counters.running += 1;
        if self.status == JobStatus::Stalled {
            self.status = JobStatus::Running;
        }
        Ok(())
    }

    /// A running task ended.
    ///
    /// A branching task that ends FINISHED without a choice takes its IF
    /// side, and so does one that ends FAULTY. The other side is skipped
    /// together with every not-started task that only depends on skipped
    /// tasks or on the branching task itself.
    pub fn terminate_task(&mut self, id: TaskId, end: TaskEnd) -> Result<Termination> {
        let task = self.tasks.get_mut(&id).ok_or_else(|| unknown_task(self.id, id))?;
        if task.status != TaskStatus::Running {
            return Err(SchedulerError::Internal(format!(
                "task {id} cannot terminate from {}",
                task.status
            )));
        }
        let (status, taken) = match end {
            TaskEnd::Finished => (TaskStatus::Finished, Branch::If),
            TaskEnd::Faulty => (TaskStatus::Faulty, Branch::If),
            TaskEnd::Branched(side) => (TaskStatus::Finished, side),
        };
        task.status = status;
        task.finished_at = Some(Utc::now());
        let not_taken = task.branch.map(|targets| targets.other_than(taken));

        self.counters.running -= 1;
        self.counters.finished += 1;

        let skipped = match not_taken {
            Some(target) => self.skip_branch(id, target),
            None => Vec::new(),
        };

        if self.status == JobStatus::Running
            && self.counters.running == 0
            && self.counters.pending > 0
        {
            self.status = JobStatus::Stalled;
        }

        let statuses = self.status_map();
        let mut eligible = self.resolver.terminate(id, &statuses)?;
        for task in self.resolver.skip(&skipped, &statuses)? {
            if !eligible.contains(&task) {
                eligible.push(task);
            }
        }
        Ok(Termination { eligible, skipped })
    }

    /// Mark `target` and what hangs only off it SKIPPED; returns them in
    /// ascending id order.
    fn skip_branch(&mut self, from: TaskId, target: TaskId) -> Vec<TaskId> {
        let mut skipped = BTreeSet::new();
        let mut queue = vec![target];
        while let Some(candidate) = queue.pop() {
            if skipped.contains(&candidate) {
                continue;
            }
            let Some(task) = self.tasks.get(&candidate) else {
                continue;
            };
            if !task.status.is_pending_like() && task.status != TaskStatus::Paused {
                continue;
            }
            let cut_off = candidate == target
                || task
                    .dependencies
                    .iter()
                    .all(|dep| *dep == from || skipped.contains(dep));
            if !cut_off {
                continue;
            }
            skipped.insert(candidate);
            queue.extend(self.resolver.graph().dependents_of(candidate).iter().copied());
        }

        let now = Utc::now();
        for id in skipped.iter() {
            if let Some(task) = self.tasks.get_mut(id) {
                task.status = TaskStatus::Skipped;
                task.finished_at = Some(now);
            }
        }
        let count = skipped.len() as u32;
        self.counters.pending -= count;
        self.counters.finished += count;
        debug!(job = %self.id, task = %from, ?skipped, "branch not taken");
        skipped.into_iter().collect()
    }

    /// Park a running task until its restart. It stays counted as running.
    pub fn wait_for_restart(&mut self, id: TaskId, reason: WaitReason) -> Result<()> {
        let task = self.tasks.get_mut(&id).ok_or_else(|| unknown_task(self.id, id))?;
        if task.status != TaskStatus::Running {
            return Err(SchedulerError::Internal(format!(
                "task {id} cannot wait for restart from {}",
                task.status
            )));
        }
        task.status = match reason {
            WaitReason::Error => TaskStatus::WaitingOnError,
            WaitReason::NodeFailure => TaskStatus::WaitingOnFailure,
        };
        Ok(())
    }

    /// Put a running or waiting task back to PENDING (PAUSED if the job is).
    ///
    /// A task parked by [`set_paused`](Self::set_paused) is already back in
    /// the pending count and is refused here.
    pub fn restart_task(&mut self, id: TaskId) -> Result<()> {
        let paused = self.status == JobStatus::Paused;
        let task = self.tasks.get_mut(&id).ok_or_else(|| unknown_task(self.id, id))?;
        if task.status != TaskStatus::Running && !task.status.is_waiting() {
            return Err(SchedulerError::Internal(format!(
                "task {id} cannot restart from {}",
                task.status
            )));
        }
        task.status = if paused {
            TaskStatus::Paused
        } else {
            TaskStatus::Pending
        };

        self.counters.running -= 1;
        self.counters.pending += 1;
        self.resolver.restart(id, paused);
        if self.status == JobStatus::Running && self.counters.running == 0 {
            self.status = JobStatus::Stalled;
        }
        Ok(())
    }

    pub fn consume_execution(&mut self, id: TaskId) -> Result<u32> {
        let task = self.tasks.get_mut(&id).ok_or_else(|| unknown_task(self.id, id))?;
        Ok(task.consume_execution())
    }

    pub fn consume_failure_execution(&mut self, id: TaskId) -> Result<u32> {
        let task = self.tasks.get_mut(&id).ok_or_else(|| unknown_task(self.id, id))?;
        Ok(task.consume_failure_execution())
    }

    /// Fail the job because of `cause`.
    ///
    /// The causing task becomes FAILED (job FAILED) or FAULTY (job
    /// CANCELED). Running tasks are aborted, the rest never starts. Returns
    /// the tasks that were running so their resources can be released.
    pub fn failed(&mut self, cause: TaskId, status: JobStatus) -> Result<Vec<TaskId>> {
        if !matches!(status, JobStatus::Failed | JobStatus::Canceled) {
            return Err(SchedulerError::Internal(format!(
                "job {} cannot fail into {status}",
                self.id
            )));
        }
        if !self.tasks.contains_key(&cause) {
            return Err(unknown_task(self.id, cause));
        }
        Ok(self.abort_all(Some(cause), status))
    }

    /// Mark the job KILLED. Returns the tasks that were running.
    pub fn kill(&mut self) -> Vec<TaskId> {
        self.abort_all(None, JobStatus::Killed)
    }

    fn abort_all(&mut self, cause: Option<TaskId>, status: JobStatus) -> Vec<TaskId> {
        let now = Utc::now();
        let mut aborted = Vec::new();

        for task in self.tasks.values_mut() {
            if Some(task.id) == cause {
                task.status = if status == JobStatus::Failed {
                    TaskStatus::Failed
                } else {
                    TaskStatus::Faulty
                };
                task.finished_at = Some(now);
                continue;
            }
            match task.status {
                TaskStatus::Running => {
                    aborted.push(task.id);
                    task.status = TaskStatus::Aborted;
                    task.finished_at = Some(now);
                }
                TaskStatus::WaitingOnError | TaskStatus::WaitingOnFailure => {
                    task.status = TaskStatus::NotRestarted;
                    task.finished_at = Some(now);
                }
                s if s.is_terminal() => {}
                _ => task.status = TaskStatus::NotStarted,
            }
        }

        self.resolver.failed();
        self.counters.pending = 0;
        self.counters.running = 0;
        self.counters.finished = self.counters.total;
        self.status = status;
        self.finished_at = Some(now);
        debug!(job = %self.id, %status, aborted = aborted.len(), "job ended early");
        aborted
    }

    /// Pause the job. Returns false if it is already paused or terminal.
    ///
    /// Every task that is neither running nor done becomes PAUSED. Tasks
    /// waiting for a restart are restarted on the spot: they move from the
    /// running to the pending count, and their pending restart wake-up finds
    /// nothing left to do.
    pub fn set_paused(&mut self) -> bool {
        if self.status == JobStatus::Paused || self.status.is_terminal() {
            return false;
        }
        self.resolver.pause();
        for task in self.tasks.values_mut() {
            if task.status.is_waiting() {
                self.counters.running -= 1;
                self.counters.pending += 1;
                self.resolver.restart(task.id, true);
                task.status = TaskStatus::Paused;
            } else if task.status.is_pending_like() {
                task.status = TaskStatus::Paused;
            }
        }
        self.status = JobStatus::Paused;
        true
    }

    /// Resume the job. Returns false if it is not paused.
    ///
    /// The new status is derived from the counters; paused tasks follow.
    pub fn set_unpaused(&mut self) -> bool {
        if self.status != JobStatus::Paused {
            return false;
        }
        let (job_status, task_status) = if self.started_at.is_none() {
            (JobStatus::Pending, TaskStatus::Submitted)
        } else if self.counters.running == 0 {
            (JobStatus::Stalled, TaskStatus::Pending)
        } else {
            (JobStatus::Running, TaskStatus::Pending)
        };
        for task in self.tasks.values_mut() {
            if task.status == TaskStatus::Paused {
                task.status = task_status;
            }
        }
        self.resolver.unpause();
        self.status = job_status;
        true
    }

    /// All tasks finished.
    pub fn terminate(&mut self) {
        self.status = JobStatus::Finished;
        self.finished_at = Some(Utc::now());
        debug!(job = %self.id, "job finished");
    }

    pub fn mark_removed(&mut self) {
        self.removed_at = Some(Utc::now());
    }

    /// Bring a job loaded from a store back into a schedulable shape.
    ///
    /// Tasks caught mid-execution go back to PENDING (PAUSED for a paused
    /// job), counters are recomputed from the statuses and the resolver is
    /// rebuilt.
    pub fn recover(&mut self) -> Result<()> {
        self.resolver = DependencyResolver::new(build_graph(&self.tasks));
        if self.status.is_terminal() {
            self.resolver.failed();
            return Ok(());
        }

        let paused = self.status == JobStatus::Paused;
        for task in self.tasks.values_mut() {
            if task.status == TaskStatus::Running || task.status.is_waiting() {
                task.status = if paused {
                    TaskStatus::Paused
                } else {
                    TaskStatus::Pending
                };
                task.host = None;
                task.started_at = None;
            }
        }

        let finished = self
            .tasks
            .values()
            .filter(|t| t.status.is_terminal())
            .count() as u32;
        self.counters = TaskCounters {
            total: self.tasks.len() as u32,
            pending: self.tasks.len() as u32 - finished,
            running: 0,
            finished,
        };
        if self.status == JobStatus::Running {
            self.status = JobStatus::Stalled;
        }

        let statuses = self.status_map();
        self.resolver.update(&statuses)
    }
}

fn build_graph(tasks: &BTreeMap<TaskId, Task>) -> TaskGraph {
    TaskGraph::from_edges(
        tasks
            .values()
            .map(|t| (t.id, t.dependencies.iter().copied().collect::<Vec<_>>())),
    )
}

fn lookup_task_id(ids: &BTreeMap<&str, TaskId>, name: &str) -> Result<TaskId> {
    ids.get(name)
        .copied()
        .ok_or_else(|| SchedulerError::Validation(format!("unknown task '{name}'")))
}

fn unknown_task(job: JobId, task: TaskId) -> SchedulerError {
    SchedulerError::Internal(format!("job {job} has no task {task}"))
}

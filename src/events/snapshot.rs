// src/events/snapshot.rs

use chrono::{DateTime, Utc};

use crate::model::{
    Job, JobComparator, JobId, JobStatus, JobType, Priority, SchedulerState, Task, TaskCounters,
    TaskId, TaskStatus,
};

/// Point-in-time copy of a job, enough for an observer to rebuild its view.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub id: JobId,
    pub name: String,
    pub owner: String,
    pub priority: Priority,
    pub job_type: JobType,
    pub status: JobStatus,
    pub counters: TaskCounters,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub removed_at: Option<DateTime<Utc>>,
    pub tasks: Vec<TaskSnapshot>,
}

impl JobSnapshot {
    pub fn task(&self, name: &str) -> Option<&TaskSnapshot> {
        self.tasks.iter().find(|t| t.name == name)
    }
}

impl From<&Job> for JobSnapshot {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            name: job.name.clone(),
            owner: job.owner.clone(),
            priority: job.priority,
            job_type: job.job_type,
            status: job.status(),
            counters: job.counters(),
            submitted_at: job.submitted_at,
            started_at: job.started_at,
            finished_at: job.finished_at,
            removed_at: job.removed_at,
            tasks: job.tasks().map(|t| TaskSnapshot::new(job.id, t)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot {
    pub job: JobId,
    pub id: TaskId,
    pub name: String,
    pub status: TaskStatus,
    pub host: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub executions_left: u32,
    pub failure_executions_left: u32,
}

impl TaskSnapshot {
    pub fn new(job: JobId, task: &Task) -> Self {
        Self {
            job,
            id: task.id,
            name: task.name.clone(),
            status: task.status,
            host: task.host.clone(),
            started_at: task.started_at,
            finished_at: task.finished_at,
            executions_left: task.executions_left,
            failure_executions_left: task.failure_executions_left,
        }
    }
}

/// Payload of task events: the task plus its job's status and counters.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskEvent {
    pub task: TaskSnapshot,
    pub job_status: JobStatus,
    pub job_counters: TaskCounters,
}

impl TaskEvent {
    /// `None` if `task` is not part of `job`.
    pub fn new(job: &Job, task: TaskId) -> Option<Self> {
        let task = job.task(task)?;
        Some(Self {
            task: TaskSnapshot::new(job.id, task),
            job_status: job.status(),
            job_counters: job.counters(),
        })
    }
}

/// Initial state handed to a newly registered listener.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSnapshot {
    pub state: SchedulerState,
    pub jobs: Vec<JobSnapshot>,
}

/// Snapshots of `jobs`, sorted with `comparator`.
pub fn sorted_snapshots<'a>(
    jobs: impl IntoIterator<Item = &'a Job>,
    comparator: &JobComparator,
) -> Vec<JobSnapshot> {
    let mut jobs: Vec<&Job> = jobs.into_iter().collect();
    comparator.sort(&mut jobs);
    jobs.into_iter().map(JobSnapshot::from).collect()
}

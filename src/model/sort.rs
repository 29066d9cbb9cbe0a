// src/model/sort.rs

//! Explicit comparators for presenting jobs and tasks.
//!
//! Each caller builds its own comparator value; nothing is shared between
//! sorts. Ties always fall back to ascending id order.

use std::cmp::Ordering;

use crate::model::{Job, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobSortKey {
    #[default]
    Id,
    Name,
    Priority,
    Type,
    Owner,
    Status,
    Project,
    Description,
    SubmittedTime,
    StartTime,
    FinishedTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobComparator {
    pub key: JobSortKey,
    pub order: SortOrder,
}

impl JobComparator {
    pub fn new(key: JobSortKey, order: SortOrder) -> Self {
        Self { key, order }
    }

    pub fn compare(&self, a: &Job, b: &Job) -> Ordering {
        let primary = match self.key {
            JobSortKey::Id => Ordering::Equal,
            JobSortKey::Name => a.name.cmp(&b.name),
            JobSortKey::Priority => a.priority.cmp(&b.priority),
            JobSortKey::Type => a.job_type.cmp(&b.job_type),
            JobSortKey::Owner => a.owner.cmp(&b.owner),
            JobSortKey::Status => a.status().cmp(&b.status()),
            JobSortKey::Project => a.project.cmp(&b.project),
            JobSortKey::Description => a.description.cmp(&b.description),
            JobSortKey::SubmittedTime => a.submitted_at.cmp(&b.submitted_at),
            JobSortKey::StartTime => a.started_at.cmp(&b.started_at),
            JobSortKey::FinishedTime => a.finished_at.cmp(&b.finished_at),
        };
        match primary {
            Ordering::Equal if self.key == JobSortKey::Id => self.order.apply(a.id.cmp(&b.id)),
            Ordering::Equal => a.id.cmp(&b.id),
            other => self.order.apply(other),
        }
    }

    pub fn sort(&self, jobs: &mut [&Job]) {
        jobs.sort_by(|a, b| self.compare(a, b));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskSortKey {
    #[default]
    Id,
    Name,
    Status,
    StartTime,
    FinishedTime,
    ExecutionsLeft,
    FailureExecutionsLeft,
    HostName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskComparator {
    pub key: TaskSortKey,
    pub order: SortOrder,
}

impl TaskComparator {
    pub fn new(key: TaskSortKey, order: SortOrder) -> Self {
        Self { key, order }
    }

    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let primary = match self.key {
            TaskSortKey::Id => Ordering::Equal,
            TaskSortKey::Name => a.name.cmp(&b.name),
            TaskSortKey::Status => a.status.cmp(&b.status),
            TaskSortKey::StartTime => a.started_at.cmp(&b.started_at),
            TaskSortKey::FinishedTime => a.finished_at.cmp(&b.finished_at),
            TaskSortKey::ExecutionsLeft => a.executions_left.cmp(&b.executions_left),
            TaskSortKey::FailureExecutionsLeft => {
                a.failure_executions_left.cmp(&b.failure_executions_left)
            }
            TaskSortKey::HostName => a.host.cmp(&b.host),
        };
        match primary {
            Ordering::Equal if self.key == TaskSortKey::Id => self.order.apply(a.id.cmp(&b.id)),
            Ordering::Equal => a.id.cmp(&b.id),
            other => self.order.apply(other),
        }
    }

    pub fn sort(&self, tasks: &mut [&Task]) {
        tasks.sort_by(|a, b| self.compare(a, b));
    }
}

// src/engine/policy.rs

//! Ordering of eligible tasks within a scheduling pass.

use std::fmt;

use crate::model::{JobId, Priority, TaskId};

/// An eligible task offered to the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub job: JobId,
    pub task: TaskId,
    pub priority: Priority,
}

/// Decides in which order eligible tasks are dispatched.
pub trait Policy: Send + fmt::Debug {
    fn order(&self, candidates: &mut Vec<Candidate>);
}

/// Highest job priority first, then oldest job, then lowest task id.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityPolicy;

impl Policy for PriorityPolicy {
    fn order(&self, candidates: &mut Vec<Candidate>) {
        candidates.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.job.cmp(&b.job))
                .then(a.task.cmp(&b.task))
        });
    }
}

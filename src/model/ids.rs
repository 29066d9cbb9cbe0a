// src/model/ids.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default spacing between the task-id ranges of consecutive jobs.
///
/// Must stay larger than the biggest task count a job may carry.
pub const DEFAULT_JOB_FACTOR: u64 = 1000;

/// Identifier assigned to a job at admission. Never reused while tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a task, derived from its job: `job * factor + sequence`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Build the id of the `sequence`-th task (1-based) of `job`.
    pub fn derive(job: JobId, sequence: u64, factor: u64) -> Self {
        TaskId(job.0 * factor + sequence)
    }

    /// Recover the owning job from a derived id.
    pub fn job_id(self, factor: u64) -> JobId {
        JobId(self.0 / factor)
    }

    /// Per-job sequence number of this task.
    pub fn sequence(self, factor: u64) -> u64 {
        self.0 % factor
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic job id source used by the admission gate.
#[derive(Debug, Clone)]
pub struct JobIdAllocator {
    next: u64,
}

impl JobIdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> JobId {
        let id = JobId(self.next);
        self.next += 1;
        id
    }

    /// Make sure future ids are strictly greater than `id` (used on recovery).
    pub fn resume_after(&mut self, id: JobId) {
        if id.0 >= self.next {
            self.next = id.0 + 1;
        }
    }
}

impl Default for JobIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

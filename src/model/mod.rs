// src/model/mod.rs

//! Value types of the scheduler: identifiers, priorities, statuses, tasks,
//! jobs, results, and presentation comparators.

pub mod ids;
pub mod job;
pub mod priority;
pub mod result;
pub mod sort;
pub mod status;
pub mod task;

pub use ids::{DEFAULT_JOB_FACTOR, JobId, JobIdAllocator, TaskId};
pub use job::{Job, JobType, TaskCounters, TaskEnd, Termination, WaitReason};
pub use priority::{Priority, PrivilegedTiers};
pub use result::{JobResult, TaskResult};
pub use sort::{JobComparator, JobSortKey, SortOrder, TaskComparator, TaskSortKey};
pub use status::{JobStatus, SchedulerState, TaskStatus};
pub use task::{Branch, BranchTargets, Script, Task, TaskScripts};

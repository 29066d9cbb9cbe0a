// src/dag/resolver.rs

//! Dependency resolver of a single job.
//!
//! The resolver never changes task statuses itself. It is told about starts,
//! terminations and restarts by the owning [`Job`](crate::model::Job) and
//! answers one question: which tasks may be dispatched now.
//!
//! Sets kept per job:
//! - `eligible`: all dependencies done, not dispatched yet
//! - `running`: dispatched and not terminated
//! - `paused`: would be eligible, but the job is paused

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::dag::TaskGraph;
use crate::errors::{Result, SchedulerError};
use crate::model::{TaskId, TaskStatus};

#[derive(Debug, Clone, Default)]
pub struct DependencyResolver {
    graph: TaskGraph,
    eligible: BTreeSet<TaskId>,
    running: BTreeSet<TaskId>,
    paused: BTreeSet<TaskId>,
}

impl DependencyResolver {
    /// New resolver with every root task eligible.
    pub fn new(graph: TaskGraph) -> Self {
        let eligible = graph.roots().into_iter().collect();
        Self {
            graph,
            eligible,
            running: BTreeSet::new(),
            paused: BTreeSet::new(),
        }
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn eligible(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.eligible.iter().copied()
    }

    pub fn is_eligible(&self, task: TaskId) -> bool {
        self.eligible.contains(&task)
    }

    pub fn is_running(&self, task: TaskId) -> bool {
        self.running.contains(&task)
    }

    pub fn running(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.running.iter().copied()
    }

    /// Move a task from eligible to running.
    pub fn start(&mut self, task: TaskId) -> Result<()> {
        if !self.eligible.remove(&task) {
            return Err(SchedulerError::Internal(format!(
                "task {task} is not eligible for dispatch"
            )));
        }
        self.running.insert(task);
        Ok(())
    }

    /// Record the termination of `task` and return the dependents that became
    /// eligible because of it.
    ///
    /// `statuses` must be the full, already updated status map of the job.
    /// Dependents that are paused are remembered and become eligible on
    /// [`unpause`](Self::unpause).
    pub fn terminate(
        &mut self,
        task: TaskId,
        statuses: &BTreeMap<TaskId, TaskStatus>,
    ) -> Result<Vec<TaskId>> {
        if !self.graph.contains(task) {
            return Err(SchedulerError::Internal(format!(
                "task {task} is unknown to the dependency resolver"
            )));
        }
        self.running.remove(&task);

        let mut newly_eligible = Vec::new();
        self.release_dependents(task, statuses, &mut newly_eligible)?;

        debug!(task = %task, ?newly_eligible, "dependency resolver terminated task");
        Ok(newly_eligible)
    }

    /// Drop skipped tasks from every set and return the dependents that
    /// became eligible because of them.
    ///
    /// Skipped tasks count as done for their dependents, so a join after an
    /// IF/ELSE pair is released by whichever side actually ran.
    pub fn skip(
        &mut self,
        skipped: &[TaskId],
        statuses: &BTreeMap<TaskId, TaskStatus>,
    ) -> Result<Vec<TaskId>> {
        for task in skipped {
            if !self.graph.contains(*task) {
                return Err(SchedulerError::Internal(format!(
                    "task {task} is unknown to the dependency resolver"
                )));
            }
            self.eligible.remove(task);
            self.running.remove(task);
            self.paused.remove(task);
        }

        let mut newly_eligible = Vec::new();
        for &task in skipped {
            self.release_dependents(task, statuses, &mut newly_eligible)?;
        }
        debug!(?skipped, ?newly_eligible, "dependency resolver skipped tasks");
        Ok(newly_eligible)
    }

    fn release_dependents(
        &mut self,
        task: TaskId,
        statuses: &BTreeMap<TaskId, TaskStatus>,
        newly_eligible: &mut Vec<TaskId>,
    ) -> Result<()> {
        for &dependent in self.graph.dependents_of(task) {
            if !self.dependencies_done(dependent, statuses)? {
                continue;
            }
            match status_of(dependent, statuses)? {
                TaskStatus::Submitted | TaskStatus::Pending => {
                    if self.eligible.insert(dependent) {
                        newly_eligible.push(dependent);
                    }
                }
                TaskStatus::Paused => {
                    self.paused.insert(dependent);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Put a task back after a retry budget check.
    pub fn restart(&mut self, task: TaskId, job_paused: bool) {
        self.running.remove(&task);
        if job_paused {
            self.paused.insert(task);
        } else {
            self.eligible.insert(task);
        }
    }

    pub fn pause(&mut self) {
        self.paused.append(&mut self.eligible);
    }

    pub fn unpause(&mut self) {
        self.eligible.append(&mut self.paused);
    }

    /// Drop all eligibility state; nothing of this job is dispatched again.
    pub fn failed(&mut self) {
        self.eligible.clear();
        self.running.clear();
        self.paused.clear();
    }

    /// Rebuild every set from a status map (used on recovery).
    pub fn update(&mut self, statuses: &BTreeMap<TaskId, TaskStatus>) -> Result<()> {
        self.eligible.clear();
        self.running.clear();
        self.paused.clear();

        let tasks: Vec<TaskId> = self.graph.tasks().collect();
        for task in tasks {
            match status_of(task, statuses)? {
                TaskStatus::Running | TaskStatus::WaitingOnError | TaskStatus::WaitingOnFailure => {
                    self.running.insert(task);
                }
                TaskStatus::Submitted | TaskStatus::Pending => {
                    if self.dependencies_done(task, statuses)? {
                        self.eligible.insert(task);
                    }
                }
                TaskStatus::Paused => {
                    if self.dependencies_done(task, statuses)? {
                        self.paused.insert(task);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn dependencies_done(
        &self,
        task: TaskId,
        statuses: &BTreeMap<TaskId, TaskStatus>,
    ) -> Result<bool> {
        for &dep in self.graph.dependencies_of(task) {
            if !status_of(dep, statuses)?.is_done() {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn status_of(task: TaskId, statuses: &BTreeMap<TaskId, TaskStatus>) -> Result<TaskStatus> {
    statuses.get(&task).copied().ok_or_else(|| {
        SchedulerError::Internal(format!("status map has no entry for task {task}"))
    })
}

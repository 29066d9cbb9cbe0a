// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{JobDefinition, RawSchedulerConfig, SchedulerConfig};
use crate::errors::{Result, SchedulerError};

impl TryFrom<RawSchedulerConfig> for SchedulerConfig {
    type Error = SchedulerError;

    fn try_from(raw: RawSchedulerConfig) -> std::result::Result<Self, Self::Error> {
        validate_scheduler_config(&raw)?;
        Ok(SchedulerConfig::new_unchecked(raw.scheduler, raw.store, raw.user))
    }
}

fn validate_scheduler_config(cfg: &RawSchedulerConfig) -> Result<()> {
    let s = &cfg.scheduler;

    if s.job_factor < 2 {
        return Err(SchedulerError::Config(format!(
            "[scheduler].job_factor must be >= 2 (got {})",
            s.job_factor
        )));
    }

    if s.channel_capacity == 0 {
        return Err(SchedulerError::Config(
            "[scheduler].channel_capacity must be >= 1 (got 0)".to_string(),
        ));
    }

    if s.restart_max_delay_ms < s.restart_base_delay_ms {
        return Err(SchedulerError::Config(format!(
            "[scheduler].restart_max_delay_ms ({}) is smaller than restart_base_delay_ms ({})",
            s.restart_max_delay_ms, s.restart_base_delay_ms
        )));
    }

    let mut seen = std::collections::HashSet::new();
    for user in cfg.user.iter() {
        if user.name.trim().is_empty() {
            return Err(SchedulerError::Config(
                "[[user]] entries need a non-empty name".to_string(),
            ));
        }
        if !seen.insert(user.name.as_str()) {
            return Err(SchedulerError::Config(format!(
                "user '{}' is declared more than once",
                user.name
            )));
        }
    }

    Ok(())
}

/// Structural checks on a job definition: tasks present, dependencies known,
/// no self-dependency, no cycle, sane retry budgets, well-formed branches.
pub fn validate_job_structure(def: &JobDefinition) -> Result<()> {
    ensure_has_tasks(def)?;
    validate_task_budgets(def)?;
    validate_task_dependencies(def)?;
    validate_task_branches(def)?;
    validate_dag(def)?;
    Ok(())
}

/// Full admission check: structure plus the task-count bound imposed by the
/// job factor (task ids must not spill into the next job's range).
pub fn validate_job(def: &JobDefinition, job_factor: u64) -> Result<()> {
    validate_job_structure(def)?;

    let count = def.tasks.len() as u64;
    if count >= job_factor {
        return Err(SchedulerError::Validation(format!(
            "job '{}' has {} tasks; at most {} are allowed",
            def.name,
            count,
            job_factor - 1
        )));
    }
    Ok(())
}

fn ensure_has_tasks(def: &JobDefinition) -> Result<()> {
    if def.tasks.is_empty() {
        return Err(SchedulerError::Validation(format!(
            "job '{}' must contain at least one task",
            def.name
        )));
    }
    Ok(())
}

fn validate_task_budgets(def: &JobDefinition) -> Result<()> {
    for (name, task) in def.tasks.iter() {
        if task.max_executions == 0 || task.max_executions_on_failure == 0 {
            return Err(SchedulerError::Validation(format!(
                "task '{}' needs max_executions and max_executions_on_failure >= 1",
                name
            )));
        }
        if task.cmd.trim().is_empty() {
            return Err(SchedulerError::Validation(format!(
                "task '{}' has an empty command",
                name
            )));
        }
    }
    Ok(())
}

fn validate_task_dependencies(def: &JobDefinition) -> Result<()> {
    for (name, task) in def.tasks.iter() {
        for dep in task.after.iter() {
            if dep == name {
                return Err(SchedulerError::Validation(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
            if !def.tasks.contains_key(dep) {
                return Err(SchedulerError::Validation(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

/// Both targets of a branch must be distinct tasks that run after the
/// branching task.
fn validate_task_branches(def: &JobDefinition) -> Result<()> {
    for (name, task) in def.tasks.iter() {
        let Some(branch) = task.branch.as_ref() else {
            continue;
        };
        if branch.if_target == branch.else_target {
            return Err(SchedulerError::Validation(format!(
                "task '{}' branches to '{}' on both sides",
                name, branch.if_target
            )));
        }
        for target in [&branch.if_target, &branch.else_target] {
            let Some(target_def) = def.tasks.get(target) else {
                return Err(SchedulerError::Validation(format!(
                    "task '{}' branches to unknown task '{}'",
                    name, target
                )));
            };
            if !target_def.after.iter().any(|dep| dep == name) {
                return Err(SchedulerError::Validation(format!(
                    "branch target '{}' must list '{}' in `after`",
                    target, name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(def: &JobDefinition) -> Result<()> {
    // Edge direction: dep -> task. `B.after = ["A"]` adds A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in def.tasks.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in def.tasks.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(SchedulerError::DagCycle(format!(
            "cycle detected in job '{}' involving task '{}'",
            def.name,
            cycle.node_id()
        ))),
    }
}

// src/dag/graph.rs

use std::collections::BTreeMap;

use crate::model::TaskId;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct TaskNode {
    /// Direct dependencies, in declaration order.
    deps: Vec<TaskId>,
    /// Direct dependents: tasks that list this one as a dependency.
    dependents: Vec<TaskId>,
}

/// In-memory dependency graph of one job.
///
/// Acyclicity is checked when the job definition is validated, so this only
/// keeps adjacency information for eligibility computations.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    nodes: BTreeMap<TaskId, TaskNode>,
}

impl TaskGraph {
    /// Build a graph from `(task, dependencies)` pairs.
    ///
    /// Dependencies pointing to tasks that are not part of the iterator are
    /// kept as edges but get no node of their own.
    pub fn from_edges<I, D>(tasks: I) -> Self
    where
        I: IntoIterator<Item = (TaskId, D)>,
        D: IntoIterator<Item = TaskId>,
    {
        let mut nodes: BTreeMap<TaskId, TaskNode> = BTreeMap::new();

        for (id, deps) in tasks {
            nodes.entry(id).or_default().deps = deps.into_iter().collect();
        }

        let ids: Vec<TaskId> = nodes.keys().copied().collect();
        for id in ids {
            let deps = nodes.get(&id).map(|n| n.deps.clone()).unwrap_or_default();
            for dep in deps {
                if let Some(dep_node) = nodes.get_mut(&dep) {
                    dep_node.dependents.push(id);
                }
            }
        }

        Self { nodes }
    }

    pub fn tasks(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn dependencies_of(&self, id: TaskId) -> &[TaskId] {
        self.nodes
            .get(&id)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    pub fn dependents_of(&self, id: TaskId) -> &[TaskId] {
        self.nodes
            .get(&id)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Tasks without dependencies.
    pub fn roots(&self) -> Vec<TaskId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.deps.is_empty())
            .map(|(id, _)| *id)
            .collect()
    }
}

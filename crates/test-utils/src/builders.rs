#![allow(dead_code)]

use gridsched::config::{BranchDefinition, JobDefinition, TaskDefinition};
use gridsched::model::{DEFAULT_JOB_FACTOR, Job, JobId, JobType, Priority, Script};

/// Builder for `JobDefinition` to simplify test setup.
pub struct JobDefinitionBuilder {
    def: JobDefinition,
}

impl JobDefinitionBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            def: JobDefinition::new(name),
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.def.priority = priority;
        self
    }

    pub fn cancel_on_error(mut self, val: bool) -> Self {
        self.def.cancel_on_error = val;
        self
    }

    pub fn job_type(mut self, job_type: JobType) -> Self {
        self.def.job_type = job_type;
        self
    }

    pub fn project(mut self, project: &str) -> Self {
        self.def.project = project.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.def.description = description.to_string();
        self
    }

    pub fn with_task(mut self, name: &str, task: TaskDefinition) -> Self {
        self.def.tasks.insert(name.to_string(), task);
        self
    }

    pub fn build(self) -> JobDefinition {
        self.def
    }
}

/// Builder for `TaskDefinition`.
pub struct TaskDefinitionBuilder {
    task: TaskDefinition,
}

impl TaskDefinitionBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskDefinition::new(cmd),
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn precious(mut self) -> Self {
        self.task.precious_result = true;
        self
    }

    pub fn max_executions(mut self, n: u32) -> Self {
        self.task.max_executions = n;
        self
    }

    pub fn max_executions_on_failure(mut self, n: u32) -> Self {
        self.task.max_executions_on_failure = n;
        self
    }

    pub fn selection_script(mut self, source: &str) -> Self {
        self.task.selection_script = Some(Script::shell(source));
        self
    }

    pub fn pre_script(mut self, source: &str) -> Self {
        self.task.pre_script = Some(Script::shell(source));
        self
    }

    pub fn post_script(mut self, source: &str) -> Self {
        self.task.post_script = Some(Script::shell(source));
        self
    }

    pub fn cleaning_script(mut self, source: &str) -> Self {
        self.task.cleaning_script = Some(Script::shell(source));
        self
    }

    /// Branch to `if_target` when `source` exits 0, to `else_target` otherwise.
    pub fn branch(mut self, source: &str, if_target: &str, else_target: &str) -> Self {
        self.task.branch = Some(BranchDefinition {
            script: Script::shell(source),
            if_target: if_target.to_string(),
            else_target: else_target.to_string(),
        });
        self
    }

    pub fn build(self) -> TaskDefinition {
        self.task
    }
}

/// Shorthand for a task definition with dependencies.
pub fn task(cmd: &str, after: &[&str]) -> TaskDefinition {
    after
        .iter()
        .fold(TaskDefinitionBuilder::new(cmd), |b, dep| b.after(dep))
        .build()
}

/// Admit `def` as job `id`, owned by `tester`, with the default job factor.
pub fn build_job(def: &JobDefinition, id: u64) -> Job {
    build_job_for(def, id, "tester")
}

pub fn build_job_for(def: &JobDefinition, id: u64, owner: &str) -> Job {
    Job::from_definition(JobId(id), owner, def, DEFAULT_JOB_FACTOR)
        .expect("Failed to build valid job from definition")
}

/// The usual three-task job: A, then B and C both after A.
pub fn fan_out_definition() -> JobDefinition {
    JobDefinitionBuilder::new("fan-out")
        .with_task("A", task("echo A", &[]))
        .with_task("B", task("echo B", &["A"]))
        .with_task("C", task("echo C", &["A"]))
        .build()
}

/// `check` branches to `deploy` (if) or `report` (else). `notify` only
/// follows `report`; `done` joins both sides.
pub fn branch_definition() -> JobDefinition {
    JobDefinitionBuilder::new("branching")
        .with_task(
            "check",
            TaskDefinitionBuilder::new("echo check")
                .branch("true", "deploy", "report")
                .build(),
        )
        .with_task("deploy", task("echo deploy", &["check"]))
        .with_task("report", task("echo report", &["check"]))
        .with_task("notify", task("echo notify", &["report"]))
        .with_task("done", task("echo done", &["deploy", "report"]))
        .build()
}

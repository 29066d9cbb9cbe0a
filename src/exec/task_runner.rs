// src/exec/task_runner.rs

//! Individual task execution: selection script, pre script, command,
//! post script.

use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::engine::{ExecutionHandle, RuntimeEvent, TaskLaunch, TaskOutcome};
use crate::exec::script::ScriptEngine;
use crate::model::{Branch, JobId, TaskId, TaskResult};

/// Holds the task's own result while its branch script runs.
const RESULT_VAR: &str = "GRIDSCHED_RESULT";

/// One launch as seen by the runner.
pub struct TaskRun {
    pub launch: TaskLaunch,
    pub handle: ExecutionHandle,
    pub host: String,
    pub engine: Arc<dyn ScriptEngine>,
}

/// Environment exposed to the command and its scripts.
///
/// Parent results are passed as `GRIDSCHED_PARENT_<i>` in dependency order;
/// an errored parent contributes an empty value.
pub fn task_env(job: JobId, task: TaskId, parents: &[TaskResult]) -> Vec<(String, String)> {
    let mut env = vec![
        ("GRIDSCHED_JOB_ID".to_string(), job.to_string()),
        ("GRIDSCHED_TASK_ID".to_string(), task.to_string()),
    ];
    for (i, parent) in parents.iter().enumerate() {
        env.push((
            format!("GRIDSCHED_PARENT_{i}"),
            parent.value.clone().unwrap_or_default(),
        ));
    }
    env
}

/// Run a single launch and report back to the runtime.
///
/// - A failing selection script answers with `AcquireFailed`; nothing runs.
/// - If the cancel channel fires (abort release), the process is killed and
///   **no** `TaskCompleted` event is sent for that execution.
pub async fn run_task(
    run: TaskRun,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    let TaskRun {
        launch,
        handle,
        host,
        engine,
    } = run;
    let env = task_env(launch.job, launch.task, &launch.parent_results);

    if let Some(selection) = &launch.scripts.selection {
        let rejected = match engine.run(selection, &env).await {
            Ok(out) if out.success => None,
            Ok(out) => Some(format!("selection script rejected host {host}: {}", out.logs.trim())),
            Err(err) => Some(format!("selection script could not run: {err}")),
        };
        if let Some(reason) = rejected {
            debug!(job = %launch.job, task = %launch.task, %reason, "launch refused");
            let _ = runtime_tx
                .send(RuntimeEvent::AcquireFailed {
                    job: launch.job,
                    task: launch.task,
                    reason,
                })
                .await;
            return;
        }
    }

    if runtime_tx
        .send(RuntimeEvent::TaskStarted {
            job: launch.job,
            task: launch.task,
            handle,
            host: host.clone(),
        })
        .await
        .is_err()
    {
        debug!(task = %launch.task, "runtime gone before the task started");
        return;
    }

    // Dropping the execution future kills the child (kill_on_drop).
    let outcome = tokio::select! {
        outcome = execute(&launch, engine.as_ref(), &env) => outcome,
        Ok(()) = &mut cancel_rx => {
            info!(
                job = %launch.job,
                task = %launch.task,
                %handle,
                "execution aborted; process killed"
            );
            return;
        }
    };

    info!(
        job = %launch.job,
        task = %launch.task,
        %handle,
        outcome = outcome_name(&outcome),
        "task execution ended"
    );

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            job: launch.job,
            task: launch.task,
            outcome,
        })
        .await
        .is_err()
    {
        warn!(task = %launch.task, "runtime gone; completion lost");
    }
}

async fn execute(
    launch: &TaskLaunch,
    engine: &dyn ScriptEngine,
    env: &[(String, String)],
) -> TaskOutcome {
    let mut logs = String::new();

    if let Some(pre) = &launch.scripts.pre {
        match engine.run(pre, env).await {
            Ok(out) if out.success => logs.push_str(&out.logs),
            Ok(out) => {
                return TaskOutcome::Error {
                    message: "pre script failed".into(),
                    logs: out.logs,
                };
            }
            Err(err) => return TaskOutcome::NodeFailure { reason: err.to_string() },
        }
    }

    let outcome = run_command(launch, env, &mut logs).await;
    if !matches!(outcome, TaskOutcome::Success { .. }) {
        return outcome;
    }

    if let Some(post) = &launch.scripts.post {
        match engine.run(post, env).await {
            Ok(out) if out.success => logs.push_str(&out.logs),
            Ok(out) => {
                logs.push_str(&out.logs);
                return TaskOutcome::Error {
                    message: "post script failed".into(),
                    logs,
                };
            }
            Err(err) => return TaskOutcome::NodeFailure { reason: err.to_string() },
        }
    }

    let value = match outcome {
        TaskOutcome::Success { value, .. } => value,
        other => return other,
    };

    let mut branch = None;
    if let Some(script) = &launch.scripts.branch {
        let mut branch_env = env.to_vec();
        branch_env.push((RESULT_VAR.to_string(), value.clone().unwrap_or_default()));
        match engine.run(script, &branch_env).await {
            Ok(out) => {
                logs.push_str(&out.logs);
                branch = Some(if out.success { Branch::If } else { Branch::Else });
            }
            Err(err) => return TaskOutcome::NodeFailure { reason: err.to_string() },
        }
    }

    TaskOutcome::Success { value, logs, branch }
}

async fn run_command(
    launch: &TaskLaunch,
    env: &[(String, String)],
    logs: &mut String,
) -> TaskOutcome {
    debug!(
        job = %launch.job,
        task = %launch.task,
        cmd = %launch.command,
        "starting task process"
    );

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&launch.command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&launch.command);
        c
    };

    cmd.envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            return TaskOutcome::NodeFailure {
                reason: format!("spawning process for task '{}': {err}", launch.task_name),
            };
        }
    };

    let output = match child.wait_with_output().await {
        Ok(output) => output,
        Err(err) => {
            return TaskOutcome::NodeFailure {
                reason: format!("waiting for process of task '{}': {err}", launch.task_name),
            };
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    logs.push_str(&stderr);

    if output.status.success() {
        let value = stdout.trim_end();
        TaskOutcome::Success {
            value: (!value.is_empty()).then(|| value.to_string()),
            logs: String::new(),
            branch: None,
        }
    } else {
        let code = output.status.code().unwrap_or(-1);
        logs.push_str(&stdout);
        TaskOutcome::Error {
            message: format!("command exited with status {code}"),
            logs: std::mem::take(logs),
        }
    }
}

fn outcome_name(outcome: &TaskOutcome) -> &'static str {
    match outcome {
        TaskOutcome::Success { .. } => "success",
        TaskOutcome::Error { .. } => "error",
        TaskOutcome::NodeFailure { .. } => "node_failure",
    }
}

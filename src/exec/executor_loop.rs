// src/exec/executor_loop.rs

//! Main executor loop that manages running task processes.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::engine::{ExecutionHandle, RuntimeEvent, TaskLaunch, TaskRelease};
use crate::exec::script::ScriptEngine;
use crate::exec::task_runner::{run_task, task_env, TaskRun};
use crate::model::TaskId;

/// Work handed to the executor loop by [`ProcessBackend`].
///
/// [`ProcessBackend`]: super::ProcessBackend
#[derive(Debug)]
pub enum ExecutorRequest {
    Launch(TaskLaunch),
    Release(TaskRelease),
}

/// Internal handle for a currently-running task process.
///
/// - `cancel` is used to request that the process be stopped (abort release).
/// - `join` is the Tokio task that is actually running the command.
struct ActiveTask {
    handle: ExecutionHandle,
    cancel: Option<oneshot::Sender<()>>,
    join: tokio::task::JoinHandle<()>,
}

/// Spawn the background executor loop.
///
/// Each launch runs in its own Tokio task, and **per task id there will
/// never be more than one execution at the same time**: a second launch of
/// a task that is still running is answered with `AcquireFailed`.
pub fn spawn_executor(
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    engine: Arc<dyn ScriptEngine>,
) -> mpsc::Sender<ExecutorRequest> {
    let (tx, mut rx) = mpsc::channel::<ExecutorRequest>(32);

    tokio::spawn(async move {
        let host = local_host_name();
        info!(%host, "executor loop started");

        let mut active: HashMap<TaskId, ActiveTask> = HashMap::new();
        let mut next_handle: u64 = 1;

        while let Some(request) = rx.recv().await {
            match request {
                ExecutorRequest::Launch(launch) => {
                    active.retain(|_, a| !a.join.is_finished());
                    if active.contains_key(&launch.task) {
                        debug!(task = %launch.task, "task already executing; refusing launch");
                        let _ = runtime_tx
                            .send(RuntimeEvent::AcquireFailed {
                                job: launch.job,
                                task: launch.task,
                                reason: "task is already executing".into(),
                            })
                            .await;
                        continue;
                    }

                    let handle = ExecutionHandle(next_handle);
                    next_handle += 1;
                    let task = launch.task;
                    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
                    let run = TaskRun {
                        launch,
                        handle,
                        host: host.clone(),
                        engine: Arc::clone(&engine),
                    };
                    let rt_tx = runtime_tx.clone();
                    let join = tokio::spawn(async move {
                        run_task(run, rt_tx, cancel_rx).await;
                        debug!(%task, "task runner future finished");
                    });

                    active.insert(
                        task,
                        ActiveTask {
                            handle,
                            cancel: Some(cancel_tx),
                            join,
                        },
                    );
                }
                ExecutorRequest::Release(release) => {
                    handle_release(release, &mut active, &engine);
                }
            }
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}

fn handle_release(
    release: TaskRelease,
    active: &mut HashMap<TaskId, ActiveTask>,
    engine: &Arc<dyn ScriptEngine>,
) {
    let matches = active
        .get(&release.task)
        .is_some_and(|a| a.handle == release.handle);

    if matches {
        if let Some(mut existing) = active.remove(&release.task) {
            if release.abort {
                cancel_existing_task(&release, &mut existing);
            }
        }
    } else {
        debug!(
            task = %release.task,
            handle = %release.handle,
            "release for an execution that is no longer tracked"
        );
    }

    if let Some(script) = release.cleaning {
        let engine = Arc::clone(engine);
        let env = task_env(release.job, release.task, &[]);
        let task = release.task;
        tokio::spawn(async move {
            match engine.run(&script, &env).await {
                Ok(out) if out.success => debug!(%task, "cleaning script done"),
                Ok(out) => warn!(%task, logs = %out.logs, "cleaning script failed"),
                Err(err) => warn!(%task, error = %err, "cleaning script could not run"),
            }
        });
    }
}

/// Cancel an existing running task.
fn cancel_existing_task(release: &TaskRelease, existing: &mut ActiveTask) {
    info!(
        job = %release.job,
        task = %release.task,
        handle = %release.handle,
        "abort requested; cancelling running execution"
    );

    if let Some(cancel) = existing.cancel.take() {
        if cancel.send(()).is_err() {
            debug!(
                task = %release.task,
                "execution already finished while cancelling"
            );
        }
    }
}

/// Host name reported for every execution of this backend.
pub fn local_host_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string())
}

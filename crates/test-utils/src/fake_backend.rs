use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use gridsched::engine::{ExecutionHandle, RuntimeEvent, TaskLaunch, TaskOutcome, TaskRelease};
use gridsched::exec::{BackendFuture, ResourceBackend};
use gridsched::model::Branch;
use tokio::sync::mpsc;

/// What the fake does with the next launch of a task.
#[derive(Debug, Clone)]
pub enum FakeStep {
    /// Start, then complete with this outcome.
    Complete(TaskOutcome),
    /// Start and never complete (until released).
    Hold,
    /// Answer with `AcquireFailed`.
    Refuse(String),
}

#[derive(Debug, Default)]
struct FakeState {
    script: HashMap<String, VecDeque<FakeStep>>,
    launches: Vec<TaskLaunch>,
    releases: Vec<TaskRelease>,
    next_handle: u64,
}

/// A fake backend that:
/// - records every launch and release
/// - immediately reports `TaskStarted` on host `fake-node`
/// - then reports the scripted outcome for the task name, `Success` with
///   the task name as value when nothing is scripted.
///
/// Clones share the same state, so a test keeps one clone for inspection.
#[derive(Debug, Clone)]
pub struct FakeBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    state: Arc<Mutex<FakeState>>,
}

pub const FAKE_HOST: &str = "fake-node";

impl FakeBackend {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            runtime_tx,
            state: Arc::new(Mutex::new(FakeState {
                next_handle: 1,
                ..FakeState::default()
            })),
        }
    }

    /// Queue what the next launch of `task_name` does.
    pub fn script(&self, task_name: &str, step: FakeStep) {
        self.state
            .lock()
            .unwrap()
            .script
            .entry(task_name.to_string())
            .or_default()
            .push_back(step);
    }

    pub fn fail_with_error(&self, task_name: &str, message: &str) {
        self.script(
            task_name,
            FakeStep::Complete(TaskOutcome::Error {
                message: message.to_string(),
                logs: String::new(),
            }),
        );
    }

    /// Succeed and take `branch` at the next launch of `task_name`.
    pub fn choose_branch(&self, task_name: &str, branch: Branch) {
        self.script(
            task_name,
            FakeStep::Complete(TaskOutcome::Success {
                value: Some(task_name.to_string()),
                logs: String::new(),
                branch: Some(branch),
            }),
        );
    }

    pub fn fail_node(&self, task_name: &str) {
        self.script(
            task_name,
            FakeStep::Complete(TaskOutcome::NodeFailure {
                reason: "node lost".to_string(),
            }),
        );
    }

    pub fn launches(&self) -> Vec<TaskLaunch> {
        self.state.lock().unwrap().launches.clone()
    }

    /// Task names in launch order.
    pub fn launched_names(&self) -> Vec<String> {
        self.launches().into_iter().map(|l| l.task_name).collect()
    }

    pub fn releases(&self) -> Vec<TaskRelease> {
        self.state.lock().unwrap().releases.clone()
    }
}

impl ResourceBackend for FakeBackend {
    fn acquire(&mut self, launch: TaskLaunch) -> BackendFuture<'_> {
        let tx = self.runtime_tx.clone();
        let (step, handle) = {
            let mut st = self.state.lock().unwrap();
            let step = st
                .script
                .get_mut(&launch.task_name)
                .and_then(|q| q.pop_front())
                .unwrap_or_else(|| {
                    FakeStep::Complete(TaskOutcome::Success {
                        value: Some(launch.task_name.clone()),
                        logs: String::new(),
                        branch: None,
                    })
                });
            let handle = ExecutionHandle(st.next_handle);
            st.next_handle += 1;
            st.launches.push(launch.clone());
            (step, handle)
        };

        Box::pin(async move {
            // Sent from a separate task so the runtime loop never waits on
            // its own channel.
            tokio::spawn(async move {
                let (job, task) = (launch.job, launch.task);
                if let FakeStep::Refuse(reason) = step {
                    let _ = tx.send(RuntimeEvent::AcquireFailed { job, task, reason }).await;
                    return;
                }
                let _ = tx
                    .send(RuntimeEvent::TaskStarted {
                        job,
                        task,
                        handle,
                        host: FAKE_HOST.to_string(),
                    })
                    .await;
                if let FakeStep::Complete(outcome) = step {
                    let _ = tx.send(RuntimeEvent::TaskCompleted { job, task, outcome }).await;
                }
            });
            Ok(())
        })
    }

    fn release(&mut self, release: TaskRelease) -> BackendFuture<'_> {
        self.state.lock().unwrap().releases.push(release);
        Box::pin(async { Ok(()) })
    }
}

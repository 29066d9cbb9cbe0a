// src/exec/backend.rs

//! Pluggable resource backend abstraction.
//!
//! The runtime talks to a `ResourceBackend` instead of spawning processes
//! itself. This makes it easy to swap in a fake backend in tests while
//! keeping the production implementation in [`executor_loop`].
//!
//! - `ProcessBackend` is the default implementation used by `gridsched`.
//!   It wraps the executor loop and forwards launches and releases over an
//!   mpsc channel.
//! - Tests can provide their own `ResourceBackend` that, for example, records
//!   launches and directly emits `TaskStarted` / `TaskCompleted` events.
//!
//! [`executor_loop`]: super::executor_loop

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::engine::{RuntimeEvent, TaskLaunch, TaskRelease};
use crate::errors::{Result, SchedulerError};
use crate::exec::executor_loop::{spawn_executor, ExecutorRequest};
use crate::exec::script::ScriptEngine;

pub type BackendFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Trait abstracting where and how tasks run.
///
/// Both calls only hand work over; what happens next comes back to the
/// runtime as `RuntimeEvent`s (`TaskStarted`, `AcquireFailed`,
/// `TaskCompleted`).
pub trait ResourceBackend: Send {
    /// Find a resource for the task and start it there.
    fn acquire(&mut self, launch: TaskLaunch) -> BackendFuture<'_>;

    /// Give a resource back, stopping its execution when `abort` is set.
    fn release(&mut self, release: TaskRelease) -> BackendFuture<'_>;
}

/// Backend running every task as a local shell process.
pub struct ProcessBackend {
    tx: mpsc::Sender<ExecutorRequest>,
}

impl ProcessBackend {
    /// Create the backend, wiring it to the given runtime event sender.
    ///
    /// This spawns the background executor loop immediately.
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, engine: Arc<dyn ScriptEngine>) -> Self {
        let tx = spawn_executor(runtime_tx, engine);
        Self { tx }
    }

    fn forward(&self, request: ExecutorRequest) -> BackendFuture<'static> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();
        Box::pin(async move {
            tx.send(request)
                .await
                .map_err(|_| SchedulerError::Unavailable("process executor stopped".into()))
        })
    }
}

impl ResourceBackend for ProcessBackend {
    fn acquire(&mut self, launch: TaskLaunch) -> BackendFuture<'_> {
        self.forward(ExecutorRequest::Launch(launch))
    }

    fn release(&mut self, release: TaskRelease) -> BackendFuture<'_> {
        self.forward(ExecutorRequest::Release(release))
    }
}

// src/engine/runtime.rs

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::events::EventSink;
use crate::exec::ResourceBackend;
use crate::model::JobId;
use crate::store::JobStore;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent};

/// Drives the core in response to `RuntimeEvent`s, and delegates resource
/// handling to a `ResourceBackend`, event delivery to an `EventSink` and
/// persistence to a `JobStore`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// scheduling semantics.
pub struct Runtime<B: ResourceBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    /// Used to feed delayed wake-ups back into the loop.
    event_tx: mpsc::Sender<RuntimeEvent>,
    backend: B,
    sink: Arc<dyn EventSink>,
    store: Box<dyn JobStore>,
}

impl<B: ResourceBackend> fmt::Debug for Runtime<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<B: ResourceBackend> Runtime<B> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        event_tx: mpsc::Sender<RuntimeEvent>,
        backend: B,
        sink: Arc<dyn EventSink>,
        store: Box<dyn JobStore>,
    ) -> Self {
        Self {
            core,
            event_rx,
            event_tx,
            backend,
            sink,
            store,
        }
    }

    /// Main event loop.
    ///
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Feeds them into the core runtime.
    /// - Executes commands returned by the core (acquire, release, emit, ...).
    ///
    /// Returns the core so callers can inspect the final registry.
    pub async fn run(mut self) -> Result<CoreRuntime> {
        info!(state = %self.core.state(), "gridsched runtime started");

        // Work recovered before the loop started (or a start order given at
        // boot) must be dispatched without waiting for an external event.
        let step = self.core.finish_step();
        let mut keep_running = step.keep_running;
        self.execute_commands(step.commands).await?;

        while keep_running {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);
            self.execute_commands(step.commands).await?;

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                keep_running = false;
            }
        }

        info!("runtime exiting");
        Ok(self.core)
    }

    async fn execute_commands(&mut self, commands: Vec<CoreCommand>) -> Result<()> {
        let mut persisted: HashSet<JobId> = HashSet::new();
        for command in commands {
            if let CoreCommand::Persist(id) = command {
                if !persisted.insert(id) {
                    continue;
                }
            }
            self.execute_command(command).await?;
        }
        Ok(())
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::Acquire(launch) => {
                debug!(job = %launch.job, task = %launch.task, "acquiring resource");
                self.backend.acquire(launch).await?;
            }
            CoreCommand::Release(release) => {
                debug!(
                    job = %release.job,
                    task = %release.task,
                    handle = %release.handle,
                    abort = release.abort,
                    "releasing resource"
                );
                self.backend.release(release).await?;
            }
            CoreCommand::Wake {
                job,
                task,
                kind,
                delay,
            } => {
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    // The runtime may be gone by now; nothing left to wake.
                    let _ = tx.send(RuntimeEvent::Wake { job, task, kind }).await;
                });
            }
            CoreCommand::Emit(event) => {
                self.sink.publish(&event);
            }
            CoreCommand::Persist(id) => {
                if let Some(job) = self.core.job(id) {
                    if let Err(err) = self.store.save(job) {
                        warn!(job = %id, error = %err, "failed to persist job");
                    }
                }
            }
            CoreCommand::Forget(id) => {
                if let Err(err) = self.store.remove(id) {
                    warn!(job = %id, error = %err, "failed to drop job from store");
                }
            }
            CoreCommand::RequestExit => {
                info!("core issued RequestExit command");
            }
        }
        Ok(())
    }
}

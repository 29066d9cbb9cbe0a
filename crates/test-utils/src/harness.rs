use std::sync::Arc;

use gridsched::config::SchedulerConfig;
use gridsched::engine::{CoreHandle, CoreOptions, CoreRuntime, Runtime, RuntimeEvent, SchedulerControl};
use gridsched::errors::Result;
use gridsched::events::{ChannelListener, EventSink, SchedulerEvent};
use gridsched::frontend::{Frontend, SessionId, UserIdentification};
use gridsched::model::JobId;
use gridsched::store::MemoryStore;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::fake_backend::FakeBackend;
use crate::with_timeout;

/// A started scheduler wired to a [`FakeBackend`] and a [`MemoryStore`].
pub struct Harness {
    pub frontend: Arc<Frontend>,
    pub backend: FakeBackend,
    pub store: MemoryStore,
    pub tx: mpsc::Sender<RuntimeEvent>,
    pub runtime: JoinHandle<Result<CoreRuntime>>,
}

impl Harness {
    /// Must be called from within a tokio runtime.
    pub fn start(cfg: &SchedulerConfig, options: CoreOptions) -> Self {
        Self::start_with(cfg, options, Vec::new())
    }

    /// Like [`start`](Self::start), recovering `jobs` first.
    pub fn start_with(
        cfg: &SchedulerConfig,
        options: CoreOptions,
        jobs: Vec<gridsched::model::Job>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(cfg.scheduler.channel_capacity);
        let frontend = Arc::new(Frontend::new(CoreHandle::new(tx.clone()), cfg));
        frontend
            .adopt_recovered(&jobs)
            .expect("front-end state should be usable");

        let mut core = CoreRuntime::with_default_policy(options);
        core.recover(jobs);
        core.control(SchedulerControl::Start);

        let backend = FakeBackend::new(tx.clone());
        let store = MemoryStore::new();
        let sink: Arc<dyn EventSink> = frontend.clone();
        let runtime = Runtime::new(
            core,
            rx,
            tx.clone(),
            backend.clone(),
            sink,
            Box::new(store.clone()),
        );
        let runtime = tokio::spawn(runtime.run());

        Self {
            frontend,
            backend,
            store,
            tx,
            runtime,
        }
    }

    /// Open and connect a session.
    pub fn connect(&self, identity: UserIdentification) -> SessionId {
        let session = self.frontend.open_session();
        self.frontend
            .connect(session, identity)
            .expect("fresh session should connect");
        session
    }

    /// Connect an admin observer and return its event stream.
    pub async fn observe(&self) -> (SessionId, mpsc::UnboundedReceiver<SchedulerEvent>) {
        let session = self.connect(UserIdentification::admin("observer"));
        let (listener, rx) = ChannelListener::new();
        self.frontend
            .add_listener(session, Box::new(listener))
            .await
            .expect("observer should register");
        (session, rx)
    }

    pub fn handle(&self) -> CoreHandle {
        CoreHandle::new(self.tx.clone())
    }

    /// Wait for a runtime started with `exit_when_idle` to stop on its own.
    pub async fn finish(self) -> CoreRuntime {
        with_timeout(self.runtime)
            .await
            .expect("runtime task panicked")
            .expect("runtime failed")
    }

    /// Kill the scheduler (if still running) and hand back the final core.
    pub async fn stop(self) -> CoreRuntime {
        let _ = self.handle().control(SchedulerControl::Kill).await;
        with_timeout(self.runtime)
            .await
            .expect("runtime task panicked")
            .expect("runtime failed")
    }
}

/// Wait until an event matching `pred` arrives; returns it.
pub async fn wait_for<F>(rx: &mut mpsc::UnboundedReceiver<SchedulerEvent>, mut pred: F) -> SchedulerEvent
where
    F: FnMut(&SchedulerEvent) -> bool,
{
    with_timeout(async {
        loop {
            let event = rx.recv().await.expect("event stream closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
}

/// Wait until job `id` reaches a terminal status.
pub async fn wait_for_job_end(
    rx: &mut mpsc::UnboundedReceiver<SchedulerEvent>,
    id: JobId,
) -> SchedulerEvent {
    wait_for(rx, |event| {
        matches!(
            event,
            SchedulerEvent::JobRunningToFinished(job) | SchedulerEvent::JobKilled(job) if job.id == id
        )
    })
    .await
}

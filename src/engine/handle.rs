// src/engine/handle.rs

//! Cloneable request handle onto the running core.

use tokio::sync::{mpsc, oneshot};

use crate::engine::{CoreRequest, RuntimeEvent, SchedulerControl};
use crate::errors::{Result, SchedulerError};
use crate::events::{JobSnapshot, SchedulerSnapshot};
use crate::model::{Job, JobComparator, JobId, JobResult, Priority};

/// Sends [`CoreRequest`]s into the runtime event channel and awaits replies.
///
/// Requests are processed in arrival order, one at a time, so every job
/// mutation is serialized by the core.
#[derive(Debug, Clone)]
pub struct CoreHandle {
    tx: mpsc::Sender<RuntimeEvent>,
}

impl CoreHandle {
    pub fn new(tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self { tx }
    }

    pub fn sender(&self) -> mpsc::Sender<RuntimeEvent> {
        self.tx.clone()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> CoreRequest,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RuntimeEvent::Request(build(reply)))
            .await
            .map_err(|_| SchedulerError::Unavailable("scheduler core is not running".into()))?;
        rx.await
            .map_err(|_| SchedulerError::Unavailable("scheduler core dropped the request".into()))
    }

    pub async fn submit(&self, job: Job) -> Result<JobId> {
        let job = Box::new(job);
        self.request(|reply| CoreRequest::Submit { job, reply }).await?
    }

    pub async fn pause_job(&self, job: JobId) -> Result<bool> {
        self.request(|reply| CoreRequest::PauseJob { job, reply }).await
    }

    pub async fn resume_job(&self, job: JobId) -> Result<bool> {
        self.request(|reply| CoreRequest::ResumeJob { job, reply }).await
    }

    pub async fn kill_job(&self, job: JobId) -> Result<bool> {
        self.request(|reply| CoreRequest::KillJob { job, reply }).await
    }

    pub async fn change_priority(&self, job: JobId, priority: Priority) -> Result<bool> {
        self.request(|reply| CoreRequest::ChangePriority {
            job,
            priority,
            reply,
        })
        .await
    }

    pub async fn remove_job(&self, job: JobId) -> Result<bool> {
        self.request(|reply| CoreRequest::RemoveJob { job, reply }).await
    }

    pub async fn take_result(&self, job: JobId) -> Result<Option<JobResult>> {
        self.request(|reply| CoreRequest::TakeResult { job, reply }).await?
    }

    pub async fn control(&self, control: SchedulerControl) -> Result<bool> {
        self.request(|reply| CoreRequest::Control { control, reply }).await
    }

    pub async fn snapshot(&self) -> Result<SchedulerSnapshot> {
        self.request(|reply| CoreRequest::Snapshot { reply }).await
    }

    pub async fn list_jobs(&self, comparator: JobComparator) -> Result<Vec<JobSnapshot>> {
        self.request(|reply| CoreRequest::ListJobs { comparator, reply }).await
    }

    /// Ask the runtime to shut down; a second call kills it.
    pub async fn request_shutdown(&self) -> Result<()> {
        self.tx
            .send(RuntimeEvent::ShutdownRequested)
            .await
            .map_err(|_| SchedulerError::Unavailable("scheduler core is not running".into()))
    }
}

// src/store/memory.rs

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::errors::{Result, SchedulerError};
use crate::model::{Job, JobId};
use crate::store::JobStore;

/// In-memory store. Clones share the same contents, so a test can keep one
/// clone and inspect what the runtime persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    jobs: Arc<Mutex<BTreeMap<JobId, Job>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: JobId) -> Option<Job> {
        self.jobs.lock().ok()?.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().map(|jobs| jobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> SchedulerError {
    SchedulerError::Internal("memory store mutex poisoned".into())
}

impl JobStore for MemoryStore {
    fn save(&mut self, job: &Job) -> Result<()> {
        self.jobs
            .lock()
            .map_err(|_| poisoned())?
            .insert(job.id, job.clone());
        Ok(())
    }

    fn remove(&mut self, id: JobId) -> Result<()> {
        self.jobs.lock().map_err(|_| poisoned())?.remove(&id);
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<Job>> {
        Ok(self
            .jobs
            .lock()
            .map_err(|_| poisoned())?
            .values()
            .cloned()
            .collect())
    }
}

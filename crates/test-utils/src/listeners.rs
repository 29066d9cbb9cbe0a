use std::sync::{Arc, Mutex};

use gridsched::errors::{Result, SchedulerError};
use gridsched::events::{SchedulerEvent, SchedulerEventListener};

/// Records every event it receives. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    events: Arc<Mutex<Vec<SchedulerEvent>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SchedulerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.name()).collect()
    }

    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

impl SchedulerEventListener for RecordingListener {
    fn on_event(&mut self, event: &SchedulerEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// A listener whose observer is gone: every delivery fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingListener;

impl SchedulerEventListener for FailingListener {
    fn on_event(&mut self, _event: &SchedulerEvent) -> Result<()> {
        Err(SchedulerError::Unavailable("observer unreachable".into()))
    }
}

// src/frontend/stats.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::events::SchedulerStatusEvent;
use crate::model::JobType;

/// Observability counters kept by the gate. Never consulted for decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub submitted_by_type: BTreeMap<JobType, u64>,
    pub finished_jobs: u64,
    pub finished_tasks: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
}

impl SchedulerStats {
    pub fn submitted(&self) -> u64 {
        self.submitted_by_type.values().sum()
    }

    pub(crate) fn job_submitted(&mut self, job_type: JobType) {
        *self.submitted_by_type.entry(job_type).or_default() += 1;
    }

    pub(crate) fn job_withdrawn(&mut self, job_type: JobType) {
        if let Some(count) = self.submitted_by_type.get_mut(&job_type) {
            *count = count.saturating_sub(1);
        }
    }

    pub(crate) fn scheduler_changed(&mut self, event: SchedulerStatusEvent) {
        let now = Utc::now();
        match event {
            SchedulerStatusEvent::Started | SchedulerStatusEvent::Resumed => {
                self.started_at = Some(now);
                self.paused_at = None;
            }
            SchedulerStatusEvent::Paused | SchedulerStatusEvent::Frozen => {
                self.paused_at = Some(now);
            }
            SchedulerStatusEvent::Stopped
            | SchedulerStatusEvent::ShutDown
            | SchedulerStatusEvent::Killed => {
                self.stopped_at = Some(now);
            }
            SchedulerStatusEvent::ShuttingDown => {}
        }
    }
}

// src/frontend/gate.rs

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::config::{validate_job, JobDefinition, SchedulerConfig};
use crate::engine::{CoreHandle, SchedulerControl};
use crate::errors::{Result, SchedulerError};
use crate::events::{
    EventDispatcher, EventSink, JobSnapshot, SchedulerEvent, SchedulerEventListener,
    SchedulerSnapshot, SchedulerStatusEvent,
};
use crate::frontend::{
    Authenticator, ConfiguredUsers, Credentials, IdentifyJob, SchedulerStats, SessionId,
    UserIdentification,
};
use crate::model::{
    Job, JobComparator, JobId, JobIdAllocator, JobResult, Priority, PrivilegedTiers,
};

#[derive(Debug, Default)]
struct GateState {
    identities: HashMap<SessionId, UserIdentification>,
    jobs: HashMap<JobId, IdentifyJob>,
    dispatcher: EventDispatcher,
    stats: SchedulerStats,
    ids: JobIdAllocator,
}

/// Admission gate in front of the scheduling core.
///
/// Every caller-facing operation goes through here: identity checks,
/// priority policy, id assignment and ownership. Accepted work is forwarded
/// to the core through a [`CoreHandle`].
///
/// The gate is also the [`EventSink`] of the runtime: events update its
/// bookkeeping and are then broadcast to registered listeners. Listeners run
/// while the gate state is locked and must not call back into the gate.
#[derive(Debug)]
pub struct Frontend {
    core: CoreHandle,
    tiers: PrivilegedTiers,
    authenticator: Box<dyn Authenticator>,
    job_factor: u64,
    next_session: AtomicU64,
    state: Mutex<GateState>,
}

impl Frontend {
    pub fn new(core: CoreHandle, cfg: &SchedulerConfig) -> Self {
        Self::with_authenticator(core, cfg, Box::new(ConfiguredUsers::from_config(cfg)))
    }

    pub fn with_authenticator(
        core: CoreHandle,
        cfg: &SchedulerConfig,
        authenticator: Box<dyn Authenticator>,
    ) -> Self {
        Self {
            core,
            tiers: PrivilegedTiers::new(cfg.scheduler.privileged_priorities.iter().copied()),
            authenticator,
            job_factor: cfg.scheduler.job_factor,
            next_session: AtomicU64::new(1),
            state: Mutex::new(GateState::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, GateState>> {
        self.state
            .lock()
            .map_err(|_| SchedulerError::Internal("front-end state mutex poisoned".into()))
    }

    /// Fresh session handle for a new caller.
    pub fn open_session(&self) -> SessionId {
        SessionId(self.next_session.fetch_add(1, Ordering::Relaxed))
    }

    // ---------------------------------------------------------------------
    // Identities
    // ---------------------------------------------------------------------

    pub fn connect(&self, session: SessionId, identity: UserIdentification) -> Result<()> {
        let mut st = self.lock()?;
        if st.identities.contains_key(&session) {
            return Err(SchedulerError::AlreadyConnected);
        }
        info!(%session, user = %identity.username, admin = identity.admin, "caller connected");
        st.identities.insert(session, identity);
        Ok(())
    }

    pub fn connect_with_credentials(
        &self,
        session: SessionId,
        credentials: &Credentials,
    ) -> Result<UserIdentification> {
        let identity = self.authenticator.authenticate(credentials)?;
        self.connect(session, identity.clone())?;
        Ok(identity)
    }

    /// Drop the caller's identity and listener. Fails when not connected.
    pub fn disconnect(&self, session: SessionId) -> Result<()> {
        let mut st = self.lock()?;
        let identity = st
            .identities
            .remove(&session)
            .ok_or(SchedulerError::AccessDenied)?;
        st.dispatcher.remove(session);
        info!(%session, user = %identity.username, "caller disconnected");
        Ok(())
    }

    pub fn is_connected(&self, session: SessionId) -> bool {
        self.lock()
            .map(|st| st.identities.contains_key(&session))
            .unwrap_or(false)
    }

    pub fn identity(&self, session: SessionId) -> Result<UserIdentification> {
        self.lock()?
            .identities
            .get(&session)
            .cloned()
            .ok_or(SchedulerError::AccessDenied)
    }

    /// Identity of `session`, provided it may act on `job`.
    fn authorize(&self, session: SessionId, job: JobId) -> Result<UserIdentification> {
        let st = self.lock()?;
        let identity = st
            .identities
            .get(&session)
            .ok_or(SchedulerError::AccessDenied)?;
        let record = st.jobs.get(&job).ok_or(SchedulerError::NotFound(job))?;
        if !record.has_right(identity) {
            warn!(%session, user = %identity.username, %job, owner = %record.owner, "ownership check failed");
            return Err(SchedulerError::PermissionDenied(format!(
                "user '{}' does not own job {}",
                identity.username, job
            )));
        }
        Ok(identity.clone())
    }

    // ---------------------------------------------------------------------
    // Jobs
    // ---------------------------------------------------------------------

    /// Admit a job definition and forward it to the core.
    pub async fn submit(&self, session: SessionId, def: &JobDefinition) -> Result<JobId> {
        let identity = self.identity(session)?;

        if def.tasks.is_empty() {
            return Err(SchedulerError::Validation(format!(
                "job '{}' has no task",
                def.name
            )));
        }
        if !self.tiers.allows(def.priority, identity.admin) {
            return Err(SchedulerError::PermissionDenied(format!(
                "priority '{}' requires an administrator",
                def.priority
            )));
        }
        // A cycle is a malformed submission like any other.
        validate_job(def, self.job_factor).map_err(|err| match err {
            SchedulerError::DagCycle(msg) => SchedulerError::Validation(msg),
            other => other,
        })?;

        let job = {
            let mut st = self.lock()?;
            let id = st.ids.next_id();
            let job = Job::from_definition(id, identity.username.clone(), def, self.job_factor)?;
            st.jobs.insert(id, IdentifyJob::new(id, identity.username.clone()));
            st.stats.job_submitted(job.job_type);
            job
        };
        let id = job.id;
        let job_type = job.job_type;

        match self.core.submit(job).await {
            Ok(id) => {
                info!(%session, user = %identity.username, job = %id, "job admitted");
                Ok(id)
            }
            Err(err) => {
                let mut st = self.lock()?;
                st.jobs.remove(&id);
                st.stats.job_withdrawn(job_type);
                warn!(%session, job = %id, error = %err, "core refused job");
                Err(err)
            }
        }
    }

    /// Result of a terminal job; `None` while it still runs.
    ///
    /// Once handed out, the job is no longer tracked.
    pub async fn get_result(&self, session: SessionId, job: JobId) -> Result<Option<JobResult>> {
        self.authorize(session, job)?;
        let result = self.core.take_result(job).await?;
        if result.is_some() {
            self.lock()?.jobs.remove(&job);
            debug!(%session, %job, "result handed out; ownership record dropped");
        }
        Ok(result)
    }

    pub async fn pause_job(&self, session: SessionId, job: JobId) -> Result<bool> {
        self.authorize(session, job)?;
        self.core.pause_job(job).await
    }

    pub async fn resume_job(&self, session: SessionId, job: JobId) -> Result<bool> {
        self.authorize(session, job)?;
        self.core.resume_job(job).await
    }

    pub async fn kill_job(&self, session: SessionId, job: JobId) -> Result<bool> {
        self.authorize(session, job)?;
        self.core.kill_job(job).await
    }

    pub async fn change_priority(
        &self,
        session: SessionId,
        job: JobId,
        priority: Priority,
    ) -> Result<bool> {
        let identity = self.authorize(session, job)?;
        if !self.tiers.allows(priority, identity.admin) {
            return Err(SchedulerError::PermissionDenied(format!(
                "priority '{priority}' requires an administrator"
            )));
        }
        self.core.change_priority(job, priority).await
    }

    /// Purge a terminal job without fetching its result.
    pub async fn remove_job(&self, session: SessionId, job: JobId) -> Result<bool> {
        self.authorize(session, job)?;
        let removed = self.core.remove_job(job).await?;
        if removed {
            self.lock()?.jobs.remove(&job);
        }
        Ok(removed)
    }

    pub async fn jobs(
        &self,
        session: SessionId,
        comparator: JobComparator,
    ) -> Result<Vec<JobSnapshot>> {
        self.identity(session)?;
        self.core.list_jobs(comparator).await
    }

    pub fn stats(&self, session: SessionId) -> Result<SchedulerStats> {
        let st = self.lock()?;
        if !st.identities.contains_key(&session) {
            return Err(SchedulerError::AccessDenied);
        }
        Ok(st.stats.clone())
    }

    /// Number of jobs the gate still tracks ownership for.
    pub fn tracked_jobs(&self) -> usize {
        self.lock().map(|st| st.jobs.len()).unwrap_or(0)
    }

    /// Rebuild ownership records and the id allocator from recovered jobs.
    pub fn adopt_recovered(&self, jobs: &[Job]) -> Result<()> {
        let mut st = self.lock()?;
        for job in jobs {
            let mut record = IdentifyJob::new(job.id, job.owner.clone());
            record.finished = job.status().is_terminal();
            st.jobs.insert(job.id, record);
            st.ids.resume_after(job.id);
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Listeners
    // ---------------------------------------------------------------------

    /// Register the caller's listener and return the current state.
    pub async fn add_listener(
        &self,
        session: SessionId,
        listener: Box<dyn SchedulerEventListener>,
    ) -> Result<SchedulerSnapshot> {
        {
            let mut st = self.lock()?;
            if !st.identities.contains_key(&session) {
                return Err(SchedulerError::AccessDenied);
            }
            st.dispatcher.add(session, listener);
        }
        debug!(%session, "listener registered");
        self.core.snapshot().await
    }

    pub fn listener_count(&self) -> usize {
        self.lock().map(|st| st.dispatcher.len()).unwrap_or(0)
    }

    // ---------------------------------------------------------------------
    // Scheduler-wide control
    // ---------------------------------------------------------------------

    /// Forward a control order for an administrator; `false` otherwise.
    pub async fn control(&self, session: SessionId, control: SchedulerControl) -> bool {
        match self.identity(session) {
            Ok(identity) if identity.admin => {}
            Ok(identity) => {
                warn!(%session, user = %identity.username, ?control, "control order needs an administrator");
                return false;
            }
            Err(_) => {
                warn!(%session, ?control, "control order from an unknown session");
                return false;
            }
        }

        match self.core.control(control).await {
            Ok(done) => done,
            Err(err) => {
                warn!(%session, ?control, error = %err, "control order not delivered");
                false
            }
        }
    }

    pub async fn core_start(&self, session: SessionId) -> bool {
        self.control(session, SchedulerControl::Start).await
    }

    pub async fn core_stop(&self, session: SessionId) -> bool {
        self.control(session, SchedulerControl::Stop).await
    }

    pub async fn core_pause(&self, session: SessionId) -> bool {
        self.control(session, SchedulerControl::Pause).await
    }

    pub async fn core_immediate_pause(&self, session: SessionId) -> bool {
        self.control(session, SchedulerControl::Freeze).await
    }

    pub async fn core_resume(&self, session: SessionId) -> bool {
        self.control(session, SchedulerControl::Resume).await
    }

    pub async fn core_shutdown(&self, session: SessionId) -> bool {
        self.control(session, SchedulerControl::Shutdown).await
    }

    pub async fn core_kill(&self, session: SessionId) -> bool {
        self.control(session, SchedulerControl::Kill).await
    }
}

impl EventSink for Frontend {
    fn publish(&self, event: &SchedulerEvent) {
        let mut st = match self.state.lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!(event = event.name(), "front-end state mutex poisoned; event dropped");
                return;
            }
        };

        match event {
            SchedulerEvent::Scheduler(status) => {
                st.stats.scheduler_changed(*status);
                // A killed core forgets every job at once.
                if *status == SchedulerStatusEvent::Killed {
                    st.jobs.clear();
                }
            }
            SchedulerEvent::JobRunningToFinished(job) => {
                if let Some(record) = st.jobs.get_mut(&job.id) {
                    record.finished = true;
                }
                st.stats.finished_jobs += 1;
            }
            SchedulerEvent::TaskRunningToFinished(_) => st.stats.finished_tasks += 1,
            SchedulerEvent::JobKilled(job) | SchedulerEvent::JobRemoved(job) => {
                st.jobs.remove(&job.id);
            }
            _ => {}
        }

        let pruned = st.dispatcher.dispatch(event);
        for session in pruned {
            if let Some(identity) = st.identities.remove(&session) {
                warn!(%session, user = %identity.username, "stale listener; identity dropped");
            }
        }
    }
}

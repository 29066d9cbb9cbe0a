// src/events/dispatcher.rs

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, error};

use crate::events::{SchedulerEvent, SchedulerEventListener};
use crate::frontend::SessionId;

/// Fan-out of events to every registered listener.
///
/// A listener that fails to receive is removed on the spot; the broadcast
/// continues with the others. Delivery is best-effort and never retried.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: BTreeMap<SessionId, Box<dyn SchedulerEventListener>>,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("sessions", &self.listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the listener of `session`, replacing any previous one.
    pub fn add(&mut self, session: SessionId, listener: Box<dyn SchedulerEventListener>) {
        if self.listeners.insert(session, listener).is_some() {
            debug!(%session, "replaced existing listener");
        }
    }

    pub fn remove(&mut self, session: SessionId) -> bool {
        self.listeners.remove(&session).is_some()
    }

    pub fn contains(&self, session: SessionId) -> bool {
        self.listeners.contains_key(&session)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn sessions(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.listeners.keys().copied()
    }

    /// Deliver `event` to every listener. Returns the pruned sessions.
    pub fn dispatch(&mut self, event: &SchedulerEvent) -> Vec<SessionId> {
        let mut failed = Vec::new();

        for (session, listener) in self.listeners.iter_mut() {
            if let Err(err) = listener.on_event(event) {
                error!(
                    %session,
                    event = event.name(),
                    error = %err,
                    "listener failed to receive event; removing it"
                );
                failed.push(*session);
            }
        }

        for session in failed.iter() {
            self.listeners.remove(session);
        }
        failed
    }
}

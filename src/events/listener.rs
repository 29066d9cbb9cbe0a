// src/events/listener.rs

use tokio::sync::mpsc;

use crate::errors::{Result, SchedulerError};
use crate::events::SchedulerEvent;

/// Observer of scheduler events.
///
/// Returning an error marks the listener as stale: the dispatcher drops it
/// together with its session's identity.
pub trait SchedulerEventListener: Send {
    fn on_event(&mut self, event: &SchedulerEvent) -> Result<()>;
}

impl<F> SchedulerEventListener for F
where
    F: FnMut(&SchedulerEvent) -> Result<()> + Send,
{
    fn on_event(&mut self, event: &SchedulerEvent) -> Result<()> {
        self(event)
    }
}

/// Forwards events into an unbounded tokio channel.
///
/// A dropped receiver counts as a failed delivery.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<SchedulerEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SchedulerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SchedulerEventListener for ChannelListener {
    fn on_event(&mut self, event: &SchedulerEvent) -> Result<()> {
        self.tx
            .send(event.clone())
            .map_err(|_| SchedulerError::Unavailable("listener channel closed".to_string()))
    }
}

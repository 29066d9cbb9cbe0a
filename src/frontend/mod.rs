// src/frontend/mod.rs

//! Caller-facing admission gate.
//!
//! - [`identity`]: sessions, identities and job ownership records.
//! - [`auth`]: credential checks against configured users.
//! - [`stats`]: observability counters.
//! - [`gate`]: the [`Frontend`] itself.

pub mod auth;
pub mod gate;
pub mod identity;
pub mod stats;

pub use auth::{Authenticator, ConfiguredUsers, Credentials};
pub use gate::Frontend;
pub use identity::{IdentifyJob, SessionId, UserIdentification};
pub use stats::SchedulerStats;

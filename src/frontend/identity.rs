// src/frontend/identity.rs

use std::fmt;

use chrono::{DateTime, Utc};

use crate::model::JobId;

/// Opaque handle of a connected caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Identity bound to a session.
///
/// Two identities are equal when they carry the same user name, whatever
/// the session or connection time.
#[derive(Debug, Clone)]
pub struct UserIdentification {
    pub username: String,
    pub admin: bool,
    pub connected_at: DateTime<Utc>,
}

impl UserIdentification {
    pub fn new(username: impl Into<String>, admin: bool) -> Self {
        Self {
            username: username.into(),
            admin,
            connected_at: Utc::now(),
        }
    }

    pub fn user(username: impl Into<String>) -> Self {
        Self::new(username, false)
    }

    pub fn admin(username: impl Into<String>) -> Self {
        Self::new(username, true)
    }
}

impl PartialEq for UserIdentification {
    fn eq(&self, other: &Self) -> bool {
        self.username == other.username
    }
}

impl Eq for UserIdentification {}

/// Ownership record the gate keeps for every admitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifyJob {
    pub job: JobId,
    pub owner: String,
    pub finished: bool,
}

impl IdentifyJob {
    pub fn new(job: JobId, owner: impl Into<String>) -> Self {
        Self {
            job,
            owner: owner.into(),
            finished: false,
        }
    }

    /// Owners and administrators may act on the job.
    pub fn has_right(&self, identity: &UserIdentification) -> bool {
        identity.admin || identity.username == self.owner
    }
}

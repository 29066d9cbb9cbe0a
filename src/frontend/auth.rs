// src/frontend/auth.rs

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use crate::config::{SchedulerConfig, UserEntry};
use crate::errors::{Result, SchedulerError};
use crate::frontend::UserIdentification;

/// User name and password presented at connection time.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Turns credentials into an identity.
pub trait Authenticator: Send + Sync + fmt::Debug {
    fn authenticate(&self, credentials: &Credentials) -> Result<UserIdentification>;
}

/// Users declared in `[[user]]` sections of the scheduler configuration.
#[derive(Clone, Default)]
pub struct ConfiguredUsers {
    users: HashMap<String, UserEntry>,
}

impl fmt::Debug for ConfiguredUsers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.users.keys().collect();
        names.sort();
        f.debug_struct("ConfiguredUsers").field("users", &names).finish()
    }
}

impl ConfiguredUsers {
    pub fn new(entries: impl IntoIterator<Item = UserEntry>) -> Self {
        Self {
            users: entries
                .into_iter()
                .map(|entry| (entry.name.clone(), entry))
                .collect(),
        }
    }

    pub fn from_config(cfg: &SchedulerConfig) -> Self {
        Self::new(cfg.user.iter().cloned())
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Authenticator for ConfiguredUsers {
    fn authenticate(&self, credentials: &Credentials) -> Result<UserIdentification> {
        match self.users.get(&credentials.username) {
            Some(entry) if entry.password == credentials.password => {
                debug!(user = %entry.name, admin = entry.admin, "user authenticated");
                Ok(UserIdentification::new(entry.name.clone(), entry.admin))
            }
            _ => {
                warn!(user = %credentials.username, "authentication failed");
                Err(SchedulerError::AccessDenied)
            }
        }
    }
}

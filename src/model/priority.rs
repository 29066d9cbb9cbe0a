// src/model/priority.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// Job priority, ordered from the least to the most urgent tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Idle,
    Lowest,
    Low,
    #[default]
    Normal,
    High,
    Highest,
}

impl Priority {
    pub const ALL: [Priority; 6] = [
        Priority::Idle,
        Priority::Lowest,
        Priority::Low,
        Priority::Normal,
        Priority::High,
        Priority::Highest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Idle => "idle",
            Priority::Lowest => "lowest",
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Highest => "highest",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which priority tiers require a privileged identity.
///
/// Applied both at submission and on priority changes. Defaults to
/// `idle`, `high` and `highest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegedTiers {
    privileged: Vec<Priority>,
}

impl PrivilegedTiers {
    pub fn new(privileged: impl IntoIterator<Item = Priority>) -> Self {
        let mut privileged: Vec<Priority> = privileged.into_iter().collect();
        privileged.sort();
        privileged.dedup();
        Self { privileged }
    }

    pub fn is_privileged(&self, priority: Priority) -> bool {
        self.privileged.contains(&priority)
    }

    /// Whether a caller with the given privilege may use `priority`.
    pub fn allows(&self, priority: Priority, admin: bool) -> bool {
        admin || !self.is_privileged(priority)
    }

    pub fn privileged(&self) -> &[Priority] {
        &self.privileged
    }
}

impl Default for PrivilegedTiers {
    fn default() -> Self {
        Self::new([Priority::Idle, Priority::High, Priority::Highest])
    }
}

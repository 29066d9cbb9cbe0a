// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Admission and control failures surface as typed variants so callers can
//! tell "not connected" apart from "not allowed" or "malformed job". Task
//! execution errors never travel through here; they are absorbed into task
//! and job statuses by the core.

use thiserror::Error;

use crate::model::JobId;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Access denied: no identity is connected for this session")]
    AccessDenied,

    #[error("Session is already connected")]
    AlreadyConnected,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid job: {0}")]
    Validation(String),

    #[error("Cycle detected in job DAG: {0}")]
    DagCycle(String),

    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Scheduler unavailable: {0}")]
    Unavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SchedulerError {
    /// True for errors caused by a malformed job definition.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::DagCycle(_))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SchedulerError>;

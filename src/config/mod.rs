// src/config/mod.rs

//! Configuration loading and validation for gridsched.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`) for the scheduler
//!   configuration and for job-definition files.
//! - Load files from disk (`loader.rs`).
//! - Validate invariants like DAG correctness (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_job, load_or_default, parse_job};
pub use model::{
    BranchDefinition, JobDefinition, JobSection, RawJobFile, RawSchedulerConfig, SchedulerConfig,
    SchedulerSection, StoreKind, StoreSection, TaskDefinition, UserEntry,
};
pub use validate::{validate_job, validate_job_structure};

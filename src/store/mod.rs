// src/store/mod.rs

//! Persistence hooks for jobs.
//!
//! The runtime saves a job after every core step that touched it and drops
//! it once purged. At boot, [`JobStore::load_all`] feeds recovery.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::config::{StoreKind, StoreSection};
use crate::errors::Result;
use crate::model::{Job, JobId};

/// Abstraction over where job state is kept.
pub trait JobStore: Send {
    fn save(&mut self, job: &Job) -> Result<()>;

    /// Removing an unknown job is not an error.
    fn remove(&mut self, id: JobId) -> Result<()>;

    /// Every stored job, ordered by id.
    fn load_all(&self) -> Result<Vec<Job>>;
}

/// Build the store selected by the `[store]` section.
pub fn open_store(section: &StoreSection) -> Result<Box<dyn JobStore>> {
    match section.kind {
        StoreKind::Memory => Ok(Box::new(MemoryStore::new())),
        StoreKind::File => Ok(Box::new(FileStore::open(&section.path)?)),
    }
}

// src/exec/mod.rs

//! Resource and execution layer.
//!
//! This module is responsible for actually running the commands defined in
//! the tasks, using `tokio::process::Command`, and reporting back to the
//! runtime via `RuntimeEvent`s.
//!
//! - [`backend`] provides the `ResourceBackend` trait and the concrete
//!   `ProcessBackend` the runtime uses in production, and which tests can
//!   replace with a fake implementation.
//! - [`executor_loop`] owns the loop which manages task processes.
//! - [`task_runner`] handles one execution (scripts and command).
//! - [`script`] evaluates hook scripts.

pub mod backend;
pub mod executor_loop;
pub mod script;
pub mod task_runner;

pub use backend::{BackendFuture, ProcessBackend, ResourceBackend};
pub use executor_loop::{local_host_name, spawn_executor, ExecutorRequest};
pub use script::{ScriptEngine, ScriptFuture, ScriptOutput, ShellScriptEngine};
pub use task_runner::task_env;

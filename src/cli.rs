// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `gridsched`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "gridsched",
    version,
    about = "Schedule jobs made of dependent tasks and run them as local processes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the scheduler config file (TOML).
    ///
    /// Default: `Scheduler.toml` in the current working directory. A missing
    /// file means built-in defaults.
    #[arg(long, value_name = "PATH", default_value = "Scheduler.toml")]
    pub config: String,

    /// Job definition files (TOML) to submit at startup.
    #[arg(value_name = "JOB")]
    pub jobs: Vec<PathBuf>,

    /// User submitting the jobs.
    #[arg(long, value_name = "NAME", default_value = "local")]
    pub user: String,

    /// Password checked against the `[[user]]` entries of the config.
    ///
    /// Without it the local user is trusted as an administrator.
    #[arg(long, value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Exit once every submitted job is terminal.
    #[arg(long)]
    pub once: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `GRIDSCHED_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the jobs, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

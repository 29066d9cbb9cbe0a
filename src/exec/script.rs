// src/exec/script.rs

//! Script hooks (selection, pre, post, cleaning).

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::errors::{Result, SchedulerError};
use crate::model::Script;

/// What a script run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutput {
    pub success: bool,
    /// stdout followed by stderr.
    pub logs: String,
}

pub type ScriptFuture<'a> = Pin<Box<dyn Future<Output = Result<ScriptOutput>> + Send + 'a>>;

/// Evaluates hook scripts.
///
/// `Err` means the script could not run at all (unknown language, spawn
/// failure); a script that ran and failed is `Ok` with `success == false`.
pub trait ScriptEngine: Send + Sync + fmt::Debug {
    fn run<'a>(&'a self, script: &'a Script, env: &'a [(String, String)]) -> ScriptFuture<'a>;
}

/// Runs `sh` and `bash` scripts; params become positional arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellScriptEngine;

impl ShellScriptEngine {
    pub const LANGUAGES: [&'static str; 2] = ["sh", "bash"];
}

impl ScriptEngine for ShellScriptEngine {
    fn run<'a>(&'a self, script: &'a Script, env: &'a [(String, String)]) -> ScriptFuture<'a> {
        Box::pin(async move {
            let language = script.language.as_str();
            if !Self::LANGUAGES.contains(&language) {
                return Err(SchedulerError::Config(format!(
                    "unsupported script language '{language}'"
                )));
            }

            // `$0` is the interpreter name so params start at `$1`.
            let output = Command::new(language)
                .arg("-c")
                .arg(&script.source)
                .arg(language)
                .args(&script.params)
                .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output()
                .await?;

            let mut logs = String::from_utf8_lossy(&output.stdout).into_owned();
            logs.push_str(&String::from_utf8_lossy(&output.stderr));
            debug!(%language, success = output.status.success(), "script finished");

            Ok(ScriptOutput {
                success: output.status.success(),
                logs,
            })
        })
    }
}

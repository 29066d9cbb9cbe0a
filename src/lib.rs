// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod events;
pub mod exec;
pub mod frontend;
pub mod logging;
pub mod model;
pub mod store;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_job, load_or_default, validate_job, JobDefinition};
use crate::engine::{
    CoreHandle, CoreOptions, CoreRuntime, Runtime, RuntimeEvent, SchedulerControl,
};
use crate::events::{ChannelListener, EventSink, SchedulerEvent};
use crate::exec::{ProcessBackend, ScriptEngine, ShellScriptEngine};
use crate::frontend::{Credentials, Frontend, UserIdentification};
use crate::store::open_store;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config and job-file loading
/// - store recovery
/// - core / runtime / process backend
/// - the admission gate and a logging listener
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(&args.config)
        .with_context(|| format!("loading config '{}'", args.config))?;

    let defs = args
        .jobs
        .iter()
        .map(|path| load_job(path).with_context(|| format!("loading job '{}'", path.display())))
        .collect::<Result<Vec<_>>>()?;

    if args.dry_run {
        for def in &defs {
            validate_job(def, cfg.scheduler.job_factor)
                .with_context(|| format!("validating job '{}'", def.name))?;
        }
        print_dry_run(&defs);
        return Ok(());
    }

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(cfg.scheduler.channel_capacity);
    let frontend = Arc::new(Frontend::new(CoreHandle::new(rt_tx.clone()), &cfg));

    // Recovery: the gate learns ownership, the core the jobs themselves.
    let store = open_store(&cfg.store)?;
    let recovered = store.load_all()?;
    frontend.adopt_recovered(&recovered)?;

    let mut core = CoreRuntime::with_default_policy(CoreOptions::from_config(&cfg, args.once));
    let recovered_count = core.recover(recovered);
    if recovered_count > 0 {
        info!(jobs = recovered_count, "jobs recovered from store");
    }
    if cfg.scheduler.start_on_boot {
        core.control(SchedulerControl::Start);
    }

    let engine: Arc<dyn ScriptEngine> = Arc::new(ShellScriptEngine);
    let backend = ProcessBackend::new(rt_tx.clone(), engine);

    // Ctrl-C → graceful shutdown, a second one kills.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    eprintln!("failed to listen for Ctrl+C: {e}");
                    return;
                }
                if tx.send(RuntimeEvent::ShutdownRequested).await.is_err() {
                    return;
                }
            }
        });
    }

    let sink: Arc<dyn EventSink> = frontend.clone();
    let runtime = Runtime::new(core, rt_rx, rt_tx.clone(), backend, sink, store);
    let runtime_task = tokio::spawn(runtime.run());

    let session = frontend.open_session();
    match &args.password {
        Some(password) => {
            frontend.connect_with_credentials(session, &Credentials::new(&args.user, password))?;
        }
        None => frontend.connect(session, UserIdentification::admin(&args.user))?,
    }

    let (listener, mut events) = ChannelListener::new();
    let snapshot = frontend.add_listener(session, Box::new(listener)).await?;
    info!(state = %snapshot.state, jobs = snapshot.jobs.len(), "connected to scheduler");

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            report_event(&event);
        }
    });

    let mut admitted = 0usize;
    for def in &defs {
        match frontend.submit(session, def).await {
            Ok(id) => {
                admitted += 1;
                info!(job = %id, name = %def.name, "job submitted");
            }
            Err(err) => error!(name = %def.name, error = %err, "job rejected"),
        }
    }

    if args.once && admitted == 0 && recovered_count == 0 {
        info!("nothing to run; shutting down");
        CoreHandle::new(rt_tx.clone()).request_shutdown().await?;
    }
    drop(rt_tx);

    let core = runtime_task.await??;
    print_summary(&core);
    Ok(())
}

fn report_event(event: &SchedulerEvent) {
    match event {
        SchedulerEvent::JobRunningToFinished(job) => {
            println!("job {} '{}' {}", job.id, job.name, job.status);
        }
        SchedulerEvent::TaskWaitingForRestart(ev) => {
            warn!(job = %ev.task.job, task = %ev.task.name, "task waiting for restart");
        }
        SchedulerEvent::TaskSkipped(ev) => {
            info!(job = %ev.task.job, task = %ev.task.name, "task skipped; branch not taken");
        }
        other => debug!(event = other.name(), job = ?other.job_id(), "scheduler event"),
    }
}

fn print_summary(core: &CoreRuntime) {
    for job in core.jobs() {
        println!("{} '{}': {}", job.id, job.name, job.status());
        for result in job.result().precious_results() {
            match (&result.value, &result.error) {
                (_, Some(err)) => println!("  {}: error: {err}", result.task_name),
                (Some(value), None) => println!("  {}: {value}", result.task_name),
                (None, None) => println!("  {}: (no output)", result.task_name),
            }
        }
    }
}

/// Simple dry-run output: print jobs, their tasks, deps and commands.
fn print_dry_run(defs: &[JobDefinition]) {
    println!("gridsched dry-run");
    println!();

    for def in defs {
        println!(
            "job '{}' (priority {}, type {}, cancel_on_error {})",
            def.name,
            def.priority,
            def.job_type.as_str(),
            def.cancel_on_error
        );
        println!("  tasks ({}):", def.tasks.len());
        for (name, task) in def.tasks.iter() {
            println!("  - {name}");
            println!("      cmd: {}", task.cmd);
            if !task.after.is_empty() {
                println!("      after: {:?}", task.after);
            }
            if task.precious_result {
                println!("      precious_result: true");
            }
            println!(
                "      budgets: executions {}, on failure {}",
                task.max_executions, task.max_executions_on_failure
            );
        }
    }

    debug!("dry-run complete (no execution)");
}

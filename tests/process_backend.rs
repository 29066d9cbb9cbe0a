// tests/process_backend.rs
#![cfg(unix)]

use std::error::Error;
use std::sync::Arc;

use tokio::sync::mpsc;

use gridsched::engine::{RuntimeEvent, TaskLaunch, TaskOutcome, TaskRelease};
use gridsched::exec::{task_env, ProcessBackend, ResourceBackend, ScriptEngine, ShellScriptEngine};
use gridsched::model::{Branch, JobId, Script, TaskId, TaskResult, TaskScripts};
use gridsched_test_utils::with_timeout;

type TestResult = Result<(), Box<dyn Error>>;

const JOB: JobId = JobId(1);
const TASK: TaskId = TaskId(1001);

fn launch(command: &str) -> TaskLaunch {
    TaskLaunch {
        job: JOB,
        task: TASK,
        task_name: "A".into(),
        command: command.into(),
        scripts: TaskScripts::default(),
        parent_results: Vec::new(),
    }
}

fn backend() -> (ProcessBackend, mpsc::Receiver<RuntimeEvent>) {
    let (tx, rx) = mpsc::channel(16);
    (ProcessBackend::new(tx, Arc::new(ShellScriptEngine)), rx)
}

async fn next(rx: &mut mpsc::Receiver<RuntimeEvent>) -> Result<RuntimeEvent, Box<dyn Error>> {
    with_timeout(rx.recv()).await.ok_or_else(|| "event channel closed".into())
}

async fn outcome_of(rx: &mut mpsc::Receiver<RuntimeEvent>) -> Result<TaskOutcome, Box<dyn Error>> {
    match next(rx).await? {
        RuntimeEvent::TaskStarted { task, .. } => assert_eq!(task, TASK),
        other => return Err(format!("expected TaskStarted, got {other:?}").into()),
    }
    match next(rx).await? {
        RuntimeEvent::TaskCompleted { outcome, .. } => Ok(outcome),
        other => Err(format!("expected TaskCompleted, got {other:?}").into()),
    }
}

#[tokio::test]
async fn successful_command_reports_its_trimmed_stdout() -> TestResult {
    let (mut backend, mut rx) = backend();
    backend.acquire(launch("echo hello; echo")).await?;

    match outcome_of(&mut rx).await? {
        TaskOutcome::Success { value, branch, .. } => {
            assert_eq!(value.as_deref(), Some("hello"));
            assert_eq!(branch, None);
        }
        other => return Err(format!("unexpected outcome {other:?}").into()),
    }
    Ok(())
}

#[tokio::test]
async fn non_zero_exit_is_an_error() -> TestResult {
    let (mut backend, mut rx) = backend();
    backend.acquire(launch("echo oops >&2; exit 3")).await?;

    match outcome_of(&mut rx).await? {
        TaskOutcome::Error { message, logs } => {
            assert!(message.contains('3'), "{message}");
            assert!(logs.contains("oops"));
        }
        other => return Err(format!("unexpected outcome {other:?}").into()),
    }
    Ok(())
}

#[tokio::test]
async fn parent_results_are_exposed_in_the_environment() -> TestResult {
    let (mut backend, mut rx) = backend();
    let mut l = launch("echo \"$GRIDSCHED_JOB_ID:$GRIDSCHED_PARENT_0:$GRIDSCHED_PARENT_1\"");
    l.parent_results = vec![
        TaskResult::success(TaskId(1002), "B", Some("from-b".into()), String::new()),
        TaskResult::failure(TaskId(1003), "C", "boom", String::new()),
    ];
    backend.acquire(l).await?;

    match outcome_of(&mut rx).await? {
        TaskOutcome::Success { value, .. } => {
            assert_eq!(value.as_deref(), Some(format!("{JOB}:from-b:").as_str()));
        }
        other => return Err(format!("unexpected outcome {other:?}").into()),
    }
    Ok(())
}

#[tokio::test]
async fn branch_script_sees_the_result_and_picks_a_side() -> TestResult {
    for (command, expected) in [("echo ok", Branch::If), ("echo nope", Branch::Else)] {
        let (mut backend, mut rx) = backend();
        let mut l = launch(command);
        l.scripts.branch = Some(Script::shell("test \"$GRIDSCHED_RESULT\" = ok"));
        backend.acquire(l).await?;

        match outcome_of(&mut rx).await? {
            TaskOutcome::Success { branch, .. } => assert_eq!(branch, Some(expected)),
            other => return Err(format!("unexpected outcome {other:?}").into()),
        }
    }
    Ok(())
}

#[tokio::test]
async fn failing_selection_script_refuses_the_launch() -> TestResult {
    let (mut backend, mut rx) = backend();
    let mut l = launch("echo never");
    l.scripts.selection = Some(Script::shell("exit 1"));
    backend.acquire(l).await?;

    match next(&mut rx).await? {
        RuntimeEvent::AcquireFailed { task, reason, .. } => {
            assert_eq!(task, TASK);
            assert!(reason.contains("selection script"));
        }
        other => return Err(format!("expected AcquireFailed, got {other:?}").into()),
    }
    Ok(())
}

#[tokio::test]
async fn failing_pre_script_skips_the_command() -> TestResult {
    let (mut backend, mut rx) = backend();
    let mut l = launch("echo ran");
    l.scripts.pre = Some(Script::shell("echo not-ready; exit 1"));
    backend.acquire(l).await?;

    match outcome_of(&mut rx).await? {
        TaskOutcome::Error { message, logs } => {
            assert_eq!(message, "pre script failed");
            assert!(logs.contains("not-ready"));
        }
        other => return Err(format!("unexpected outcome {other:?}").into()),
    }
    Ok(())
}

#[tokio::test]
async fn abort_release_kills_the_execution_silently() -> TestResult {
    let (mut backend, mut rx) = backend();
    backend.acquire(launch("sleep 30")).await?;

    let handle = match next(&mut rx).await? {
        RuntimeEvent::TaskStarted { handle, .. } => handle,
        other => return Err(format!("expected TaskStarted, got {other:?}").into()),
    };
    backend
        .release(TaskRelease {
            job: JOB,
            task: TASK,
            handle,
            cleaning: None,
            abort: true,
        })
        .await?;

    let quiet = tokio::time::timeout(std::time::Duration::from_millis(300), rx.recv()).await;
    assert!(quiet.is_err(), "aborted execution must not report completion");
    Ok(())
}

#[tokio::test]
async fn script_engine_passes_params_and_rejects_unknown_languages() -> TestResult {
    let engine = ShellScriptEngine;
    let env = task_env(JOB, TASK, &[]);

    let script = Script {
        language: "sh".into(),
        source: "echo \"$1-$2-$GRIDSCHED_TASK_ID\"".into(),
        params: vec!["x".into(), "y".into()],
    };
    let out = engine.run(&script, &env).await?;
    assert!(out.success);
    assert_eq!(out.logs.trim(), format!("x-y-{TASK}"));

    let python = Script {
        language: "python".into(),
        source: "print(1)".into(),
        params: Vec::new(),
    };
    assert!(engine.run(&python, &env).await.is_err());
    Ok(())
}

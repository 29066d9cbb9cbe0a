// tests/runtime_fake_backend.rs

use std::error::Error;
use std::time::Duration;

use gridsched::config::SchedulerConfig;
use gridsched::engine::{CoreOptions, RuntimeEvent, TaskOutcome};
use gridsched::events::SchedulerEvent;
use gridsched::frontend::UserIdentification;
use gridsched::model::{Branch, JobId, JobStatus, TaskId, TaskStatus, DEFAULT_JOB_FACTOR};
use gridsched_test_utils::builders::{
    branch_definition, build_job_for, fan_out_definition, task, JobDefinitionBuilder,
    TaskDefinitionBuilder,
};
use gridsched_test_utils::fake_backend::{FakeStep, FAKE_HOST};
use gridsched_test_utils::harness::{wait_for, wait_for_job_end, Harness};
use gridsched_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn fast_options(exit_when_idle: bool) -> CoreOptions {
    CoreOptions {
        restart_base_delay: Duration::from_millis(10),
        restart_max_delay: Duration::from_millis(50),
        exit_when_idle,
        acquire_retry_delay: Duration::from_millis(10),
    }
}

fn harness(exit_when_idle: bool) -> Harness {
    init_tracing();
    Harness::start(&SchedulerConfig::default(), fast_options(exit_when_idle))
}

fn task_id(job: JobId, sequence: u64) -> TaskId {
    TaskId::derive(job, sequence, DEFAULT_JOB_FACTOR)
}

#[tokio::test]
async fn fan_out_job_runs_to_completion_and_exits_when_idle() -> TestResult {
    let h = harness(true);
    let session = h.connect(UserIdentification::user("alice"));

    let id = h.frontend.submit(session, &fan_out_definition()).await?;
    let backend = h.backend.clone();
    let store = h.store.clone();
    let core = h.finish().await;

    let job = core.job(id).ok_or("job should still be registered")?;
    assert_eq!(job.status(), JobStatus::Finished);
    assert!(job.tasks().all(|t| t.host.as_deref() == Some(FAKE_HOST)));

    assert_eq!(backend.launched_names()[0], "A");
    assert_eq!(backend.launches().len(), 3);
    let releases = backend.releases();
    assert_eq!(releases.len(), 3);
    assert!(releases.iter().all(|r| !r.abort));

    let stored = store.get(id).ok_or("job should be persisted")?;
    assert_eq!(stored.status(), JobStatus::Finished);
    assert_eq!(stored.counters().finished, 3);
    Ok(())
}

#[tokio::test]
async fn branch_taken_by_the_backend_skips_the_other_side() -> TestResult {
    let h = harness(true);
    let session = h.connect(UserIdentification::user("alice"));
    let (_observer, mut events) = h.observe().await;

    h.backend.choose_branch("check", Branch::Else);
    let id = h.frontend.submit(session, &branch_definition()).await?;
    let skipped = wait_for(&mut events, |e| matches!(e, SchedulerEvent::TaskSkipped(_))).await;
    match skipped {
        SchedulerEvent::TaskSkipped(ev) => {
            assert_eq!(ev.task.name, "deploy");
            assert_eq!(ev.task.status, TaskStatus::Skipped);
        }
        other => return Err(format!("unexpected event {other:?}").into()),
    }

    let backend = h.backend.clone();
    let core = h.finish().await;
    let job = core.job(id).ok_or("job should still be registered")?;
    assert_eq!(job.status(), JobStatus::Finished);
    let mut launched = backend.launched_names();
    launched.sort();
    assert_eq!(launched, vec!["check", "done", "notify", "report"]);
    Ok(())
}

#[tokio::test]
async fn dependents_receive_parent_results() -> TestResult {
    let h = harness(true);
    let session = h.connect(UserIdentification::user("alice"));

    let def = JobDefinitionBuilder::new("pipe")
        .with_task("A", task("echo a", &[]))
        .with_task("B", task("cat", &["A"]))
        .build();
    h.frontend.submit(session, &def).await?;
    let backend = h.backend.clone();
    h.finish().await;

    let launch = backend
        .launches()
        .into_iter()
        .find(|l| l.task_name == "B")
        .ok_or("B should be launched")?;
    assert_eq!(launch.parent_results.len(), 1);
    assert_eq!(launch.parent_results[0].value.as_deref(), Some("A"));
    Ok(())
}

#[tokio::test]
async fn errored_task_is_retried_after_a_delay() -> TestResult {
    let h = harness(false);
    let (_observer, mut events) = h.observe().await;
    let session = h.connect(UserIdentification::user("alice"));
    h.backend.fail_with_error("A", "boom");

    let def = JobDefinitionBuilder::new("retry")
        .with_task("A", TaskDefinitionBuilder::new("flaky").max_executions(2).build())
        .build();
    let id = h.frontend.submit(session, &def).await?;

    let waiting = wait_for(&mut events, |e| {
        matches!(e, SchedulerEvent::TaskWaitingForRestart(_))
    })
    .await;
    let SchedulerEvent::TaskWaitingForRestart(ev) = waiting else {
        return Err("expected a restart event".into());
    };
    assert_eq!(ev.task.status, TaskStatus::WaitingOnError);

    let end = wait_for_job_end(&mut events, id).await;
    assert!(matches!(end, SchedulerEvent::JobRunningToFinished(job) if job.status == JobStatus::Finished));
    assert_eq!(h.backend.launched_names(), vec!["A", "A"]);

    let result = h.frontend.get_result(session, id).await?.ok_or("no result")?;
    assert_eq!(result.get("A").and_then(|r| r.value.as_deref()), Some("A"));
    h.stop().await;
    Ok(())
}

#[tokio::test]
async fn node_failure_is_retried_immediately_then_fails_the_job() -> TestResult {
    let h = harness(false);
    let (_observer, mut events) = h.observe().await;
    let session = h.connect(UserIdentification::user("alice"));
    h.backend.fail_node("A");
    h.backend.fail_node("A");

    let def = JobDefinitionBuilder::new("doomed")
        .with_task("A", task("true", &[]))
        .with_task("B", task("true", &["A"]))
        .build();
    let id = h.frontend.submit(session, &def).await?;

    let end = wait_for_job_end(&mut events, id).await;
    let SchedulerEvent::JobRunningToFinished(job) = end else {
        return Err("unexpected end event".into());
    };
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.task("A").map(|t| t.status), Some(TaskStatus::Failed));
    assert_eq!(job.task("B").map(|t| t.status), Some(TaskStatus::NotStarted));
    assert_eq!(h.backend.launched_names(), vec!["A", "A"]);

    let result = h.frontend.get_result(session, id).await?.ok_or("no result")?;
    assert!(result.has_errors());
    h.stop().await;
    Ok(())
}

#[tokio::test]
async fn cancel_on_error_aborts_running_siblings() -> TestResult {
    let h = harness(false);
    let (_observer, mut events) = h.observe().await;
    let session = h.connect(UserIdentification::user("alice"));
    h.backend.script("A", FakeStep::Hold);
    h.backend.script("B", FakeStep::Hold);

    let def = JobDefinitionBuilder::new("strict")
        .cancel_on_error(true)
        .with_task("A", task("false", &[]))
        .with_task(
            "B",
            TaskDefinitionBuilder::new("sleep 60")
                .cleaning_script("rm -f lock")
                .build(),
        )
        .build();
    let id = h.frontend.submit(session, &def).await?;

    for _ in 0..2 {
        wait_for(&mut events, |e| matches!(e, SchedulerEvent::TaskPendingToRunning(_))).await;
    }

    h.tx.send(RuntimeEvent::TaskCompleted {
        job: id,
        task: task_id(id, 1),
        outcome: TaskOutcome::Error {
            message: "exit 1".into(),
            logs: String::new(),
        },
    })
    .await?;

    let end = wait_for_job_end(&mut events, id).await;
    let SchedulerEvent::JobRunningToFinished(job) = end else {
        return Err("unexpected end event".into());
    };
    assert_eq!(job.status, JobStatus::Canceled);
    assert_eq!(job.task("A").map(|t| t.status), Some(TaskStatus::Faulty));
    assert_eq!(job.task("B").map(|t| t.status), Some(TaskStatus::Aborted));

    let backend = h.backend.clone();
    h.stop().await;
    let releases = backend.releases();
    let b = releases
        .iter()
        .find(|r| r.task == task_id(id, 2))
        .ok_or("B should be released")?;
    assert!(b.abort);
    assert_eq!(b.cleaning.as_ref().map(|s| s.source.as_str()), Some("rm -f lock"));
    let a = releases
        .iter()
        .find(|r| r.task == task_id(id, 1))
        .ok_or("A should be released")?;
    assert!(!a.abort);
    Ok(())
}

#[tokio::test]
async fn refused_acquisition_is_retried() -> TestResult {
    let h = harness(true);
    let session = h.connect(UserIdentification::user("alice"));
    h.backend.script("A", FakeStep::Refuse("no free node".into()));

    let def = JobDefinitionBuilder::new("busy")
        .with_task("A", task("true", &[]))
        .build();
    let id = h.frontend.submit(session, &def).await?;
    let backend = h.backend.clone();
    let core = h.finish().await;

    assert_eq!(core.job(id).map(|j| j.status()), Some(JobStatus::Finished));
    assert_eq!(backend.launched_names(), vec!["A", "A"]);
    Ok(())
}

#[tokio::test]
async fn recovered_job_resumes_from_its_last_state() -> TestResult {
    init_tracing();
    let mut job = build_job_for(&fan_out_definition(), 7, "alice");
    job.start();
    let a = job.task_by_name("A").map(|t| t.id).ok_or("missing A")?;
    job.start_task(a, "crashed-node")?;

    let h = Harness::start_with(&SchedulerConfig::default(), fast_options(false), vec![job]);
    let alice = h.connect(UserIdentification::user("alice"));

    // Ids keep growing past recovered jobs.
    let next = h
        .frontend
        .submit(
            alice,
            &JobDefinitionBuilder::new("after").with_task("X", task("true", &[])).build(),
        )
        .await?;
    assert_eq!(next, JobId(8));

    let recovered = with_timeout(async {
        loop {
            if let Some(result) = h.frontend.get_result(alice, JobId(7)).await? {
                return Ok::<_, Box<dyn Error>>(result);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;
    assert_eq!(recovered.results.len(), 3);

    let backend = h.backend.clone();
    h.stop().await;
    let relaunched_a = backend
        .launches()
        .iter()
        .filter(|l| l.job == JobId(7) && l.task_name == "A")
        .count();
    assert_eq!(relaunched_a, 1);
    Ok(())
}

#[tokio::test]
async fn kill_aborts_running_tasks_and_forgets_the_job() -> TestResult {
    let h = harness(false);
    let (_observer, mut events) = h.observe().await;
    let session = h.connect(UserIdentification::user("alice"));
    h.backend.script("A", FakeStep::Hold);

    let id = h.frontend.submit(session, &fan_out_definition()).await?;
    wait_for(&mut events, |e| matches!(e, SchedulerEvent::TaskPendingToRunning(_))).await;

    assert!(h.frontend.kill_job(session, id).await?);
    let end = wait_for_job_end(&mut events, id).await;
    let SchedulerEvent::JobKilled(job) = end else {
        return Err("expected a kill event".into());
    };
    assert_eq!(job.status, JobStatus::Killed);
    assert_eq!(job.task("A").map(|t| t.status), Some(TaskStatus::Aborted));
    assert_eq!(job.task("B").map(|t| t.status), Some(TaskStatus::NotStarted));

    let backend = h.backend.clone();
    let store = h.store.clone();
    let core = h.stop().await;
    assert!(core.job(id).is_none());
    assert!(store.get(id).is_none());
    assert!(backend
        .releases()
        .iter()
        .any(|r| r.task == task_id(id, 1) && r.abort));
    Ok(())
}

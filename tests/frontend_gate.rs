// tests/frontend_gate.rs

use std::error::Error;

use gridsched::config::{JobDefinition, RawSchedulerConfig, SchedulerConfig, UserEntry};
use gridsched::engine::CoreOptions;
use gridsched::errors::SchedulerError;
use gridsched::events::{SchedulerEvent, SchedulerStatusEvent};
use gridsched::frontend::{Authenticator, ConfiguredUsers, Credentials, UserIdentification};
use gridsched::model::{JobComparator, JobId, JobSortKey, JobStatus, Priority, SortOrder};
use gridsched_test_utils::builders::{fan_out_definition, task, JobDefinitionBuilder};
use gridsched_test_utils::fake_backend::FakeStep;
use gridsched_test_utils::harness::{wait_for, wait_for_job_end, Harness};
use gridsched_test_utils::init_tracing;
use gridsched_test_utils::listeners::FailingListener;

type TestResult = Result<(), Box<dyn Error>>;

fn harness() -> Harness {
    init_tracing();
    Harness::start(&SchedulerConfig::default(), CoreOptions::default())
}

fn single(name: &str, priority: Priority) -> JobDefinition {
    JobDefinitionBuilder::new(name)
        .priority(priority)
        .with_task("A", task("echo a", &[]))
        .build()
}

fn users() -> Vec<UserEntry> {
    vec![
        UserEntry {
            name: "alice".into(),
            password: "wonderland".into(),
            admin: false,
        },
        UserEntry {
            name: "root".into(),
            password: "toor".into(),
            admin: true,
        },
    ]
}

#[tokio::test]
async fn unconnected_session_is_denied_before_anything_else() -> TestResult {
    let h = harness();
    let session = h.frontend.open_session();

    let empty = JobDefinitionBuilder::new("empty").build();
    let err = h.frontend.submit(session, &empty).await.unwrap_err();
    assert!(matches!(err, SchedulerError::AccessDenied));

    assert!(matches!(
        h.frontend.get_result(session, JobId(1)).await,
        Err(SchedulerError::AccessDenied)
    ));
    assert!(matches!(h.frontend.stats(session), Err(SchedulerError::AccessDenied)));
    assert!(!h.frontend.core_pause(session).await);
    h.stop().await;
    Ok(())
}

#[tokio::test]
async fn connecting_twice_is_refused() -> TestResult {
    let h = harness();
    let session = h.connect(UserIdentification::user("alice"));

    let err = h
        .frontend
        .connect(session, UserIdentification::user("alice"))
        .unwrap_err();
    assert!(matches!(err, SchedulerError::AlreadyConnected));
    assert!(h.frontend.is_connected(session));
    h.stop().await;
    Ok(())
}

#[tokio::test]
async fn disconnect_twice_is_denied() -> TestResult {
    let h = harness();
    let session = h.connect(UserIdentification::user("alice"));

    h.frontend.disconnect(session)?;
    assert!(!h.frontend.is_connected(session));
    assert!(matches!(
        h.frontend.disconnect(session),
        Err(SchedulerError::AccessDenied)
    ));
    h.stop().await;
    Ok(())
}

#[tokio::test]
async fn empty_and_malformed_jobs_are_rejected() -> TestResult {
    let h = harness();
    let session = h.connect(UserIdentification::user("alice"));

    let empty = JobDefinitionBuilder::new("empty").build();
    let err = h.frontend.submit(session, &empty).await.unwrap_err();
    assert!(matches!(err, SchedulerError::Validation(_)));

    let cyclic = JobDefinitionBuilder::new("cyclic")
        .with_task("A", task("a", &["B"]))
        .with_task("B", task("b", &["A"]))
        .build();
    let err = h.frontend.submit(session, &cyclic).await.unwrap_err();
    assert!(matches!(err, SchedulerError::Validation(ref msg) if msg.contains("cycle")));

    assert_eq!(h.frontend.tracked_jobs(), 0);
    assert_eq!(h.frontend.stats(session)?.submitted(), 0);
    h.stop().await;
    Ok(())
}

#[tokio::test]
async fn privileged_priorities_need_an_administrator() -> TestResult {
    let h = harness();
    let user = h.connect(UserIdentification::user("alice"));
    let admin = h.connect(UserIdentification::admin("root"));

    for priority in [Priority::Idle, Priority::High, Priority::Highest] {
        let err = h
            .frontend
            .submit(user, &single("urgent", priority))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::PermissionDenied(_)), "{priority}");
    }
    for priority in [Priority::Lowest, Priority::Low, Priority::Normal] {
        h.frontend.submit(user, &single("plain", priority)).await?;
    }
    h.frontend.submit(admin, &single("urgent", Priority::Highest)).await?;
    h.stop().await;
    Ok(())
}

#[tokio::test]
async fn privileged_tiers_follow_the_configuration() -> TestResult {
    init_tracing();
    let raw = RawSchedulerConfig {
        scheduler: gridsched::config::SchedulerSection {
            privileged_priorities: vec![Priority::Highest],
            ..Default::default()
        },
        ..Default::default()
    };
    let cfg = SchedulerConfig::try_from(raw)?;
    let h = Harness::start(&cfg, CoreOptions::default());
    let user = h.connect(UserIdentification::user("alice"));

    h.frontend.submit(user, &single("high", Priority::High)).await?;
    h.frontend.submit(user, &single("idle", Priority::Idle)).await?;
    assert!(h.frontend.submit(user, &single("top", Priority::Highest)).await.is_err());
    h.stop().await;
    Ok(())
}

#[tokio::test]
async fn only_owners_and_administrators_act_on_a_job() -> TestResult {
    let h = harness();
    let (_observer, mut events) = h.observe().await;
    h.backend.script("A", FakeStep::Hold);
    let alice = h.connect(UserIdentification::user("alice"));
    let bob = h.connect(UserIdentification::user("bob"));
    let root = h.connect(UserIdentification::admin("root"));

    let id = h.frontend.submit(alice, &single("mine", Priority::Normal)).await?;
    wait_for(&mut events, |e| matches!(e, SchedulerEvent::TaskPendingToRunning(_))).await;

    assert!(matches!(
        h.frontend.pause_job(bob, id).await,
        Err(SchedulerError::PermissionDenied(_))
    ));
    assert!(matches!(
        h.frontend.kill_job(bob, id).await,
        Err(SchedulerError::PermissionDenied(_))
    ));
    assert!(matches!(
        h.frontend.get_result(bob, JobId(99)).await,
        Err(SchedulerError::NotFound(JobId(99)))
    ));

    assert!(h.frontend.pause_job(alice, id).await?);
    assert!(h.frontend.resume_job(root, id).await?);
    assert!(h.frontend.change_priority(alice, id, Priority::Low).await?);
    assert!(matches!(
        h.frontend.change_priority(alice, id, Priority::High).await,
        Err(SchedulerError::PermissionDenied(_))
    ));
    assert!(h.frontend.change_priority(root, id, Priority::High).await?);

    assert!(h.frontend.kill_job(root, id).await?);
    wait_for_job_end(&mut events, id).await;
    assert_eq!(h.frontend.tracked_jobs(), 0);
    h.stop().await;
    Ok(())
}

#[tokio::test]
async fn result_is_none_while_running_then_handed_out_once() -> TestResult {
    let h = harness();
    let (_observer, mut events) = h.observe().await;
    let session = h.connect(UserIdentification::user("alice"));

    h.backend.script("A", FakeStep::Hold);
    let held = h.frontend.submit(session, &single("held", Priority::Normal)).await?;
    wait_for(&mut events, |e| {
        matches!(e, SchedulerEvent::TaskPendingToRunning(ev) if ev.task.job == held)
    })
    .await;
    assert_eq!(h.frontend.get_result(session, held).await?, None);

    let quick = h.frontend.submit(session, &fan_out_definition()).await?;
    let end = wait_for_job_end(&mut events, quick).await;
    assert!(matches!(&end, SchedulerEvent::JobRunningToFinished(job) if job.status == JobStatus::Finished));

    let result = h
        .frontend
        .get_result(session, quick)
        .await?
        .ok_or("finished job should have a result")?;
    assert_eq!(result.results.len(), 3);
    assert_eq!(result.get("C").and_then(|r| r.value.as_deref()), Some("C"));

    assert!(matches!(
        h.frontend.get_result(session, quick).await,
        Err(SchedulerError::NotFound(_))
    ));
    assert_eq!(h.frontend.tracked_jobs(), 1);

    let stats = h.frontend.stats(session)?;
    assert_eq!(stats.submitted(), 2);
    assert_eq!(stats.finished_jobs, 1);
    assert!(stats.finished_tasks >= 3);
    assert!(stats.started_at.is_some());
    h.stop().await;
    Ok(())
}

#[tokio::test]
async fn remove_job_purges_terminal_jobs_only() -> TestResult {
    let h = harness();
    let (_observer, mut events) = h.observe().await;
    let session = h.connect(UserIdentification::user("alice"));

    let id = h.frontend.submit(session, &single("quick", Priority::Normal)).await?;
    wait_for_job_end(&mut events, id).await;

    assert!(h.frontend.remove_job(session, id).await?);
    assert!(matches!(
        h.frontend.remove_job(session, id).await,
        Err(SchedulerError::NotFound(_))
    ));
    wait_for(&mut events, |e| matches!(e, SchedulerEvent::JobRemoved(job) if job.id == id)).await;
    h.stop().await;
    Ok(())
}

#[tokio::test]
async fn non_admin_control_orders_are_refused() -> TestResult {
    let h = harness();
    let user = h.connect(UserIdentification::user("alice"));
    let admin = h.connect(UserIdentification::admin("root"));

    assert!(!h.frontend.core_pause(user).await);
    assert!(!h.frontend.core_kill(user).await);

    assert!(h.frontend.core_pause(admin).await);
    assert!(!h.frontend.core_pause(admin).await);
    assert!(h.frontend.core_immediate_pause(admin).await);
    assert!(h.frontend.core_resume(admin).await);
    assert!(h.frontend.core_stop(admin).await);

    // Stopped: submissions are refused and nothing is tracked.
    let err = h
        .frontend
        .submit(user, &single("late", Priority::Normal))
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Unavailable(_)));
    assert_eq!(h.frontend.tracked_jobs(), 0);

    assert!(h.frontend.core_start(admin).await);
    assert!(h.frontend.core_shutdown(admin).await);
    h.stop().await;
    Ok(())
}

#[tokio::test]
async fn killing_the_scheduler_drops_every_ownership_record() -> TestResult {
    let h = harness();
    let user = h.connect(UserIdentification::user("alice"));
    let admin = h.connect(UserIdentification::admin("root"));
    let (_observer, mut events) = h.observe().await;

    h.backend.script("A", FakeStep::Hold);
    h.frontend.submit(user, &single("held", Priority::Normal)).await?;
    h.frontend.submit(user, &single("queued", Priority::Normal)).await?;
    assert_eq!(h.frontend.tracked_jobs(), 2);

    assert!(h.frontend.core_kill(admin).await);
    wait_for(&mut events, |e| {
        matches!(e, SchedulerEvent::Scheduler(SchedulerStatusEvent::Killed))
    })
    .await;
    assert_eq!(h.frontend.tracked_jobs(), 0);
    h.stop().await;
    Ok(())
}

#[tokio::test]
async fn listeners_get_a_snapshot_and_stale_ones_lose_their_identity() -> TestResult {
    let h = harness();
    let user = h.connect(UserIdentification::user("alice"));
    h.backend.script("A", FakeStep::Hold);
    let id = h.frontend.submit(user, &single("held", Priority::Normal)).await?;

    let stale = h.connect(UserIdentification::user("bob"));
    let snapshot = h.frontend.add_listener(stale, Box::new(FailingListener)).await?;
    assert_eq!(snapshot.jobs.len(), 1);
    assert_eq!(snapshot.jobs[0].id, id);
    assert_eq!(h.frontend.listener_count(), 1);

    let (_observer, mut events) = h.observe().await;
    h.frontend.pause_job(user, id).await?;
    wait_for(&mut events, |e| matches!(e, SchedulerEvent::JobPaused(_))).await;

    assert_eq!(h.frontend.listener_count(), 1);
    assert!(!h.frontend.is_connected(stale));
    assert!(h.frontend.is_connected(user));
    h.stop().await;
    Ok(())
}

#[tokio::test]
async fn unconnected_session_cannot_listen() -> TestResult {
    let h = harness();
    let session = h.frontend.open_session();
    let result = h.frontend.add_listener(session, Box::new(FailingListener)).await;
    assert!(matches!(result, Err(SchedulerError::AccessDenied)));
    h.stop().await;
    Ok(())
}

#[tokio::test]
async fn job_listing_follows_the_requested_order() -> TestResult {
    let h = harness();
    h.backend.script("A", FakeStep::Hold);
    h.backend.script("A", FakeStep::Hold);
    let session = h.connect(UserIdentification::admin("root"));

    let first = h.frontend.submit(session, &single("zeta", Priority::Low)).await?;
    let second = h.frontend.submit(session, &single("alpha", Priority::High)).await?;

    let by_name = h
        .frontend
        .jobs(session, JobComparator::new(JobSortKey::Name, SortOrder::Ascending))
        .await?;
    assert_eq!(by_name.iter().map(|j| j.id).collect::<Vec<_>>(), vec![second, first]);

    let by_id_desc = h
        .frontend
        .jobs(session, JobComparator::new(JobSortKey::Id, SortOrder::Descending))
        .await?;
    assert_eq!(by_id_desc.iter().map(|j| j.id).collect::<Vec<_>>(), vec![second, first]);
    h.stop().await;
    Ok(())
}

#[tokio::test]
async fn credentials_are_checked_against_configured_users() -> TestResult {
    init_tracing();
    let raw = RawSchedulerConfig {
        user: users(),
        ..Default::default()
    };
    let cfg = SchedulerConfig::try_from(raw)?;
    let h = Harness::start(&cfg, CoreOptions::default());

    let session = h.frontend.open_session();
    let err = h
        .frontend
        .connect_with_credentials(session, &Credentials::new("alice", "nope"))
        .unwrap_err();
    assert!(matches!(err, SchedulerError::AccessDenied));
    assert!(!h.frontend.is_connected(session));

    let identity = h
        .frontend
        .connect_with_credentials(session, &Credentials::new("root", "toor"))?;
    assert!(identity.admin);
    assert_eq!(h.frontend.identity(session)?, UserIdentification::admin("root"));
    h.stop().await;
    Ok(())
}

#[test]
fn configured_users_authenticate_without_leaking_passwords() {
    let users = ConfiguredUsers::new(users());
    assert_eq!(users.len(), 2);

    let alice = users
        .authenticate(&Credentials::new("alice", "wonderland"))
        .unwrap();
    assert!(!alice.admin);
    assert!(users.authenticate(&Credentials::new("mallory", "x")).is_err());

    let rendered = format!("{:?}", Credentials::new("alice", "wonderland"));
    assert!(!rendered.contains("wonderland"));
}

// tests/store_recovery.rs

use std::error::Error;
use std::fs;

use gridsched::config::{StoreKind, StoreSection};
use gridsched::engine::{CoreOptions, CoreRuntime, SchedulerControl};
use gridsched::model::{JobId, JobStatus, TaskEnd, TaskId, TaskStatus};
use gridsched::store::{open_store, FileStore, JobStore, MemoryStore};
use gridsched_test_utils::builders::{build_job, build_job_for, fan_out_definition};

type TestResult = Result<(), Box<dyn Error>>;

const A: TaskId = TaskId(1001);
const B: TaskId = TaskId(1002);

#[test]
fn file_store_round_trips_jobs() -> TestResult {
    let dir = tempfile::tempdir()?;
    let mut store = FileStore::open(dir.path().join("jobs"))?;

    let mut job = build_job_for(&fan_out_definition(), 1, "alice");
    job.start();
    job.start_task(A, "node-1")?;
    job.terminate_task(A, TaskEnd::Finished)?;
    store.save(&job)?;
    store.save(&build_job(&fan_out_definition(), 2))?;

    assert!(store.path_of(JobId(1)).exists());
    let loaded = store.load_all()?;
    assert_eq!(loaded.iter().map(|j| j.id).collect::<Vec<_>>(), vec![JobId(1), JobId(2)]);

    let first = &loaded[0];
    assert_eq!(first.owner, "alice");
    assert_eq!(first.status(), JobStatus::Stalled);
    assert_eq!(first.counters(), job.counters());
    assert_eq!(first.task(A).map(|t| t.status), Some(TaskStatus::Finished));
    assert_eq!(first.task(A).and_then(|t| t.host.clone()), Some("node-1".into()));
    Ok(())
}

#[test]
fn file_store_remove_is_idempotent() -> TestResult {
    let dir = tempfile::tempdir()?;
    let mut store = FileStore::open(dir.path())?;
    store.save(&build_job(&fan_out_definition(), 3))?;

    store.remove(JobId(3))?;
    store.remove(JobId(3))?;
    assert!(store.load_all()?.is_empty());
    Ok(())
}

#[test]
fn unreadable_files_are_skipped() -> TestResult {
    let dir = tempfile::tempdir()?;
    let mut store = FileStore::open(dir.path())?;
    store.save(&build_job(&fan_out_definition(), 1))?;
    fs::write(dir.path().join("2.json"), "{ not json")?;
    fs::write(dir.path().join("notes.txt"), "ignored")?;

    let loaded = store.load_all()?;
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, JobId(1));
    Ok(())
}

#[test]
fn memory_store_clones_share_contents() -> TestResult {
    let store = MemoryStore::new();
    let mut writer = store.clone();
    writer.save(&build_job(&fan_out_definition(), 1))?;

    assert_eq!(store.len(), 1);
    assert!(store.get(JobId(1)).is_some());
    writer.remove(JobId(1))?;
    assert!(store.is_empty());
    Ok(())
}

#[test]
fn open_store_follows_the_configuration() -> TestResult {
    let dir = tempfile::tempdir()?;
    let section = StoreSection {
        kind: StoreKind::File,
        path: dir.path().join("nested/jobs"),
    };
    let mut store = open_store(&section)?;
    store.save(&build_job(&fan_out_definition(), 1))?;
    assert!(dir.path().join("nested/jobs/1.json").exists());

    let memory = open_store(&StoreSection::default())?;
    assert!(memory.load_all()?.is_empty());
    Ok(())
}

#[test]
fn recovered_jobs_are_rescheduled_from_where_they_stopped() -> TestResult {
    let dir = tempfile::tempdir()?;
    let mut store = FileStore::open(dir.path())?;

    let mut job = build_job(&fan_out_definition(), 1);
    job.start();
    job.start_task(A, "node")?;
    job.terminate_task(A, TaskEnd::Finished)?;
    job.start_task(B, "node")?;
    store.save(&job)?;

    let mut finished = build_job(&fan_out_definition(), 2);
    finished.kill();
    store.save(&finished)?;

    let mut core = CoreRuntime::with_default_policy(CoreOptions::default());
    assert_eq!(core.recover(store.load_all()?), 2);
    core.control(SchedulerControl::Start);
    let step = core.finish_step();

    let recovered = core.job(JobId(1)).ok_or("job 1 missing")?;
    assert_eq!(recovered.status(), JobStatus::Stalled);
    assert_eq!(recovered.task(B).map(|t| t.status), Some(TaskStatus::Pending));
    assert_eq!(recovered.counters().running, 0);

    let acquired: Vec<TaskId> = step
        .commands
        .iter()
        .filter_map(|c| match c {
            gridsched::engine::CoreCommand::Acquire(l) => Some(l.task),
            _ => None,
        })
        .collect();
    assert_eq!(acquired, vec![B, TaskId(1003)]);

    assert_eq!(core.job(JobId(2)).map(|j| j.status()), Some(JobStatus::Killed));
    Ok(())
}

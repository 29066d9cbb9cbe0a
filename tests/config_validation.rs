// tests/config_validation.rs

use std::io::Write;

use tempfile::NamedTempFile;

use gridsched::config::{
    load_and_validate, load_job, load_or_default, parse_job, validate_job, StoreKind,
};
use gridsched::errors::SchedulerError;
use gridsched::model::{JobType, Priority};
use gridsched_test_utils::builders::{task, JobDefinitionBuilder, TaskDefinitionBuilder};

fn temp_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn job_file_is_parsed_with_defaults() {
    let file = temp_file(
        r#"
[job]
name = "render"
priority = "low"
cancel_on_error = true
type = "parameter_sweeping"
project = "films"

[task.A]
cmd = "echo A"
precious_result = true

[task.B]
cmd = "echo B"
after = ["A"]
max_executions = 3

[task.B.pre_script]
source = "test -d /tmp"
"#,
    );

    let def = load_job(file.path()).unwrap();
    assert_eq!(def.name, "render");
    assert_eq!(def.priority, Priority::Low);
    assert!(def.cancel_on_error);
    assert_eq!(def.job_type, JobType::ParameterSweeping);
    assert_eq!(def.project, "films");

    let a = &def.tasks["A"];
    assert!(a.precious_result);
    assert_eq!(a.max_executions, 1);
    assert_eq!(a.max_executions_on_failure, 2);

    let b = &def.tasks["B"];
    assert_eq!(b.after, vec!["A".to_string()]);
    assert_eq!(b.max_executions, 3);
    let pre = b.pre_script.as_ref().unwrap();
    assert_eq!(pre.language, "sh");
    assert_eq!(pre.source, "test -d /tmp");
}

#[test]
fn dag_cycle_returns_structured_error() {
    let result = parse_job(
        r#"
[task.A]
cmd = "echo A"
after = ["B"]

[task.B]
cmd = "echo B"
after = ["A"]
"#,
    );

    match result {
        Err(SchedulerError::DagCycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains('A') || msg.contains('B'));
        }
        Err(e) => panic!("Expected DagCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn unknown_dependency_is_rejected() {
    let result = parse_job(
        r#"
[task.A]
cmd = "echo A"
after = ["NonExistent"]
"#,
    );

    match result {
        Err(SchedulerError::Validation(msg)) => {
            assert!(msg.contains("unknown dependency"));
            assert!(msg.contains("NonExistent"));
        }
        Err(e) => panic!("Expected Validation error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn self_dependency_is_rejected() {
    let def = JobDefinitionBuilder::new("selfish")
        .with_task("A", task("echo A", &["A"]))
        .build();
    let err = validate_job(&def, 1000).unwrap_err();
    assert!(matches!(err, SchedulerError::Validation(ref msg) if msg.contains("itself")));
}

#[test]
fn job_without_tasks_is_rejected() {
    let err = parse_job("[job]\nname = \"empty\"\n").unwrap_err();
    assert!(matches!(err, SchedulerError::Validation(ref msg) if msg.contains("at least one task")));
}

#[test]
fn zero_budgets_and_empty_commands_are_rejected() {
    let zero = JobDefinitionBuilder::new("zero")
        .with_task("A", TaskDefinitionBuilder::new("true").max_executions(0).build())
        .build();
    assert!(validate_job(&zero, 1000).unwrap_err().is_validation());

    let blank = JobDefinitionBuilder::new("blank")
        .with_task("A", task("   ", &[]))
        .build();
    assert!(validate_job(&blank, 1000).unwrap_err().is_validation());
}

#[test]
fn branch_section_is_parsed() {
    let def = parse_job(
        r#"
[task.check]
cmd = "echo ok"

[task.check.branch]
script = { source = "test \"$GRIDSCHED_RESULT\" = ok" }
if = "deploy"
else = "report"

[task.deploy]
cmd = "echo deploy"
after = ["check"]

[task.report]
cmd = "echo report"
after = ["check"]
"#,
    )
    .unwrap();

    let branch = def.tasks["check"].branch.as_ref().unwrap();
    assert_eq!(branch.if_target, "deploy");
    assert_eq!(branch.else_target, "report");
    assert_eq!(branch.script.language, "sh");
    assert!(def.tasks["deploy"].branch.is_none());
}

#[test]
fn malformed_branches_are_rejected() {
    let branching = |if_target: &str, else_target: &str| {
        JobDefinitionBuilder::new("branching")
            .with_task(
                "check",
                TaskDefinitionBuilder::new("true")
                    .branch("true", if_target, else_target)
                    .build(),
            )
            .with_task("deploy", task("true", &["check"]))
            .with_task("report", task("true", &["check"]))
            .with_task("loose", task("true", &[]))
    };

    assert!(validate_job(&branching("deploy", "report").build(), 1000).is_ok());

    let err = validate_job(&branching("deploy", "deploy").build(), 1000).unwrap_err();
    assert!(matches!(err, SchedulerError::Validation(ref msg) if msg.contains("both sides")));

    let err = validate_job(&branching("deploy", "missing").build(), 1000).unwrap_err();
    assert!(matches!(err, SchedulerError::Validation(ref msg) if msg.contains("unknown task 'missing'")));

    let err = validate_job(&branching("loose", "report").build(), 1000).unwrap_err();
    assert!(matches!(err, SchedulerError::Validation(ref msg) if msg.contains("'loose' must list 'check'")));

    let err = validate_job(&branching("check", "report").build(), 1000).unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn task_count_is_bounded_by_the_job_factor() {
    let mut builder = JobDefinitionBuilder::new("wide");
    for i in 0..10 {
        builder = builder.with_task(&format!("t{i}"), task("true", &[]));
    }
    let def = builder.build();

    assert!(validate_job(&def, 11).is_ok());
    let err = validate_job(&def, 10).unwrap_err();
    assert!(matches!(err, SchedulerError::Validation(ref msg) if msg.contains("at most 9")));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let err = parse_job("[task.A\ncmd = ").unwrap_err();
    assert!(matches!(err, SchedulerError::Toml(_)));
}

#[test]
fn scheduler_config_is_loaded_and_validated() {
    let file = temp_file(
        r#"
[scheduler]
job_factor = 100
restart_base_delay_ms = 200
restart_max_delay_ms = 5000
privileged_priorities = ["highest"]

[store]
kind = "file"
path = "/tmp/gridsched-jobs"

[[user]]
name = "root"
password = "toor"
admin = true
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.scheduler.job_factor, 100);
    assert_eq!(cfg.scheduler.restart_base_delay_ms, 200);
    assert_eq!(cfg.scheduler.privileged_priorities, vec![Priority::Highest]);
    assert!(cfg.scheduler.start_on_boot);
    assert_eq!(cfg.store.kind, StoreKind::File);
    assert_eq!(cfg.user.len(), 1);
    assert!(cfg.user[0].admin);
}

#[test]
fn invalid_scheduler_settings_are_config_errors() {
    let cases = [
        "[scheduler]\njob_factor = 1\n",
        "[scheduler]\nchannel_capacity = 0\n",
        "[scheduler]\nrestart_base_delay_ms = 100\nrestart_max_delay_ms = 10\n",
        "[[user]]\nname = \"a\"\npassword = \"x\"\n[[user]]\nname = \"a\"\npassword = \"y\"\n",
        "[[user]]\nname = \" \"\npassword = \"x\"\n",
    ];
    for contents in cases {
        let file = temp_file(contents);
        let err = load_and_validate(file.path()).unwrap_err();
        assert!(matches!(err, SchedulerError::Config(_)), "{contents}: {err:?}");
    }
}

#[test]
fn missing_config_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_or_default(dir.path().join("Scheduler.toml")).unwrap();
    assert_eq!(cfg.scheduler.job_factor, 1000);
    assert_eq!(cfg.store.kind, StoreKind::Memory);
    assert!(cfg.user.is_empty());
}

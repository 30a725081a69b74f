mod common;
use crate::common::{REQUEST_ID, StepBuilder, init_tracing, run_once};

use std::fs;
use std::time::Duration;

use dagnode::NodeError;
use dagnode::exec::publish_output;
use dagnode::node::{Node, NodeIds};
use dagnode::types::NodeStatus;

#[tokio::test]
async fn successful_command_finishes_without_error() {
    init_tracing();
    let logs = tempfile::tempdir().unwrap();
    let node = Node::new(StepBuilder::cmd("ok", "true").build());

    run_once(&node, logs.path()).await.unwrap();

    assert_eq!(node.status(), NodeStatus::Success);
    assert!(node.error().is_none());
    let state = node.state();
    assert!(state.started_at.is_some());
    assert!(state.finished_at.is_some());
    assert!(node.log().unwrap().exists());
}

#[tokio::test]
async fn non_zero_exit_is_recorded_as_error() {
    init_tracing();
    let logs = tempfile::tempdir().unwrap();
    let node = Node::new(StepBuilder::cmd("bad", "sh -c 'exit 3'").build());

    let err = run_once(&node, logs.path()).await.unwrap_err();

    assert!(matches!(err, NodeError::Exited { code: 3 }), "{err:?}");
    assert!(matches!(node.error(), Some(NodeError::Exited { code: 3 })));
    assert_eq!(node.status(), NodeStatus::Error);
}

#[tokio::test]
async fn missing_program_is_a_spawn_error() {
    init_tracing();
    let logs = tempfile::tempdir().unwrap();
    let node = Node::new(StepBuilder::command("ghost", "/nonexistent/dagnode-ghost", &[]).build());

    let err = run_once(&node, logs.path()).await.unwrap_err();

    assert!(matches!(err, NodeError::Spawn { .. }), "{err:?}");
    assert_eq!(node.status(), NodeStatus::Error);
}

#[tokio::test]
async fn log_file_receives_stdout_and_stderr() {
    init_tracing();
    let logs = tempfile::tempdir().unwrap();
    let node = Node::new(
        StepBuilder::command("both", "sh", &["-c", "echo to-out; echo to-err 1>&2"]).build(),
    );

    run_once(&node, logs.path()).await.unwrap();

    let log = fs::read_to_string(node.log().unwrap()).unwrap();
    assert!(log.contains("to-out"), "{log}");
    assert!(log.contains("to-err"), "{log}");
}

#[tokio::test]
async fn log_file_name_follows_naming_convention() {
    init_tracing();
    let logs = tempfile::tempdir().unwrap();
    let node = Node::new(StepBuilder::cmd("my step", "true").build());

    run_once(&node, logs.path()).await.unwrap();

    let log = node.log().unwrap();
    assert_eq!(log.parent().unwrap(), logs.path());
    let file = log.file_name().unwrap().to_string_lossy().into_owned();
    assert!(file.starts_with("my_step."), "{file}");
    assert!(file.ends_with(".01234567.log"), "{file}");
    // my_step.YYYYMMDD.HH:MM:SS.mmm.01234567.log
    let stamp = &file["my_step.".len()..file.len() - ".01234567.log".len()];
    assert_eq!(stamp.len(), "20060102.15:04:05.000".len(), "{stamp}");
}

#[tokio::test]
async fn stdout_file_gets_a_copy_of_stdout_only() {
    init_tracing();
    let logs = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let node = Node::new(
        StepBuilder::command("tee", "sh", &["-c", "echo hello; echo noise 1>&2"])
            .dir(work.path())
            .stdout("out.txt")
            .build(),
    );

    run_once(&node, logs.path()).await.unwrap();

    assert_eq!(fs::read_to_string(work.path().join("out.txt")).unwrap(), "hello\n");
    let log = fs::read_to_string(node.log().unwrap()).unwrap();
    assert!(log.contains("hello") && log.contains("noise"), "{log}");
}

#[tokio::test]
async fn step_env_is_merged_into_inherited_env() {
    init_tracing();
    let logs = tempfile::tempdir().unwrap();
    let node = Node::new(
        StepBuilder::command("env", "sh", &["-c", r#"echo "$DAGNODE_IT_GREETING:${PATH:+path}""#])
            .env("DAGNODE_IT_GREETING", "hi")
            .build(),
    );

    run_once(&node, logs.path()).await.unwrap();

    let log = fs::read_to_string(node.log().unwrap()).unwrap();
    assert_eq!(log.trim(), "hi:path");
}

#[tokio::test]
async fn process_runs_in_step_dir() {
    init_tracing();
    let logs = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let node = Node::new(StepBuilder::cmd("pwd", "touch here.txt").dir(work.path()).build());

    run_once(&node, logs.path()).await.unwrap();

    assert!(work.path().join("here.txt").exists());
}

#[tokio::test]
async fn command_line_is_expanded_when_executed() {
    init_tracing();
    let logs = tempfile::tempdir().unwrap();
    let node = Node::new(StepBuilder::cmd("late", "echo $DAGNODE_IT_LATE_VALUE").build());

    // Published after the node was built.
    publish_output("DAGNODE_IT_LATE_VALUE", "bound-late");
    run_once(&node, logs.path()).await.unwrap();

    let log = fs::read_to_string(node.log().unwrap()).unwrap();
    assert_eq!(log.trim(), "bound-late");
}

#[tokio::test]
async fn inline_script_runs_after_configured_args_and_is_removed() {
    init_tracing();
    let logs = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    // With `-e` as a prefix argument the script stops at `false`.
    let mut step = StepBuilder::script("script", "false\necho unreachable\n")
        .dir(work.path())
        .build();
    step.args = vec!["-e".to_string()];
    let node = Node::new(step);

    let err = run_once(&node, logs.path()).await.unwrap_err();

    assert!(matches!(err, NodeError::Exited { code: 1 }), "{err:?}");
    let log = fs::read_to_string(node.log().unwrap()).unwrap();
    assert!(!log.contains("unreachable"), "{log}");
    assert_eq!(fs::read_dir(work.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn setup_failure_sets_error_status_without_spawning() {
    init_tracing();
    let logs = tempfile::tempdir().unwrap();
    let missing = logs.path().join("does-not-exist");
    let node = Node::new(StepBuilder::cmd("s", "true").build());

    node.set_status(NodeStatus::Running);
    let err = node.setup(&missing, REQUEST_ID).await.unwrap_err();

    assert!(matches!(err, NodeError::Setup { what: "log file", .. }), "{err:?}");
    assert_eq!(node.status(), NodeStatus::Error);
    assert!(node.error().is_some());
    node.teardown().await.unwrap();
}

#[tokio::test]
async fn setup_is_rejected_until_previous_attempt_is_torn_down() {
    init_tracing();
    let logs = tempfile::tempdir().unwrap();
    let node = Node::new(StepBuilder::cmd("twice", "true").build());

    node.setup(logs.path(), REQUEST_ID).await.unwrap();
    let err = node.setup(logs.path(), REQUEST_ID).await.unwrap_err();
    assert!(matches!(err, NodeError::AttemptInProgress));

    node.teardown().await.unwrap();
    node.setup(logs.path(), REQUEST_ID).await.unwrap();
    node.teardown().await.unwrap();
}

#[tokio::test]
async fn retried_attempts_get_distinct_log_files() {
    init_tracing();
    let logs = tempfile::tempdir().unwrap();
    let node = Node::new(StepBuilder::cmd("again", "echo run").build());

    run_once(&node, logs.path()).await.unwrap();
    let first = node.log().unwrap();

    node.clear_state();
    assert_eq!(node.status(), NodeStatus::NotStarted);
    tokio::time::sleep(Duration::from_millis(5)).await;

    run_once(&node, logs.path()).await.unwrap();
    let second = node.log().unwrap();

    assert_ne!(first, second);
    assert!(first.exists() && second.exists());
    assert_eq!(node.status(), NodeStatus::Success);
}

#[tokio::test]
async fn counters_survive_clear_state_but_not_reset() {
    let node = Node::new(StepBuilder::cmd("c", "true").build());
    node.inc_retry_count();
    node.inc_done_count();
    node.inc_done_count();

    node.clear_state();
    assert_eq!(node.retry_count(), 1);
    assert_eq!(node.done_count(), 2);

    node.reset();
    assert_eq!(node.retry_count(), 0);
    assert_eq!(node.done_count(), 0);
}

#[test]
fn init_assigns_an_id_once() {
    let ids = NodeIds::new();
    let a = Node::new(StepBuilder::cmd("a", "true").build());
    let b = Node::new(StepBuilder::cmd("b", "true").build());

    assert_eq!(a.id(), None);
    let id_a = a.init(&ids);
    let id_b = b.init(&ids);

    assert_eq!(a.init(&ids), id_a);
    assert_eq!(a.id(), Some(id_a));
    assert!(id_b > id_a);
}

#[test]
fn snapshot_reports_state_and_command() {
    let node = Node::new(StepBuilder::command("snap", "echo", &["a", "b"]).build());
    node.set_status(NodeStatus::Skipped);

    let snap = node.snapshot();
    assert_eq!(snap.name, "snap");
    assert_eq!(snap.status, NodeStatus::Skipped);
    assert_eq!(snap.command, "echo a b");
    assert!(snap.error.is_none());
}

// Tests for worker fan-in and the run orchestration

use std::path::Path;
use std::time::{Duration, Instant};

use turbotests::commands::{RunOptions, run_tests};
use turbotests::config::WorkerConfig;
use turbotests::error::{ConfigError, Error};
use turbotests::notification::Notification;
use turbotests::report::FormatterRegistry;
use turbotests::reporter::{FormatterSpec, Reporter};
use turbotests::state::Example;
use turbotests::worker::{GroupBy, Multiplexer, Shutdown, WorkerEvent, WorkerOptions, collect};

fn passed(id: &str) -> WorkerEvent {
    WorkerEvent::Notification(Notification::ExamplePassed(Example::passed(
        id,
        id,
        Duration::ZERO,
    )))
}

fn failed(id: &str) -> WorkerEvent {
    WorkerEvent::Notification(Notification::ExampleFailed(Example::failed(
        id,
        id,
        "boom",
        Duration::ZERO,
    )))
}

fn exited(success: bool, stopped: bool) -> WorkerEvent {
    WorkerEvent::Exited {
        success,
        code: Some(if success { 0 } else { 1 }),
        stopped,
    }
}

#[tokio::test]
async fn test_collect_keeps_per_worker_order() {
    // Arrange
    let mut mux = Multiplexer::new();
    let one = mux.channel(1);
    let two = mux.channel(2);
    for event in [passed("1a"), passed("1b"), WorkerEvent::Closed, exited(true, false)] {
        assert!(one.send(event));
    }
    for event in [passed("2a"), passed("2b"), WorkerEvent::Closed, exited(true, false)] {
        assert!(two.send(event));
    }
    drop(one);
    drop(two);
    let mut reporter = Reporter::new(Instant::now());
    let shutdown = Shutdown::new();

    // Act
    let outcome = collect(&mut mux, &mut reporter, &shutdown)
        .await
        .expect("collect");

    // Assert
    let ids: Vec<&str> = reporter.examples().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids.len(), 4);
    let position = |id: &str| ids.iter().position(|x| *x == id).expect("recorded");
    assert!(position("1a") < position("1b"));
    assert!(position("2a") < position("2b"));
    assert!(outcome.all_succeeded());
    assert_eq!(outcome.exits.len(), 2);
    assert!(!outcome.fail_fast_triggered);
}

#[tokio::test]
async fn test_fail_fast_requests_shutdown_and_keeps_trailing_events() {
    // Arrange
    let mut mux = Multiplexer::new();
    let worker = mux.channel(1);
    for event in [
        failed("a"),
        passed("b"),
        WorkerEvent::Closed,
        exited(false, true),
    ] {
        worker.send(event);
    }
    drop(worker);
    let mut reporter = Reporter::new(Instant::now()).with_fail_fast(Some(1));
    let shutdown = Shutdown::new();
    let stop_signal = shutdown.subscribe();

    // Act
    let outcome = collect(&mut mux, &mut reporter, &shutdown)
        .await
        .expect("collect");

    // Assert
    assert!(outcome.fail_fast_triggered);
    assert!(shutdown.is_requested());
    assert!(*stop_signal.borrow());
    assert_eq!(reporter.examples().len(), 2);
    // a worker stopped on request does not count as a failed worker
    assert!(outcome.all_succeeded());
}

#[tokio::test]
async fn test_missing_close_marker_is_a_communication_failure() {
    // Arrange
    let mut mux = Multiplexer::new();
    let worker = mux.channel(3);
    worker.send(passed("a"));
    worker.send(exited(false, false));
    drop(worker);
    let mut reporter = Reporter::new(Instant::now());

    // Act
    let err = collect(&mut mux, &mut reporter, &Shutdown::new())
        .await
        .expect_err("communication failure");

    // Assert
    assert!(matches!(err, Error::WorkerCommunication { worker: 3, .. }));
}

#[tokio::test]
async fn test_failed_stream_is_fatal() {
    // Arrange
    let mut mux = Multiplexer::new();
    let worker = mux.channel(2);
    worker.send(WorkerEvent::Failed("malformed protocol line".into()));
    drop(worker);
    let mut reporter = Reporter::new(Instant::now());

    // Act
    let err = collect(&mut mux, &mut reporter, &Shutdown::new())
        .await
        .expect_err("fatal");

    // Assert
    match err {
        Error::WorkerCommunication { worker, reason } => {
            assert_eq!(worker, 2);
            assert!(reason.contains("malformed"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_duplicate_example_across_workers_is_fatal() {
    // Arrange
    let mut mux = Multiplexer::new();
    let one = mux.channel(1);
    let two = mux.channel(2);
    one.send(passed("same"));
    two.send(passed("same"));
    drop(one);
    drop(two);
    let mut reporter = Reporter::new(Instant::now());

    // Act
    let err = collect(&mut mux, &mut reporter, &Shutdown::new())
        .await
        .expect_err("duplicate");

    // Assert
    assert!(matches!(err, Error::DuplicateExample(ref id) if id == "same"));
}

#[tokio::test]
async fn test_first_seed_event_wins() {
    // Arrange
    let mut mux = Multiplexer::new();
    let worker = mux.channel(1);
    worker.send(WorkerEvent::Seed {
        seed: "11".into(),
        used: true,
    });
    worker.send(WorkerEvent::Seed {
        seed: "22".into(),
        used: true,
    });
    worker.send(WorkerEvent::Closed);
    worker.send(exited(true, false));
    drop(worker);
    let mut reporter = Reporter::new(Instant::now());

    // Act
    let outcome = collect(&mut mux, &mut reporter, &Shutdown::new())
        .await
        .expect("collect");

    // Assert
    let seed = outcome.seed.expect("seed");
    assert_eq!(seed.seed, "11");
    assert!(seed.used);
}

// Real worker processes: `cat` replays protocol fixtures written as test files

fn write_fixture(dir: &Path, name: &str, lines: &[&str]) {
    std::fs::write(dir.join(name), format!("{}\n", lines.join("\n"))).expect("write fixture");
}

fn example_line(kind: &str, id: &str) -> String {
    format!(
        r#"{{"type":"{}","example":{{"id":"{}","description":"{}","location":"./{}:1","run_time":0.01}}}}"#,
        kind, id, id, id
    )
}

fn cat_options(dir: &Path, processes: usize, output: &Path) -> RunOptions {
    RunOptions {
        formatters: vec![FormatterSpec::new("json").with_output(output.to_string_lossy())],
        paths: vec![dir.to_path_buf()],
        processes,
        group_by: GroupBy::Found,
        runtime_log: None,
        pattern: None,
        exclude_pattern: None,
        fail_fast: None,
        file_suffix: "_spec.rows".into(),
        worker: WorkerOptions::default(),
        worker_config: WorkerConfig {
            command: vec!["cat".into()],
            format_args: Vec::new(),
            env_var: "TEST_ENV_NUMBER".into(),
        },
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_run_merges_every_worker_into_one_report() {
    // Arrange
    let dir = tempfile::tempdir().expect("temp dir");
    let specs = dir.path().join("spec");
    std::fs::create_dir(&specs).expect("mkdir");
    let pass_a = example_line("example_passed", "a");
    let fail_b = example_line("example_failed", "b");
    let pass_c = example_line("example_passed", "c");
    write_fixture(
        &specs,
        "one_spec.rows",
        &[&pass_a, &fail_b, r#"{"type":"load_summary","load_time":0.5}"#, r#"{"type":"close"}"#],
    );
    write_fixture(&specs, "two_spec.rows", &["plain output", &pass_c, r#"{"type":"close"}"#]);
    let report_path = dir.path().join("report.json");
    let options = cat_options(&specs, 2, &report_path);

    // Act
    let report = run_tests(&options, &FormatterRegistry::with_builtins())
        .await
        .expect("run");

    // Assert
    assert_eq!(report.summary.total, 3);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.load_time, Duration::from_millis(500));
    assert!(!report.success());
    assert_eq!(report.exit_code(), 1);
    assert!(report.workers.all_succeeded());

    let document: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).expect("read report"))
            .expect("json report");
    assert_eq!(document["summary"]["example_count"], 3);
    assert_eq!(document["summary"]["failure_count"], 1);
}

#[cfg(unix)]
#[tokio::test]
async fn test_run_without_close_marker_fails() {
    // Arrange
    let dir = tempfile::tempdir().expect("temp dir");
    let pass_a = example_line("example_passed", "a");
    write_fixture(dir.path(), "cut_spec.rows", &[&pass_a]);
    let options = cat_options(dir.path(), 1, &dir.path().join("out.json"));

    // Act
    let err = run_tests(&options, &FormatterRegistry::with_builtins())
        .await
        .expect_err("communication failure");

    // Assert
    assert!(matches!(err, Error::WorkerCommunication { worker: 1, .. }));
}

#[tokio::test]
async fn test_unknown_formatter_aborts_before_spawning() {
    // Arrange
    let dir = tempfile::tempdir().expect("temp dir");
    write_fixture(dir.path(), "a_spec.rows", &[r#"{"type":"close"}"#]);
    let mut options = cat_options(dir.path(), 1, &dir.path().join("out.json"));
    options.formatters = vec![FormatterSpec::new("html").with_output("-")];
    options.worker_config.command = vec!["definitely-not-a-real-binary".into()];

    // Act
    let err = run_tests(&options, &FormatterRegistry::with_builtins())
        .await
        .expect_err("config error");

    // Assert
    assert!(matches!(
        err,
        Error::Config(ConfigError::UnknownFormatter(ref name, _)) if name == "html"
    ));
}

#[tokio::test]
async fn test_missing_worker_binary_is_reported() {
    // Arrange
    let dir = tempfile::tempdir().expect("temp dir");
    write_fixture(dir.path(), "a_spec.rows", &[r#"{"type":"close"}"#]);
    let mut options = cat_options(dir.path(), 1, &dir.path().join("out.json"));
    options.worker_config.command = vec!["definitely-not-a-real-binary".into()];

    // Act
    let err = run_tests(&options, &FormatterRegistry::with_builtins())
        .await
        .expect_err("spawn failure");

    // Assert
    assert!(matches!(err, Error::WorkerCommunication { worker: 1, .. }));
}

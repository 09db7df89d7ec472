//! Exercises the process runner against real system binaries.

use processor::runner::{run, CommandSpec, OutcomeKind};
use std::time::{Duration, Instant};

const GENEROUS: Duration = Duration::from_secs(10);

fn sh(script: &str, time_limit: Duration) -> CommandSpec {
    CommandSpec::new(
        "sh".to_string(),
        vec!["-c".to_string(), script.to_string()],
        time_limit,
    )
}

#[tokio::test]
async fn completed_run_captures_stdout() {
    let outcome = run(&sh("echo hello", GENEROUS)).await;
    assert_eq!(outcome.kind, OutcomeKind::Completed);
    assert_eq!(outcome.stdout, "hello\n");
    assert_eq!(outcome.stderr, "");
    assert_eq!(outcome.exit_code, Some(0));
}

#[tokio::test]
async fn nonzero_exit_is_reported() {
    let outcome = run(&sh("exit 3", GENEROUS)).await;
    assert_eq!(outcome.kind, OutcomeKind::NonZeroExit);
    assert_eq!(outcome.exit_code, Some(3));
    assert_eq!(outcome.error_message(), "process exited with code 3");
}

#[tokio::test]
async fn stderr_fails_a_zero_exit_run() {
    let outcome = run(&sh("echo oops >&2", GENEROUS)).await;
    assert_eq!(outcome.kind, OutcomeKind::NonZeroExit);
    assert_eq!(outcome.exit_code, Some(0));
    assert!(outcome.error_message().contains("oops"));
}

#[tokio::test]
async fn whitespace_only_stderr_still_completes() {
    let outcome = run(&sh("echo ok; echo '' >&2", GENEROUS)).await;
    assert_eq!(outcome.kind, OutcomeKind::Completed);
    assert_eq!(outcome.stdout, "ok\n");
}

#[tokio::test]
async fn missing_binary_is_spawn_failure() {
    let spec = CommandSpec::new(
        "/nonexistent/compiler".to_string(),
        vec!["main.cpp".to_string()],
        GENEROUS,
    );
    let outcome = run(&spec).await;
    assert_eq!(outcome.kind, OutcomeKind::SpawnFailure);
    assert_eq!(outcome.elapsed, Duration::ZERO);
    assert!(outcome
        .error_message()
        .contains("failed to spawn /nonexistent/compiler"));
}

#[tokio::test]
async fn timeout_kills_the_child() {
    let limit = Duration::from_millis(300);
    let started = Instant::now();
    let outcome = run(&sh("sleep 30", limit)).await;
    assert_eq!(outcome.kind, OutcomeKind::TimedOut);
    // run() must come back shortly after the limit, not after the sleep.
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(outcome.elapsed >= limit);
    assert!(outcome.error_message().contains("time limit exceeded"));
}

#[tokio::test]
async fn grandchildren_die_with_the_group() {
    // The background sleep inherits the pipes; unless the whole group is
    // killed it would keep stdout open long after the shell is gone.
    let started = Instant::now();
    let outcome = run(&sh("sleep 30 & wait", Duration::from_millis(300))).await;
    assert_eq!(outcome.kind, OutcomeKind::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn stdin_is_delivered() {
    let mut spec = CommandSpec::new("cat".to_string(), vec![], GENEROUS);
    spec.stdin = Some("data in\n".to_string());
    let outcome = run(&spec).await;
    assert_eq!(outcome.kind, OutcomeKind::Completed);
    assert_eq!(outcome.stdout, "data in\n");
}

#[tokio::test]
async fn large_output_does_not_deadlock() {
    // Way past any pipe buffer: 131072 lines of 9 bytes.
    let outcome = run(&sh("yes abcdefgh | head -n 131072", GENEROUS)).await;
    assert_eq!(outcome.kind, OutcomeKind::Completed);
    assert_eq!(outcome.stdout.len(), 131_072 * 9);
}

#[tokio::test]
async fn both_streams_flooded_are_captured_fully() {
    let outcome = run(&sh(
        "yes out | head -n 65536; yes err | head -n 65536 >&2",
        GENEROUS,
    ))
    .await;
    // stderr output marks the run as failed, but nothing may be lost.
    assert_eq!(outcome.kind, OutcomeKind::NonZeroExit);
    assert_eq!(outcome.stdout.len(), 65_536 * 4);
    assert_eq!(outcome.stderr.len(), 65_536 * 4);
}

#[tokio::test]
async fn partial_output_survives_a_timeout() {
    let outcome = run(&sh("echo started; sleep 30", Duration::from_millis(500))).await;
    assert_eq!(outcome.kind, OutcomeKind::TimedOut);
    assert_eq!(outcome.stdout, "started\n");
}

#[tokio::test]
async fn env_and_current_dir_are_applied() {
    let dir = tempfile::tempdir().unwrap();
    let mut spec = sh("pwd; printf '%s\\n' \"$GREETING\"", GENEROUS);
    spec.current_dir = Some(dir.path().to_path_buf());
    spec.env = vec![("GREETING".to_string(), "hi there".to_string())];
    let outcome = run(&spec).await;
    assert_eq!(outcome.kind, OutcomeKind::Completed);
    let canonical = dir.path().canonicalize().unwrap();
    assert_eq!(
        outcome.stdout,
        format!("{}\nhi there\n", canonical.display())
    );
}

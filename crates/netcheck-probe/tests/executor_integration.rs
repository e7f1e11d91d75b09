//! Integration tests for the subprocess probe executor.

use netcheck_probe::{CommandProbe, Probe, ProbeCommand, ProbeError, TIMEOUT_EXIT_CODE};
use std::time::Duration;

/// Test: stdout and stderr are both captured
#[tokio::test]
async fn test_output_captures_stdout_and_stderr() {
    let command = ProbeCommand::custom(
        "sh_test",
        "sh",
        vec!["-c".to_string(), "echo out; echo err 1>&2; exit 3".to_string()],
        10,
    );

    let result = CommandProbe::new()
        .execute(&command)
        .await
        .expect("execute failed");

    assert_eq!(result.exit_code, 3, "Nonzero exit is reported, not raised");
    assert!(result.output.contains("out"));
    assert!(result.output.contains("err"));
    assert!(!result.timed_out);
}

/// Test: a probe running past its deadline is killed and marked timed out
#[tokio::test]
async fn test_timeout_yields_sentinel() {
    let command = ProbeCommand::custom("sleep_test", "sleep", vec!["5".to_string()], 0);

    let started = std::time::Instant::now();
    let result = CommandProbe::with_grace(Duration::from_millis(200))
        .execute(&command)
        .await
        .expect("timeout is not an error");

    assert!(result.timed_out);
    assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
    assert!(started.elapsed() < Duration::from_secs(4), "Probe should be killed");
}

/// Test: a missing executable is a launch error
#[tokio::test]
async fn test_missing_binary_is_fatal() {
    let command = ProbeCommand::custom(
        "missing",
        "netcheck-definitely-not-installed",
        Vec::new(),
        5,
    );

    let err = CommandProbe::new()
        .execute(&command)
        .await
        .expect_err("missing binary must fail to launch");

    match err {
        ProbeError::Launch { program, .. } => {
            assert_eq!(program, "netcheck-definitely-not-installed")
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// Test: a probe killed by a signal is reported as signaled
#[cfg(unix)]
#[tokio::test]
async fn test_signal_termination_is_reported() {
    let command = ProbeCommand::custom(
        "kill_test",
        "sh",
        vec!["-c".to_string(), "kill -9 $$".to_string()],
        10,
    );

    let result = CommandProbe::new()
        .execute(&command)
        .await
        .expect("signal is not an error");

    assert!(result.signaled);
    assert_eq!(result.exit_code, -1);
    assert!(!result.timed_out);
    assert!(!result.passed());
}

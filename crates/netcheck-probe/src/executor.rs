//! Probe execution with timeouts.

use crate::command::{ProbeCommand, PROCESS_GRACE_SECS};
use crate::error::ProbeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

/// Exit code reported for a probe killed at its deadline.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Result of a probe execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Exit code (0 = success, [`TIMEOUT_EXIT_CODE`] on timeout, -1 when signaled).
    pub exit_code: i32,

    /// Captured stdout followed by stderr.
    pub output: String,

    /// Whether the probe was killed at its deadline.
    pub timed_out: bool,

    /// Whether the probe was terminated by a signal.
    pub signaled: bool,
}

impl ProbeResult {
    /// A completed probe with the given exit code and output.
    pub fn exited(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: output.into(),
            timed_out: false,
            signaled: false,
        }
    }

    /// A probe killed at its deadline.
    pub fn timeout() -> Self {
        Self {
            exit_code: TIMEOUT_EXIT_CODE,
            output: String::new(),
            timed_out: true,
            signaled: false,
        }
    }

    /// Whether this probe passed (exit code 0).
    pub fn passed(&self) -> bool {
        !self.timed_out && !self.signaled && self.exit_code == 0
    }
}

/// Capability to run a probe command.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Execute a probe and return its result.
    ///
    /// A nonzero exit is an ordinary result. Only a failure to launch the
    /// command is returned as an error.
    async fn execute(&self, command: &ProbeCommand) -> Result<ProbeResult, ProbeError>;
}

/// Probe backed by real subprocesses.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    /// Extra time granted beyond each command's own timeout.
    grace: Duration,
}

impl CommandProbe {
    pub fn new() -> Self {
        Self {
            grace: Duration::from_secs(PROCESS_GRACE_SECS),
        }
    }

    /// Override the grace period (mostly for tests).
    pub fn with_grace(grace: Duration) -> Self {
        Self { grace }
    }
}

impl Default for CommandProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Probe for CommandProbe {
    async fn execute(&self, command: &ProbeCommand) -> Result<ProbeResult, ProbeError> {
        let start = Instant::now();

        if command.program.is_empty() {
            return Err(ProbeError::EmptyCommand {
                name: command.name.clone(),
            });
        }

        debug!(probe = %command.name, command = %command, "Launching probe");

        let child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProbeError::Launch {
                program: command.program.clone(),
                source,
            })?;

        let deadline = Duration::from_secs(command.timeout_secs) + self.grace;
        let output = match tokio::time::timeout(deadline, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| ProbeError::Io {
                program: command.program.clone(),
                source,
            })?,
            Err(_) => {
                // Dropping the wait future drops the child, which kills it.
                debug!(
                    probe = %command.name,
                    timeout_secs = command.timeout_secs,
                    "Probe timed out"
                );
                return Ok(ProbeResult::timeout());
            }
        };

        let mut text = String::from_utf8_lossy(&output.stdout).to_string();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        let signaled = was_signaled(&output.status);
        let exit_code = output.status.code().unwrap_or(-1);

        debug!(
            probe = %command.name,
            exit_code,
            signaled,
            duration_ms = start.elapsed().as_millis() as u64,
            "Probe finished"
        );

        Ok(ProbeResult {
            exit_code,
            output: text,
            timed_out: false,
            signaled,
        })
    }
}

#[cfg(unix)]
fn was_signaled(status: &std::process::ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    status.signal().is_some()
}

#[cfg(not(unix))]
fn was_signaled(_status: &std::process::ExitStatus) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_result_passed() {
        assert!(ProbeResult::exited(0, "ok").passed());
        assert!(!ProbeResult::exited(7, "").passed());
    }

    #[test]
    fn test_probe_result_timeout() {
        let result = ProbeResult::timeout();
        assert!(result.timed_out);
        assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
        assert!(!result.passed());
    }

    #[tokio::test]
    async fn test_execute_simple_command() {
        let command = ProbeCommand::custom("echo_test", "echo", vec!["hello".to_string()], 10);

        let result = CommandProbe::new()
            .execute(&command)
            .await
            .expect("execute failed");
        assert!(result.passed());
        assert!(result.output.contains("hello"));
    }

    #[tokio::test]
    async fn test_execute_failing_command_is_not_an_error() {
        let command = ProbeCommand::custom("false_test", "false", Vec::new(), 10);

        let result = CommandProbe::new()
            .execute(&command)
            .await
            .expect("nonzero exit must not be an error");
        assert!(!result.passed());
        assert_ne!(result.exit_code, 0);
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn test_empty_program_rejected() {
        let command = ProbeCommand::custom("empty", "", Vec::new(), 10);
        let err = CommandProbe::new().execute(&command).await.unwrap_err();
        assert!(matches!(err, ProbeError::EmptyCommand { .. }));
    }
}

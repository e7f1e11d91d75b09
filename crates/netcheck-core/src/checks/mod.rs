//! Connectivity checks.
//!
//! Each check issues probes through [`Probe`], interprets the results into
//! verdicts on the [`Run`], and returns whether it fully passed. Ordinary
//! probe failures are verdicts; only a probe that cannot be launched is an
//! `Err`, which aborts the run.

mod clock;
mod endpoint;
mod network;
mod proxy;

pub use clock::should_check_time;
pub use proxy::PROXY_VARIABLES;

use netcheck_probe::{Probe, ProbeCommand, ProbeResult};

use crate::config::DiagnosticsConfig;
use crate::context::Run;
use crate::error::Result;
use crate::host::Host;

/// curl: peer certificate cannot be authenticated with known CA certificates.
pub const CURL_PEER_VERIFICATION_FAILED: i32 = 60;

/// curl: operation timed out.
pub const CURL_OPERATION_TIMEDOUT: i32 = 28;

/// ping: no reply received.
pub const PING_NO_REPLY: i32 = 1;

/// ping: other error, e.g. unknown host.
pub const PING_RESOLUTION_FAILED: i32 = 2;

/// dig: no reply from any configured server.
pub const DIG_NO_REPLY: i32 = 9;

/// The check battery, bound to its collaborators.
pub struct Diagnostics<'a> {
    probe: &'a dyn Probe,
    host: &'a dyn Host,
    config: &'a DiagnosticsConfig,
}

impl<'a> Diagnostics<'a> {
    pub fn new(probe: &'a dyn Probe, host: &'a dyn Host, config: &'a DiagnosticsConfig) -> Self {
        Self {
            probe,
            host,
            config,
        }
    }

    pub fn config(&self) -> &DiagnosticsConfig {
        self.config
    }

    /// Issue a probe, noting the command in the transcript.
    async fn run_probe(&self, run: &mut Run, command: ProbeCommand) -> Result<ProbeResult> {
        run.verdicts.probe(command.command_line());
        let result = self.probe.execute(&command).await?;
        tracing::debug!(
            probe = %command.name,
            exit_code = result.exit_code,
            timed_out = result.timed_out,
            "Probe result"
        );
        Ok(result)
    }
}

/// Whether a probe result means the request ran out of time.
fn timed_out(result: &ProbeResult) -> bool {
    result.timed_out || result.exit_code == CURL_OPERATION_TIMEDOUT
}

/// First non-empty line of probe output, for error context.
fn first_line(output: &str) -> &str {
    output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no output")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timed_out_covers_curl_code() {
        assert!(timed_out(&ProbeResult::timeout()));
        assert!(timed_out(&ProbeResult::exited(CURL_OPERATION_TIMEDOUT, "")));
        assert!(!timed_out(&ProbeResult::exited(7, "")));
    }

    #[test]
    fn test_first_line_skips_blank() {
        assert_eq!(first_line("\n  \ncurl: (7) Failed to connect\nmore"), "curl: (7) Failed to connect");
        assert_eq!(first_line(""), "no output");
    }
}

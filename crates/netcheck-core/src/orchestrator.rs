//! Diagnostic run orchestration.
//!
//! A run walks a small state machine:
//!
//! ```text
//! Start -> RunEndpointChecks -> (Summarize | RunTroubleshooting) -> Summarize -> Done
//! ```
//!
//! The endpoint checks always run. When they all pass, and full mode is
//! off, the run summarizes right away; otherwise the troubleshooting
//! battery runs first.

use chrono::Utc;
use netcheck_probe::{Probe, ProxyOverride};
use tracing::{info, warn};
use uuid::Uuid;

use crate::checks::{should_check_time, Diagnostics};
use crate::config::DiagnosticsConfig;
use crate::context::{InstallIdentity, Run, RunFlags};
use crate::error::Result;
use crate::host::Host;
use crate::report::RunReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    RunEndpointChecks,
    RunTroubleshooting,
    Summarize,
    Done,
}

/// Drives a diagnostic run against a probe and a host.
pub struct Orchestrator<'a> {
    diagnostics: Diagnostics<'a>,
    host: &'a dyn Host,
}

impl<'a> Orchestrator<'a> {
    pub fn new(probe: &'a dyn Probe, host: &'a dyn Host, config: &'a DiagnosticsConfig) -> Self {
        Self {
            diagnostics: Diagnostics::new(probe, host, config),
            host,
        }
    }

    /// Run the diagnostics to completion.
    ///
    /// Returns `Err` only when a probe cannot be launched at all.
    pub async fn run(&self, flags: RunFlags) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut run = Run::new(flags);
        let mut troubleshooting_ran = false;
        let mut phase = Phase::Start;

        info!(run_id = %run_id, full = flags.full, self_test = flags.self_test, "Starting network diagnostics");

        loop {
            phase = match phase {
                Phase::Start => {
                    self.detect_install(&mut run);
                    Phase::RunEndpointChecks
                }
                Phase::RunEndpointChecks => {
                    self.run_endpoint_checks(&mut run).await?;
                    if !flags.full && run.context.endpoints.all_passed() {
                        Phase::Summarize
                    } else {
                        Phase::RunTroubleshooting
                    }
                }
                Phase::RunTroubleshooting => {
                    troubleshooting_ran = true;
                    self.run_troubleshooting(&mut run).await?;
                    Phase::Summarize
                }
                Phase::Summarize => Phase::Done,
                Phase::Done => break,
            };
        }

        let report = RunReport::from_run(&run, run_id, started_at, troubleshooting_ran);
        info!(
            run_id = %run_id,
            passed = report.passed,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            actions = report.actions.len(),
            "Network diagnostics finished"
        );
        Ok(report)
    }

    fn detect_install(&self, run: &mut Run) {
        match InstallIdentity::detect(self.host, self.diagnostics.config()) {
            Ok(identity) => {
                info!(os_id = %identity.os_id, installed_release = ?identity.installed_release, "Recognized install");
                run.context.install = Some(identity);
            }
            Err(reason) => {
                warn!(reason = %reason, "Install detection failed, mirror check disabled");
                run.verdicts
                    .info(format!("Install detection failed: {}", reason));
            }
        }
    }

    async fn run_endpoint_checks(&self, run: &mut Run) -> Result<()> {
        let ambient = ProxyOverride::Ambient;
        let primary = self.diagnostics.check_primary(run, &ambient).await?;
        run.context.endpoints.primary = Some(primary);

        let mirror = self.diagnostics.check_mirror(run, &ambient).await?;
        run.context.endpoints.mirror = Some(mirror);

        let http = self.diagnostics.check_plain_http(run, &ambient).await?;
        run.context.endpoints.http = Some(http);
        Ok(())
    }

    async fn run_troubleshooting(&self, run: &mut Run) -> Result<()> {
        let d = &self.diagnostics;
        d.check_gateway(run).await?;
        d.check_dns(run).await?;
        d.check_wpad(run).await?;
        d.check_proxy_environment(run).await?;
        d.check_proxy_necessity(run).await?;
        d.check_captive_portal(run).await?;

        if should_check_time(&run.context) {
            d.check_system_time(run).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{FakeHost, ScriptedProbe};
    use netcheck_probe::ProbeResult;

    #[tokio::test]
    async fn test_healthy_run_skips_troubleshooting() {
        let config = DiagnosticsConfig::default();
        let probe = ScriptedProbe::new().with_default(ProbeResult::exited(0, "HTTP/1.1 200 OK\r\n\r\n42"));
        let host = FakeHost::new();

        let report = Orchestrator::new(&probe, &host, &config)
            .run(RunFlags::default())
            .await
            .expect("run");

        assert!(report.passed);
        assert!(!report.troubleshooting_ran);
        assert_eq!(probe.invocations().len(), 2, "Mirror skipped off-distribution");
        assert!(report
            .transcript
            .iter()
            .any(|e| e.to_string().contains("Install detection failed")));
    }

    #[tokio::test]
    async fn test_full_mode_always_troubleshoots() {
        let config = DiagnosticsConfig::default();
        let probe = ScriptedProbe::new().with_default(ProbeResult::exited(0, "HTTP/1.1 200 OK\r\n\r\n42"));
        let host = FakeHost::new();

        let report = Orchestrator::new(&probe, &host, &config)
            .run(RunFlags {
                full: true,
                self_test: false,
            })
            .await
            .expect("run");

        assert!(report.troubleshooting_ran);
        assert_eq!(probe.count("ping", &[]), 1);
        assert_eq!(probe.count("dig", &[]), 1);
    }
}

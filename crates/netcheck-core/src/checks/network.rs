//! Gateway, DNS and captive-portal checks.

use netcheck_probe::{ProbeCommand, ProxyOverride};

use super::{
    first_line, timed_out, Diagnostics, DIG_NO_REPLY, PING_NO_REPLY, PING_RESOLUTION_FAILED,
};
use crate::context::{FailureCategory, Run};
use crate::error::Result;
use crate::http::parse_response;

const CHECK_CONNECTIVITY: &str =
    "Check physical connectivity (cable or Wi-Fi association) and that this host has an IP address and a default route";

impl Diagnostics<'_> {
    /// Single ping to the default gateway alias.
    pub async fn check_gateway(&self, run: &mut Run) -> Result<bool> {
        run.verdicts.begin_check("Gateway");
        let host = &self.config.gateway_host;
        let command = ProbeCommand::ping(host, self.config.ping_wait_secs);
        let result = self.run_probe(run, command).await?;

        if result.passed() {
            run.verdicts.pass(format!("Gateway {} is reachable", host));
            return Ok(true);
        }

        match result.exit_code {
            PING_RESOLUTION_FAILED if !result.timed_out => {
                run.verdicts
                    .error(format!("Unable to resolve the gateway address {}", host));
                run.verdicts.action(CHECK_CONNECTIVITY);
            }
            PING_NO_REPLY => {
                run.verdicts.warning(format!(
                    "Gateway {} did not answer ping (some gateways drop ICMP)",
                    host
                ));
                run.verdicts.action(CHECK_CONNECTIVITY);
            }
            code => {
                run.verdicts.error(format!(
                    "Gateway check failed (exit code {}): {}",
                    code,
                    first_line(&result.output)
                ));
            }
        }
        Ok(false)
    }

    /// Bounded DNS query for the canonical host; only responsiveness matters.
    pub async fn check_dns(&self, run: &mut Run) -> Result<bool> {
        run.verdicts.begin_check("DNS");
        let host = self.config.canonical_host().to_string();
        let command = ProbeCommand::dns_query(&host, self.config.dns_timeout_secs);
        let result = self.run_probe(run, command).await?;

        if result.passed() {
            run.verdicts.pass(format!("DNS servers answered for {}", host));
            return Ok(true);
        }

        if !result.timed_out && result.exit_code == DIG_NO_REPLY {
            run.verdicts
                .error("No response from the configured DNS servers");
            run.verdicts.action(
                "Check the configured DNS servers (/etc/resolv.conf or your network manager)",
            );
            run.verdicts
                .action("Check whether your DNS provider is having an outage");
            return Ok(false);
        }

        run.verdicts.error(format!(
            "DNS query for {} failed (exit code {}): {}",
            host,
            result.exit_code,
            first_line(&result.output)
        ));
        run.context.failures.record(FailureCategory::Dns);
        run.verdicts.action("Check your DNS configuration");
        Ok(false)
    }

    /// Zero-content probe that captive portals intercept.
    pub async fn check_captive_portal(&self, run: &mut Run) -> Result<bool> {
        run.verdicts.begin_check("Captive portal");
        let url = self.config.captive_portal_url.clone();
        let command =
            ProbeCommand::http_fetch(&url, &ProxyOverride::Ambient, self.config.http_timeout_secs);
        let result = self.run_probe(run, command).await?;

        if timed_out(&result) {
            run.verdicts
                .error(format!("Captive portal probe to {} timed out", url));
            return Ok(false);
        }
        if result.exit_code != 0 {
            run.verdicts.error(format!(
                "Captive portal probe to {} failed (exit code {}): {}",
                url,
                result.exit_code,
                first_line(&result.output)
            ));
            return Ok(false);
        }

        let response = match parse_response(&result.output) {
            Ok(response) => response,
            Err(e) => {
                run.verdicts.error(format!(
                    "Unable to interpret captive portal probe response from {}: {}",
                    url, e
                ));
                return Ok(false);
            }
        };

        if response.status == 204 {
            run.verdicts.pass("No captive portal detected");
            return Ok(true);
        }
        if response.is_redirect() {
            let target = response
                .header("location")
                .map(|l| format!(" to {}", l))
                .unwrap_or_default();
            run.verdicts.action(format!(
                "Launch a web browser and log in: {} was redirected{}, likely to a captive portal",
                url, target
            ));
        } else if response.is_success() {
            run.verdicts.action(format!(
                "Launch a web browser and log in: the page at {} was substituted, likely by a captive portal",
                url
            ));
        } else {
            run.verdicts.error(format!(
                "Unexpected captive portal probe status from {}: {}",
                url,
                response.status_line()
            ));
        }
        Ok(false)
    }
}

//! Proxy checks: autoproxy discovery, proxy environment and proxy necessity.

use netcheck_probe::{ProbeCommand, ProxyOverride};

use super::{first_line, timed_out, Diagnostics};
use crate::context::{FailureCategory, Run};
use crate::error::Result;
use crate::http::parse_response;

/// Proxy environment variables and the protocol each one serves.
pub const PROXY_VARIABLES: &[(&str, FailureCategory)] = &[
    ("http_proxy", FailureCategory::Http),
    ("HTTP_PROXY", FailureCategory::Http),
    ("https_proxy", FailureCategory::Https),
    ("HTTPS_PROXY", FailureCategory::Https),
];

/// `https://` proxy URL rewritten to `http://`.
fn insecure_variant(url: &str) -> Option<String> {
    let (scheme, rest) = url.split_once("://")?;
    scheme
        .eq_ignore_ascii_case("https")
        .then(|| format!("http://{}", rest))
}

impl Diagnostics<'_> {
    /// WPAD lookup with any ambient proxy bypassed.
    pub async fn check_wpad(&self, run: &mut Run) -> Result<bool> {
        run.verdicts.begin_check("Autoproxy (WPAD)");
        let url = self.config.wpad_url.clone();
        let command =
            ProbeCommand::http_fetch(&url, &ProxyOverride::Bypass, self.config.http_timeout_secs);
        let result = self.run_probe(run, command).await?;

        if timed_out(&result) {
            run.verdicts
                .error(format!("Autoproxy lookup at {} timed out", url));
            return Ok(false);
        }
        if result.exit_code != 0 {
            run.verdicts
                .warning(format!("No autoproxy found at {}", url));
            return Ok(true);
        }

        let contact_admin = format!(
            "Contact your network administrator about the autoproxy server at {}",
            url
        );
        let response = match parse_response(&result.output) {
            Ok(response) => response,
            Err(e) => {
                run.verdicts.error(format!(
                    "Unable to interpret the autoproxy response from {}: {}",
                    url, e
                ));
                run.verdicts.action(contact_admin);
                return Ok(false);
            }
        };

        if !response.is_pac() {
            let found = response
                .content_type()
                .unwrap_or_else(|| "no Content-Type".to_string());
            run.verdicts.error(format!(
                "{} served {} instead of a proxy auto-config file",
                url, found
            ));
            run.verdicts.action(contact_admin);
            return Ok(false);
        }

        run.verdicts
            .pass(format!("Autoproxy configuration found at {}", url));
        self.check_pac_services(run).await
    }

    /// Local PAC resolution: cached PAC file plus the resolver services.
    async fn check_pac_services(&self, run: &mut Run) -> Result<bool> {
        let mut healthy = true;
        let pac_file = &self.config.pac_cache_file;
        let discovery = self.config.pac_services.first().cloned();

        let cached = self
            .host
            .read_file(pac_file)
            .map(|content| !content.trim().is_empty())
            .unwrap_or(false);
        if cached {
            run.verdicts
                .pass(format!("Cached PAC file {} is present", pac_file.display()));
        } else {
            healthy = false;
            run.verdicts.error(format!(
                "Cached PAC file {} is missing or empty",
                pac_file.display()
            ));
            if let Some(service) = &discovery {
                run.verdicts
                    .action(format!("Restart {0}: systemctl restart {0}", service));
            }
        }

        for service in &self.config.pac_services {
            let active = self
                .run_probe(
                    run,
                    ProbeCommand::service_active(service, self.config.service_timeout_secs),
                )
                .await?;
            if active.passed() {
                run.verdicts.pass(format!("{} is active", service));
                continue;
            }

            healthy = false;
            let state = self
                .run_probe(
                    run,
                    ProbeCommand::service_enabled(service, self.config.service_timeout_secs),
                )
                .await?;
            let masked = state.output.lines().any(|l| l.trim() == "masked");

            if masked {
                run.verdicts
                    .error(format!("{} is not active and is masked", service));
                run.verdicts.action(format!(
                    "Unmask and restart {0}: systemctl unmask {0} && systemctl restart {0}",
                    service
                ));
            } else {
                run.verdicts.error(format!("{} is not active", service));
                run.verdicts
                    .action(format!("Restart {0}: systemctl restart {0}", service));
            }
        }

        Ok(healthy)
    }

    /// Reachability of every proxy configured in the environment.
    pub async fn check_proxy_environment(&self, run: &mut Run) -> Result<bool> {
        run.verdicts.begin_check("Proxy environment");
        let mut healthy = true;

        for (name, _) in PROXY_VARIABLES {
            let Some(proxy) = self.host.env_var(name) else {
                continue;
            };
            run.verdicts.info(format!("{} is set to {}", name, proxy));

            let command = ProbeCommand::http_fetch(
                &proxy,
                &ProxyOverride::Bypass,
                self.config.http_timeout_secs,
            );
            let result = self.run_probe(run, command).await?;
            if result.passed() {
                run.verdicts
                    .pass(format!("Proxy {} from {} is reachable", proxy, name));
                continue;
            }

            healthy = false;
            if timed_out(&result) {
                run.verdicts.error(format!(
                    "Connection to proxy {} from {} timed out",
                    proxy, name
                ));
            } else {
                run.verdicts.error(format!(
                    "Unable to reach proxy {} from {} (exit code {}): {}",
                    proxy,
                    name,
                    result.exit_code,
                    first_line(&result.output)
                ));
            }

            let double_check = format!("Double-check the proxy setting in {}", name);
            let Some(variant) = insecure_variant(&proxy) else {
                run.verdicts.action(double_check);
                continue;
            };

            run.verdicts.warning(format!(
                "{} uses an https:// proxy URL, which is rarely correct",
                name
            ));
            let retry = ProxyOverride::Explicit(variant.clone());
            if self.check_primary(run, &retry).await? {
                run.verdicts.action(format!("Set {}={}", name, variant));
            } else {
                run.verdicts.action(double_check);
            }
        }

        for category in [FailureCategory::Http, FailureCategory::Https] {
            let names: Vec<&str> = PROXY_VARIABLES
                .iter()
                .filter(|(_, c)| *c == category)
                .map(|(n, _)| *n)
                .collect();
            let any_set = names.iter().any(|n| self.host.env_var(n).is_some());
            if any_set || !run.context.failures.has_failed(category) {
                continue;
            }
            if let Some(name) = names.first() {
                run.verdicts.action(format!(
                    "If your network requires a proxy for {} traffic, set {}",
                    category, name
                ));
            }
        }

        Ok(healthy)
    }

    /// Re-run failed endpoint checks (all of them in full mode) with the
    /// proxy bypassed. Verdicts come from the bypass path of each check.
    pub async fn check_proxy_necessity(&self, run: &mut Run) -> Result<()> {
        run.verdicts.begin_check("Proxy necessity");
        let full = run.context.flags.full;
        let outcomes = run.context.endpoints;
        let bypass = ProxyOverride::Bypass;

        if full || outcomes.primary == Some(false) {
            self.check_primary(run, &bypass).await?;
        }
        if full || outcomes.mirror == Some(false) {
            self.check_mirror(run, &bypass).await?;
        }
        if full || outcomes.http == Some(false) {
            self.check_plain_http(run, &bypass).await?;
        }
        Ok(())
    }
}

//! Release endpoint, mirror and plain-HTTP checks.

use netcheck_probe::{ProbeCommand, ProxyOverride};

use super::{first_line, timed_out, Diagnostics, CURL_PEER_VERIFICATION_FAILED};
use crate::context::{FailureCategory, NetworkTime, Run};
use crate::error::Result;
use crate::http::{parse_response, HttpResponse};

fn check_title(name: &str, proxy: &ProxyOverride) -> String {
    match proxy {
        ProxyOverride::Ambient => name.to_string(),
        other => format!("{} ({})", name, other),
    }
}

impl Diagnostics<'_> {
    /// Fetch `url` and apply the shared HTTP(S) interpretation rules.
    ///
    /// Returns the parsed response on success; every failure has already
    /// been recorded as verdicts when `None` is returned.
    async fn fetch(
        &self,
        run: &mut Run,
        url: &str,
        proxy: &ProxyOverride,
    ) -> Result<Option<HttpResponse>> {
        let command = ProbeCommand::http_fetch(url, proxy, self.config.http_timeout_secs);
        let result = self.run_probe(run, command).await?;

        if !result.timed_out && result.exit_code == CURL_PEER_VERIFICATION_FAILED {
            run.verdicts.error(format!(
                "Unable to verify the certificate trust chain for {}",
                url
            ));
            run.verdicts.action(format!(
                "Verify the certificate trust chain for {} (system CA certificates, TLS-inspecting proxies)",
                url
            ));
            run.verdicts.warning(format!(
                "Certificate verification failed for {}: something may be intercepting HTTPS traffic (man-in-the-middle)",
                url
            ));
            return Ok(None);
        }

        if timed_out(&result) {
            run.verdicts.error(format!("Connection to {} timed out", url));
            // curl's own timeout is a completed probe; only a killed one skips the registry.
            if !result.timed_out {
                self.record_url_failure(run, url);
            }
            return Ok(None);
        }

        if result.exit_code != 0 {
            run.verdicts.error(format!(
                "Unable to reach {} (exit code {}): {}",
                url,
                result.exit_code,
                first_line(&result.output)
            ));
            self.record_url_failure(run, url);
            return Ok(None);
        }

        let response = match parse_response(&result.output) {
            Ok(response) => response,
            Err(e) => {
                run.verdicts
                    .error(format!("Unexpected response from {}: {}", url, e));
                self.record_url_failure(run, url);
                return Ok(None);
            }
        };
        run.verdicts
            .info(format!("{} answered {}", url, response.status_line()));

        if run.context.network_time.is_none() {
            if let Some(network) = response.date() {
                run.verdicts.info(format!("Network time from {}: {}", url, network));
                run.context.network_time = Some(NetworkTime {
                    network,
                    local: self.host.now(),
                });
            }
        }

        if proxy.is_bypass() {
            run.verdicts.warning(format!(
                "Reaching {} succeeded with the proxy bypassed",
                url
            ));
            run.verdicts
                .action(format!("Check your proxy/noproxy config for {}", url));
        }

        Ok(Some(response))
    }

    fn record_url_failure(&self, run: &mut Run, url: &str) {
        if let Some(category) = FailureCategory::for_url(url) {
            run.context.failures.record(category);
        }
    }

    /// Fetch a version endpoint and extract its release number.
    async fn fetch_release(
        &self,
        run: &mut Run,
        url: &str,
        proxy: &ProxyOverride,
    ) -> Result<Option<u64>> {
        let Some(response) = self.fetch(run, url, proxy).await? else {
            return Ok(None);
        };

        match response.release() {
            Some(release) if response.is_success() => Ok(Some(release)),
            _ => {
                run.verdicts.error(format!(
                    "{} did not return a release number ({})",
                    url,
                    response.status_line()
                ));
                self.record_url_failure(run, url);
                Ok(None)
            }
        }
    }

    /// Canonical release endpoint; captures the latest release.
    pub async fn check_primary(&self, run: &mut Run, proxy: &ProxyOverride) -> Result<bool> {
        run.verdicts
            .begin_check(&check_title("Release endpoint", proxy));
        let url = self.config.release_url();

        let Some(release) = self.fetch_release(run, &url, proxy).await? else {
            return Ok(false);
        };

        run.context.latest_release = Some(release);
        run.verdicts
            .pass(format!("{} reports release {}", url, release));

        if let Some(installed) = run
            .context
            .install
            .as_ref()
            .and_then(|i| i.installed_release)
        {
            if installed < release {
                run.verdicts.info(format!(
                    "Installed release {} is older than the latest release {}",
                    installed, release
                ));
            }
        }
        Ok(true)
    }

    /// Configured mirror, compared against the canonical release.
    pub async fn check_mirror(&self, run: &mut Run, proxy: &ProxyOverride) -> Result<bool> {
        run.verdicts.begin_check(&check_title("Mirror", proxy));

        if !run.context.is_recognized_install() {
            run.verdicts
                .info("Not a recognized install, skipping mirror check");
            return Ok(true);
        }

        let mirror = self
            .host
            .read_file(&self.config.mirror_url_file)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        let Some(mirror) = mirror else {
            run.verdicts.info("No custom mirror configured");
            return Ok(true);
        };

        if self.config.is_canonical(&mirror) {
            run.verdicts
                .info("Configured mirror is the default content location");
            return Ok(true);
        }

        let url = self.config.version_url_for(&mirror);
        let Some(release) = self.fetch_release(run, &url, proxy).await? else {
            return Ok(false);
        };

        if let Some(latest) = run.context.latest_release {
            if latest != release {
                run.verdicts.warning(format!(
                    "Mirror {} reports release {} but the latest release is {}",
                    mirror, release, latest
                ));
            }
        }
        run.verdicts
            .pass(format!("Mirror {} reports release {}", mirror, release));
        Ok(true)
    }

    /// Plain-HTTP reference site; separates TLS trouble from no network at all.
    pub async fn check_plain_http(&self, run: &mut Run, proxy: &ProxyOverride) -> Result<bool> {
        run.verdicts
            .begin_check(&check_title("Plain HTTP", proxy));
        let url = self.config.http_reference_url.clone();

        match self.fetch(run, &url, proxy).await? {
            Some(response) => {
                run.verdicts.pass(format!(
                    "{} is reachable ({})",
                    url,
                    response.status_line()
                ));
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

//! End-to-end runs of the orchestrator against scripted probes.

use netcheck_core::fakes::{FakeHost, ScriptedProbe};
use netcheck_core::{
    DiagnosticError, DiagnosticsConfig, FailureCategory, Orchestrator, RunFlags, RunReport,
};
use netcheck_probe::{ProbeError, ProbeResult};

const MIRROR: &str = "https://mirror.example.net/update";

fn http_ok(body: &str) -> ProbeResult {
    ProbeResult::exited(
        0,
        format!("HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\n{}", body),
    )
}

fn http_ok_dated(date: &str, body: &str) -> ProbeResult {
    ProbeResult::exited(
        0,
        format!(
            "HTTP/1.1 200 OK\r\nDate: {}\r\nContent-Type: text/plain\r\n\r\n{}",
            date, body
        ),
    )
}

fn tls_failure() -> ProbeResult {
    ProbeResult::exited(
        60,
        "curl: (60) SSL certificate problem: unable to get local issuer certificate",
    )
}

fn installed_host(config: &DiagnosticsConfig) -> FakeHost {
    FakeHost::new()
        .with_file(&config.os_release_path, "NAME=\"Clear Linux OS\"\nID=clear-linux-os\n")
        .with_file(&config.release_file, "12340\n")
        .with_file(&config.mirror_url_file, MIRROR)
}

/// Healthy mirror and plain HTTP; the primary endpoint answers `primary`.
fn endpoints(config: &DiagnosticsConfig, primary: ProbeResult) -> ScriptedProbe {
    ScriptedProbe::new()
        .on("curl", &[config.release_url().as_str()], primary)
        .on("curl", &[config.version_url_for(MIRROR).as_str()], http_ok("12345"))
        .on("curl", &[config.http_reference_url.as_str()], http_ok("<html/>"))
}

async fn run(
    probe: &ScriptedProbe,
    host: &FakeHost,
    config: &DiagnosticsConfig,
    flags: RunFlags,
) -> RunReport {
    Orchestrator::new(probe, host, config)
        .run(flags)
        .await
        .expect("run completes")
}

#[tokio::test]
async fn test_healthy_run_checks_each_endpoint_once() {
    let config = DiagnosticsConfig::default();
    let probe = endpoints(&config, http_ok("12345"));
    let host = installed_host(&config);

    let report = run(&probe, &host, &config, RunFlags::default()).await;

    assert!(report.passed);
    assert!(!report.troubleshooting_ran);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.latest_release, Some(12345));
    assert_eq!(report.installed_release, Some(12340));

    assert_eq!(probe.invocations().len(), 3);
    assert_eq!(probe.count("curl", &[config.release_url().as_str()]), 1);
    assert_eq!(probe.count("curl", &[config.version_url_for(MIRROR).as_str()]), 1);
    assert_eq!(probe.count("curl", &[config.http_reference_url.as_str()]), 1);
    assert_eq!(probe.count("ping", &[]), 0);
}

#[tokio::test]
async fn test_tls_failure_verdicts() {
    let config = DiagnosticsConfig::default();
    let probe = endpoints(&config, tls_failure());
    let host = installed_host(&config);

    let report = run(&probe, &host, &config, RunFlags::default()).await;

    assert!(!report.passed);
    assert_eq!(report.exit_code(), 1);
    assert!(report.troubleshooting_ran);
    assert!(report.errors.iter().any(|e| e.contains("trust chain")));
    assert!(report
        .actions
        .iter()
        .any(|a| a.starts_with("Verify the certificate trust chain")));
    assert!(report.warnings.iter().any(|w| w.contains("man-in-the-middle")));
}

#[tokio::test]
async fn test_failed_primary_does_not_skip_other_endpoints() {
    let config = DiagnosticsConfig::default();
    let probe = endpoints(&config, tls_failure());
    let host = installed_host(&config);

    run(&probe, &host, &config, RunFlags::default()).await;

    let direct = |url: &str| {
        probe
            .invocations()
            .iter()
            .filter(|c| c.mentions(url) && !c.mentions("--noproxy"))
            .count()
    };
    assert_eq!(direct(&config.release_url()), 1);
    assert_eq!(direct(&config.version_url_for(MIRROR)), 1);
    assert_eq!(direct(&config.http_reference_url), 1);
}

#[tokio::test]
async fn test_curl_timeouts_recommend_proxy_settings() {
    let config = DiagnosticsConfig::default();
    let probe = ScriptedProbe::new()
        .on(
            "curl",
            &[],
            ProbeResult::exited(28, "curl: (28) Connection timed out after 10001 milliseconds"),
        )
        .on("ping", &[], ProbeResult::exited(0, "1 packets transmitted, 1 received"))
        .on("dig", &[], ProbeResult::exited(0, ";; ANSWER SECTION:"));
    let host = FakeHost::new();

    let report = run(&probe, &host, &config, RunFlags::default()).await;

    assert!(!report.passed);
    assert!(report.failure_counts.get(&FailureCategory::Https).copied().unwrap_or(0) >= 1);
    assert!(report.failure_counts.get(&FailureCategory::Http).copied().unwrap_or(0) >= 1);
    assert!(report
        .actions
        .contains(&"If your network requires a proxy for https traffic, set https_proxy".to_string()));
    assert!(report
        .actions
        .contains(&"If your network requires a proxy for http traffic, set http_proxy".to_string()));
}

#[tokio::test]
async fn test_repeated_messages_are_reported_once() {
    let config = DiagnosticsConfig::default();
    // Primary fails the same way with and without the proxy.
    let probe = endpoints(&config, tls_failure());
    let host = installed_host(&config);

    let report = run(&probe, &host, &config, RunFlags::default()).await;

    assert_eq!(
        probe.count("curl", &[config.release_url().as_str()]),
        2,
        "Original check plus the proxy-bypass retry"
    );
    let trust_errors = report
        .errors
        .iter()
        .filter(|e| e.contains("trust chain"))
        .count();
    assert_eq!(trust_errors, 1);
    let mitm_warnings = report
        .warnings
        .iter()
        .filter(|w| w.contains("man-in-the-middle"))
        .count();
    assert_eq!(mitm_warnings, 1);
}

#[tokio::test]
async fn test_release_and_network_time_captured() {
    let config = DiagnosticsConfig::default();
    let probe = endpoints(
        &config,
        http_ok_dated("Sun, 31 Dec 2023 23:59:30 GMT", "12345\n"),
    );
    let host = installed_host(&config);

    let report = run(&probe, &host, &config, RunFlags::default()).await;

    assert!(report.passed);
    assert_eq!(report.latest_release, Some(12345));
    assert!(report
        .transcript
        .iter()
        .any(|e| e.to_string().contains("Network time from") && e.to_string().contains("2023-12-31 23:59:30")));
}

/// HTTPS broken, plain HTTP answering with the given `Date` header.
async fn clock_scenario(date: &str) -> RunReport {
    let config = DiagnosticsConfig::default();
    let probe = ScriptedProbe::new()
        .on(
            "curl",
            &[config.release_url().as_str()],
            ProbeResult::exited(35, "curl: (35) SSL connect error"),
        )
        .on(
            "curl",
            &[config.http_reference_url.as_str()],
            http_ok_dated(date, "<html/>"),
        )
        .on("ping", &[], ProbeResult::exited(0, "1 packets transmitted, 1 received"))
        .on("dig", &[], ProbeResult::exited(0, ";; ANSWER SECTION:"));
    let host = FakeHost::new();

    run(&probe, &host, &config, RunFlags::default()).await
}

#[tokio::test]
async fn test_https_failure_with_http_success_checks_clock() {
    // Fake clock reads 2024-01-01 00:00:00 UTC, 130 seconds ahead.
    let report = clock_scenario("Sun, 31 Dec 2023 23:57:50 GMT").await;

    assert!(report
        .transcript
        .iter()
        .any(|e| e.to_string() == "== System time"));
    assert!(report
        .errors
        .iter()
        .any(|e| e.starts_with("System clock") && e.contains("2023-12-31 23:57:50 UTC")));
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("certificate validation")));
}

#[tokio::test]
async fn test_small_clock_skew_is_tolerated() {
    let report = clock_scenario("Sun, 31 Dec 2023 23:59:00 GMT").await;

    assert!(report
        .transcript
        .iter()
        .any(|e| e.to_string() == "== System time"));
    assert!(!report.errors.iter().any(|e| e.starts_with("System clock")));
}

#[tokio::test]
async fn test_self_test_forces_success() {
    let config = DiagnosticsConfig::default();
    let probe = ScriptedProbe::new();
    let host = FakeHost::new();

    let report = run(&probe, &host, &config, RunFlags::default()).await;
    assert!(!report.passed);
    assert_eq!(report.exit_code(), 1);

    let report = run(
        &probe,
        &host,
        &config,
        RunFlags {
            full: false,
            self_test: true,
        },
    )
    .await;
    assert!(!report.passed);
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn test_canonical_mirror_is_not_probed() {
    let config = DiagnosticsConfig::default();
    let probe = endpoints(&config, http_ok("12345"));
    let host = installed_host(&config).with_file(&config.mirror_url_file, &config.canonical_base_url);

    let report = run(&probe, &host, &config, RunFlags::default()).await;

    assert!(report.passed);
    assert_eq!(probe.count("curl", &[]), 2);
    assert_eq!(probe.count("curl", &[MIRROR]), 0);
}

#[tokio::test]
async fn test_missing_probe_binary_aborts_run() {
    let config = DiagnosticsConfig::default();
    let probe = ScriptedProbe::new().missing_program("curl");
    let host = FakeHost::new();

    let err = Orchestrator::new(&probe, &host, &config)
        .run(RunFlags::default())
        .await
        .expect_err("launch failure is fatal");

    assert!(matches!(
        err,
        DiagnosticError::Probe(ProbeError::Launch { ref program, .. }) if program == "curl"
    ));
    assert_eq!(probe.invocations().len(), 1, "Nothing runs after the abort");
}

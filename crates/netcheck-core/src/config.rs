//! Diagnostic configuration: endpoints, well-known files and timeouts.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Configuration for a diagnostic run.
///
/// Every field has a default, so a config file only needs the values it
/// wants to change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// `ID=` value in os-release identifying a supported install.
    pub distribution_id: String,

    /// os-release file used to detect the install identity.
    pub os_release_path: PathBuf,

    /// File holding the installed release number.
    pub release_file: PathBuf,

    /// File holding the install timestamp (seconds since the epoch).
    pub install_timestamp_file: PathBuf,

    /// File holding the configured mirror base URL, if any.
    pub mirror_url_file: PathBuf,

    /// Canonical content base URL.
    pub canonical_base_url: String,

    /// Path of the version endpoint below a base URL.
    pub version_path: String,

    /// Known-stable plain-HTTP site.
    pub http_reference_url: String,

    /// Endpoint answering 204 with no content when not behind a portal.
    pub captive_portal_url: String,

    /// Web Proxy Auto-Discovery URL.
    pub wpad_url: String,

    /// Host alias resolving to the default gateway.
    pub gateway_host: String,

    /// Locally cached PAC file written by the discovery service.
    pub pac_cache_file: PathBuf,

    /// Services that must be active for PAC based proxy resolution.
    pub pac_services: Vec<String>,

    /// Timeout for each HTTP probe.
    pub http_timeout_secs: u64,

    /// Wait for the gateway echo reply.
    pub ping_wait_secs: u64,

    /// Timeout for the DNS query.
    pub dns_timeout_secs: u64,

    /// Timeout for service manager queries.
    pub service_timeout_secs: u64,

    /// Allowed difference between local and network time.
    pub clock_tolerance_secs: i64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            distribution_id: "clear-linux-os".to_string(),
            os_release_path: PathBuf::from("/usr/lib/os-release"),
            release_file: PathBuf::from("/usr/share/clear/version"),
            install_timestamp_file: PathBuf::from("/usr/share/clear/versionstamp"),
            mirror_url_file: PathBuf::from("/etc/swupd/mirror_versionurl"),
            canonical_base_url: "https://cdn.download.clearlinux.org/update".to_string(),
            version_path: "version/latest".to_string(),
            http_reference_url: "http://example.com/".to_string(),
            captive_portal_url: "http://connectivitycheck.gstatic.com/generate_204".to_string(),
            wpad_url: "http://wpad/wpad.dat".to_string(),
            gateway_host: "_gateway".to_string(),
            pac_cache_file: PathBuf::from("/run/pacrunner/wpad.dat"),
            pac_services: vec!["pacdiscovery".to_string(), "pacrunner".to_string()],
            http_timeout_secs: 10,
            ping_wait_secs: 5,
            dns_timeout_secs: 5,
            service_timeout_secs: 5,
            clock_tolerance_secs: 120,
        }
    }
}

impl DiagnosticsConfig {
    /// Load a JSON config file; missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no check could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let urls = [
            ("canonical_base_url", &self.canonical_base_url),
            ("http_reference_url", &self.http_reference_url),
            ("captive_portal_url", &self.captive_portal_url),
            ("wpad_url", &self.wpad_url),
        ];
        for (field, url) in urls {
            if url.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", field)));
            }
            if url_host(url).is_none() {
                return Err(ConfigError::Invalid(format!("{} has no host: {}", field, url)));
            }
        }

        let timeouts = [
            ("http_timeout_secs", self.http_timeout_secs),
            ("ping_wait_secs", self.ping_wait_secs),
            ("dns_timeout_secs", self.dns_timeout_secs),
            ("service_timeout_secs", self.service_timeout_secs),
        ];
        for (field, value) in timeouts {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be positive", field)));
            }
        }

        if self.clock_tolerance_secs < 0 {
            return Err(ConfigError::Invalid(
                "clock_tolerance_secs must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Version endpoint of the canonical service.
    pub fn release_url(&self) -> String {
        version_url(&self.canonical_base_url, &self.version_path)
    }

    /// Version endpoint below an arbitrary base URL (e.g. a mirror).
    pub fn version_url_for(&self, base: &str) -> String {
        version_url(base, &self.version_path)
    }

    /// Hostname of the canonical service, used for the DNS check.
    pub fn canonical_host(&self) -> &str {
        url_host(&self.canonical_base_url).unwrap_or(&self.canonical_base_url)
    }

    /// Whether `base` names the canonical service.
    pub fn is_canonical(&self, base: &str) -> bool {
        normalize_base(base) == normalize_base(&self.canonical_base_url)
    }
}

fn version_url(base: &str, path: &str) -> String {
    format!("{}/{}", normalize_base(base), path.trim_start_matches('/'))
}

fn normalize_base(url: &str) -> &str {
    url.trim().trim_end_matches('/')
}

/// Host portion of an absolute URL, without userinfo or port.
pub fn url_host(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit('@').next()?;
    let host = if host_port.starts_with('[') {
        host_port.split(']').next().map(|h| h.trim_start_matches('['))?
    } else {
        host_port.split(':').next()?
    };
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Scheme of an absolute URL, lowercased.
pub fn url_scheme(url: &str) -> Option<String> {
    url.split_once("://")
        .map(|(scheme, _)| scheme.to_ascii_lowercase())
        .filter(|s| !s.is_empty())
}

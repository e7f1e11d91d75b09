//! Run state shared by the checks of a single diagnostic run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::config::{url_scheme, DiagnosticsConfig};
use crate::host::Host;
use crate::http::parse_release;
use crate::verdict::VerdictLog;

/// Failure categories tracked across the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    Https,
    Http,
    Dns,
}

impl FailureCategory {
    /// Category for requests to `url`, by scheme.
    pub fn for_url(url: &str) -> Option<Self> {
        match url_scheme(url)?.as_str() {
            "https" => Some(FailureCategory::Https),
            "http" => Some(FailureCategory::Http),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FailureCategory::Https => "https",
            FailureCategory::Http => "http",
            FailureCategory::Dns => "dns",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure counts per category. Never reset during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRegistry {
    counts: BTreeMap<FailureCategory, u32>,
}

impl FailureRegistry {
    pub fn record(&mut self, category: FailureCategory) {
        *self.counts.entry(category).or_insert(0) += 1;
    }

    pub fn count(&self, category: FailureCategory) -> u32 {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    pub fn has_failed(&self, category: FailureCategory) -> bool {
        self.count(category) > 0
    }

    pub fn counts(&self) -> &BTreeMap<FailureCategory, u32> {
        &self.counts
    }
}

/// Identity of a recognized distribution install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallIdentity {
    /// `ID=` from os-release.
    pub os_id: String,

    /// Installed release number, if the release file is readable.
    pub installed_release: Option<u64>,
}

impl InstallIdentity {
    /// Detect whether this host is a recognized install.
    ///
    /// Returns a human-readable reason when it is not.
    pub fn detect(host: &dyn Host, config: &DiagnosticsConfig) -> Result<Self, String> {
        let os_release = host.read_file(&config.os_release_path).ok_or_else(|| {
            format!("unable to read {}", config.os_release_path.display())
        })?;

        let os_id = os_release_field(&os_release, "ID")
            .ok_or_else(|| format!("no ID in {}", config.os_release_path.display()))?;

        if os_id != config.distribution_id {
            return Err(format!(
                "host is not a {} install (ID={})",
                config.distribution_id, os_id
            ));
        }

        let installed_release = host
            .read_file(&config.release_file)
            .and_then(|content| parse_release(&content));

        Ok(Self {
            os_id,
            installed_release,
        })
    }
}

/// Value of `key=` in os-release content, unquoted.
pub fn os_release_field(content: &str, key: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let (k, v) = line.trim().split_once('=')?;
        if k.trim() != key {
            return None;
        }
        let value = v.trim().trim_matches(|c| c == '"' || c == '\'').to_string();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

/// Network time paired with the local clock reading taken when it arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkTime {
    pub network: DateTime<Utc>,
    pub local: DateTime<Utc>,
}

impl NetworkTime {
    /// Local minus network time, in seconds (positive = local clock ahead).
    pub fn skew_secs(&self) -> i64 {
        (self.local - self.network).num_seconds()
    }
}

/// Runtime flags from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFlags {
    /// Run the complete battery regardless of the endpoint results.
    pub full: bool,

    /// Force a successful exit even when errors were recorded.
    pub self_test: bool,
}

/// Outcomes of the always-run endpoint checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointOutcomes {
    pub primary: Option<bool>,
    pub mirror: Option<bool>,
    pub http: Option<bool>,
}

impl EndpointOutcomes {
    /// Whether all three endpoint checks ran and passed.
    pub fn all_passed(&self) -> bool {
        self.primary == Some(true) && self.mirror == Some(true) && self.http == Some(true)
    }
}

/// State mutated by checks as they run.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub flags: RunFlags,

    /// `None` when the host is not a recognized install.
    pub install: Option<InstallIdentity>,

    /// Release reported by the canonical endpoint.
    pub latest_release: Option<u64>,

    /// First network time observed during the run.
    pub network_time: Option<NetworkTime>,

    pub failures: FailureRegistry,

    pub endpoints: EndpointOutcomes,
}

impl RunContext {
    pub fn new(flags: RunFlags) -> Self {
        Self {
            flags,
            ..Default::default()
        }
    }

    pub fn is_recognized_install(&self) -> bool {
        self.install.is_some()
    }
}

/// Everything a check reads and writes: run state plus the verdict log.
#[derive(Debug, Clone, Default)]
pub struct Run {
    pub context: RunContext,
    pub verdicts: VerdictLog,
}

impl Run {
    pub fn new(flags: RunFlags) -> Self {
        Self {
            context: RunContext::new(flags),
            verdicts: VerdictLog::new(),
        }
    }
}

//! In-memory host fake (testing only)
//!
//! `FakeHost` satisfies the [`Host`] contract from fixed tables: an
//! environment, a set of files and a frozen clock.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};

use crate::host::Host;

pub use netcheck_probe::fakes::ScriptedProbe;

/// Host with scripted environment, files and clock.
#[derive(Debug, Clone)]
pub struct FakeHost {
    env: HashMap<String, String>,
    files: HashMap<PathBuf, String>,
    now: DateTime<Utc>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeHost {
    /// Empty environment, no files, clock frozen at 2024-01-01T00:00:00Z.
    pub fn new() -> Self {
        Self {
            env: HashMap::new(),
            files: HashMap::new(),
            now: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    pub fn with_env(mut self, name: &str, value: &str) -> Self {
        self.env.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_file(mut self, path: impl AsRef<Path>, content: &str) -> Self {
        self.files.insert(path.as_ref().to_path_buf(), content.to_string());
        self
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}

impl Host for FakeHost {
    fn env_var(&self, name: &str) -> Option<String> {
        self.env.get(name).filter(|v| !v.trim().is_empty()).cloned()
    }

    fn read_file(&self, path: &Path) -> Option<String> {
        self.files.get(path).cloned()
    }

    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

//! Access to the local host: environment variables, files and the clock.

use chrono::{DateTime, Utc};
use std::path::Path;

/// Host facilities the checks read from.
pub trait Host: Send + Sync {
    /// Value of an environment variable; empty values count as unset.
    fn env_var(&self, name: &str) -> Option<String>;

    /// Contents of a file, or `None` if it cannot be read.
    fn read_file(&self, path: &Path) -> Option<String>;

    /// Current local clock reading.
    fn now(&self) -> DateTime<Utc>;
}

/// The real host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl Host for SystemHost {
    fn env_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    }

    fn read_file(&self, path: &Path) -> Option<String> {
        match std::fs::read_to_string(path) {
            Ok(content) => Some(content),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "File not readable");
                None
            }
        }
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

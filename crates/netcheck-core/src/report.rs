//! Final run report and its text rendering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::context::{FailureCategory, Run, RunFlags};
use crate::verdict::TranscriptEntry;

/// Exit code when no error was recorded, or self-test suppressed it.
pub const EXIT_PASS: i32 = 0;

/// Exit code when at least one error was recorded.
pub const EXIT_FAIL: i32 = 1;

/// Outcome of a complete diagnostic run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub flags: RunFlags,

    /// No error was recorded.
    pub passed: bool,

    /// Whether the troubleshooting battery ran after the endpoint checks.
    pub troubleshooting_ran: bool,

    pub latest_release: Option<u64>,
    pub installed_release: Option<u64>,

    pub actions: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,

    pub failure_counts: BTreeMap<FailureCategory, u32>,
    pub transcript: Vec<TranscriptEntry>,
}

impl RunReport {
    /// Build a report from a finished run.
    pub fn from_run(
        run: &Run,
        run_id: Uuid,
        started_at: DateTime<Utc>,
        troubleshooting_ran: bool,
    ) -> Self {
        Self {
            run_id,
            started_at,
            finished_at: Utc::now(),
            flags: run.context.flags,
            passed: run.verdicts.passed(),
            troubleshooting_ran,
            latest_release: run.context.latest_release,
            installed_release: run
                .context
                .install
                .as_ref()
                .and_then(|i| i.installed_release),
            actions: run.verdicts.actions().to_vec(),
            warnings: run.verdicts.warnings().to_vec(),
            errors: run.verdicts.errors().to_vec(),
            failure_counts: run.context.failures.counts().clone(),
            transcript: run.verdicts.transcript().to_vec(),
        }
    }

    /// Process exit code; self-test mode always succeeds.
    pub fn exit_code(&self) -> i32 {
        if self.passed || self.flags.self_test {
            EXIT_PASS
        } else {
            EXIT_FAIL
        }
    }

    /// Transcript followed by the summary: actions, warnings, errors, banner.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.transcript {
            out.push_str(&format!("{}\n", entry));
        }
        out.push('\n');

        render_section(&mut out, "Recommended actions", &self.actions);
        render_section(&mut out, "Warnings", &self.warnings);
        render_section(&mut out, "Errors", &self.errors);

        if self.passed {
            out.push_str("PASS: network connectivity looks healthy\n");
        } else {
            out.push_str(&format!(
                "FAIL: {} error(s) found\n",
                self.errors.len()
            ));
            if self.flags.self_test {
                out.push_str("(self-test mode: exiting successfully anyway)\n");
            }
        }
        out
    }
}

fn render_section(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("{}:\n", title));
    for item in items {
        out.push_str(&format!("  - {}\n", item));
    }
    out.push('\n');
}

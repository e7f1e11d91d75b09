//! Verdict aggregation.
//!
//! Every check reports through a [`VerdictLog`]. Warning, error and action
//! messages are deduplicated by exact text and keep first-seen order; the
//! narrative transcript keeps everything.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{error, info, warn};

/// Outcome of a single interpretation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Verdict {
    Pass(String),
    Warning(String),
    Error(String),
    Action(String),
}

impl Verdict {
    pub fn message(&self) -> &str {
        match self {
            Verdict::Pass(m) | Verdict::Warning(m) | Verdict::Error(m) | Verdict::Action(m) => m,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Verdict::Error(_))
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass(m) => write!(f, "PASS: {}", m),
            Verdict::Warning(m) => write!(f, "WARNING: {}", m),
            Verdict::Error(m) => write!(f, "ERROR: {}", m),
            Verdict::Action(m) => write!(f, "ACTION: {}", m),
        }
    }
}

/// One line of the run narrative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "text", rename_all = "snake_case")]
pub enum TranscriptEntry {
    /// A check started.
    Check(String),
    /// A probe command was issued.
    Probe(String),
    /// Informational detail.
    Info(String),
    /// A verdict was recorded.
    Verdict(Verdict),
}

impl fmt::Display for TranscriptEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptEntry::Check(name) => write!(f, "== {}", name),
            TranscriptEntry::Probe(cmd) => write!(f, "   $ {}", cmd),
            TranscriptEntry::Info(text) => write!(f, "   {}", text),
            TranscriptEntry::Verdict(v) => write!(f, "   {}", v),
        }
    }
}

/// Insertion-ordered set of messages.
#[derive(Debug, Clone, Default)]
pub struct MessageSet {
    items: Vec<String>,
    seen: HashSet<String>,
}

impl MessageSet {
    /// Insert `message`; returns `false` if it was already present.
    pub fn insert(&mut self, message: &str) -> bool {
        if self.seen.contains(message) {
            return false;
        }
        self.seen.insert(message.to_string());
        self.items.push(message.to_string());
        true
    }

    pub fn contains(&self, message: &str) -> bool {
        self.seen.contains(message)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.items.clone()
    }
}

/// Accumulates verdicts for a whole run.
#[derive(Debug, Clone, Default)]
pub struct VerdictLog {
    actions: MessageSet,
    warnings: MessageSet,
    errors: MessageSet,
    transcript: Vec<TranscriptEntry>,
}

impl VerdictLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a verdict, deduplicating non-pass messages.
    pub fn record(&mut self, verdict: Verdict) {
        match &verdict {
            Verdict::Pass(m) => {
                info!(verdict = "pass", "{}", m);
            }
            Verdict::Warning(m) => {
                if self.warnings.insert(m) {
                    warn!("{}", m);
                }
            }
            Verdict::Error(m) => {
                if self.errors.insert(m) {
                    error!("{}", m);
                }
            }
            Verdict::Action(m) => {
                if self.actions.insert(m) {
                    info!(verdict = "action", "{}", m);
                }
            }
        }
        self.transcript.push(TranscriptEntry::Verdict(verdict));
    }

    pub fn pass(&mut self, message: impl Into<String>) {
        self.record(Verdict::Pass(message.into()));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.record(Verdict::Warning(message.into()));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.record(Verdict::Error(message.into()));
    }

    pub fn action(&mut self, message: impl Into<String>) {
        self.record(Verdict::Action(message.into()));
    }

    /// Start a named check in the transcript.
    pub fn begin_check(&mut self, name: &str) {
        info!(check = name, "Running check");
        self.transcript.push(TranscriptEntry::Check(name.to_string()));
    }

    /// Note an issued probe command in the transcript.
    pub fn probe(&mut self, command_line: impl Into<String>) {
        self.transcript.push(TranscriptEntry::Probe(command_line.into()));
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.transcript.push(TranscriptEntry::Info(message));
    }

    /// Overall outcome: pass iff no error was ever recorded.
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn actions(&self) -> &MessageSet {
        &self.actions
    }

    pub fn warnings(&self) -> &MessageSet {
        &self.warnings
    }

    pub fn errors(&self) -> &MessageSet {
        &self.errors
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }
}

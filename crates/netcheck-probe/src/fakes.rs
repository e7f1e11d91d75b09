//! Scripted probe for tests
//!
//! `ScriptedProbe` answers probe commands from a table of rules instead of
//! launching processes, and records every invocation so tests can assert
//! which probes ran and how often.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::command::ProbeCommand;
use crate::error::ProbeError;
use crate::executor::{Probe, ProbeResult};

#[derive(Debug)]
struct Rule {
    program: String,
    needles: Vec<String>,
    responses: VecDeque<ProbeResult>,
}

impl Rule {
    fn matches(&self, command: &ProbeCommand) -> bool {
        self.program == command.program && self.needles.iter().all(|n| command.mentions(n))
    }

    /// Pops queued responses, repeating the last one forever.
    fn next_response(&mut self) -> ProbeResult {
        if self.responses.len() > 1 {
            self.responses.pop_front().unwrap_or_else(ProbeResult::timeout)
        } else {
            self.responses.front().cloned().unwrap_or_else(ProbeResult::timeout)
        }
    }
}

/// In-memory [`Probe`] answering from scripted rules.
///
/// When several rules match a command the one with the most needles wins;
/// ties go to the rule added first. Unmatched commands get the default
/// result (exit 1 unless overridden).
#[derive(Debug)]
pub struct ScriptedProbe {
    rules: Mutex<Vec<Rule>>,
    missing_programs: Vec<String>,
    default_result: ProbeResult,
    invocations: Mutex<Vec<ProbeCommand>>,
}

impl Default for ScriptedProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            missing_programs: Vec::new(),
            default_result: ProbeResult::exited(1, "unscripted probe"),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Answer commands for `program` mentioning every needle with `result`.
    pub fn on(self, program: &str, needles: &[&str], result: ProbeResult) -> Self {
        self.on_sequence(program, needles, vec![result])
    }

    /// Answer successive matching commands with `results` in order; the last
    /// result repeats once the queue is drained.
    pub fn on_sequence(self, program: &str, needles: &[&str], results: Vec<ProbeResult>) -> Self {
        self.rules.lock().unwrap().push(Rule {
            program: program.to_string(),
            needles: needles.iter().map(|n| n.to_string()).collect(),
            responses: results.into(),
        });
        self
    }

    /// Make every command for `program` fail to launch.
    pub fn missing_program(mut self, program: &str) -> Self {
        self.missing_programs.push(program.to_string());
        self
    }

    /// Result returned for commands no rule matches.
    pub fn with_default(mut self, result: ProbeResult) -> Self {
        self.default_result = result;
        self
    }

    /// Every command executed so far, in order.
    pub fn invocations(&self) -> Vec<ProbeCommand> {
        self.invocations.lock().unwrap().clone()
    }

    /// Number of executed commands for `program` mentioning every needle.
    pub fn count(&self, program: &str, needles: &[&str]) -> usize {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.program == program && needles.iter().all(|n| c.mentions(n)))
            .count()
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn execute(&self, command: &ProbeCommand) -> Result<ProbeResult, ProbeError> {
        self.invocations.lock().unwrap().push(command.clone());

        if self.missing_programs.iter().any(|p| *p == command.program) {
            return Err(ProbeError::Launch {
                program: command.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
            });
        }

        let mut rules = self.rules.lock().unwrap();
        let mut best: Option<usize> = None;
        for (idx, rule) in rules.iter().enumerate() {
            if !rule.matches(command) {
                continue;
            }
            match best {
                Some(b) if rules[b].needles.len() >= rule.needles.len() => {}
                _ => best = Some(idx),
            }
        }

        Ok(match best {
            Some(idx) => rules[idx].next_response(),
            None => self.default_result.clone(),
        })
    }
}

//! netcheck core - connectivity diagnostics engine
//!
//! Runs a fixed battery of network checks through a [`Probe`], interprets
//! each probe result into verdicts (pass, warning, error, recommended
//! action) and aggregates them into a [`RunReport`].
//!
//! [`Probe`]: netcheck_probe::Probe

pub mod checks;
pub mod config;
pub mod context;
pub mod error;
pub mod fakes;
pub mod host;
pub mod http;
pub mod orchestrator;
pub mod report;
pub mod telemetry;
pub mod verdict;

pub use checks::Diagnostics;
pub use config::DiagnosticsConfig;
pub use context::{FailureCategory, FailureRegistry, InstallIdentity, Run, RunContext, RunFlags};
pub use error::{ConfigError, DiagnosticError, Result};
pub use host::{Host, SystemHost};
pub use orchestrator::Orchestrator;
pub use report::{RunReport, EXIT_FAIL, EXIT_PASS};
pub use telemetry::init_tracing;
pub use verdict::{TranscriptEntry, Verdict, VerdictLog};

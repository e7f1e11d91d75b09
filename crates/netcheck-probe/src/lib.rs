//! netcheck probe - external command execution for connectivity checks
//!
//! Provides the probe layer that:
//! - Describes probe commands (HTTP fetch, gateway ping, DNS query, service state)
//! - Executes them with a bounded timeout and captures their output
//! - Never treats a nonzero exit as an error; only a launch failure is fatal

pub mod command;
pub mod error;
pub mod executor;
pub mod fakes;

// Re-export key types
pub use command::{ProbeCommand, ProxyOverride};
pub use error::ProbeError;
pub use executor::{CommandProbe, Probe, ProbeResult, TIMEOUT_EXIT_CODE};

//! netcheck - connectivity diagnostics CLI
//!
//! Checks that the update content service is reachable and, when it is not,
//! troubleshoots the local network (gateway, DNS, autoproxy, proxy
//! environment, captive portals, system clock) and recommends actions.
//!
//! ## Exit codes
//!
//! - `0`: no errors found, or `--self-test` was given
//! - `1`: at least one error was found
//! - `2`: the diagnostics could not run (missing tool, bad config)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{debug, Level};

use netcheck_core::{DiagnosticsConfig, Orchestrator, RunFlags, RunReport, SystemHost};
use netcheck_probe::CommandProbe;

/// Exit code when the diagnostics themselves could not run.
const EXIT_FATAL: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "netcheck")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Diagnose connectivity to the update content service", long_about = None)]
struct Cli {
    /// Run every check, even when the content service is reachable
    #[arg(long)]
    full: bool,

    /// Always exit successfully, even when errors are found
    #[arg(long, overrides_with = "no_self_test")]
    self_test: bool,

    /// Exit with a failure status when errors are found (default)
    #[arg(long, overrides_with = "self_test")]
    no_self_test: bool,

    /// JSON config file overriding endpoints, paths and timeouts
    #[arg(long, env = "NETCHECK_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// Print the report as JSON instead of text
    #[arg(long)]
    report_json: bool,
}

impl Cli {
    fn flags(&self) -> RunFlags {
        RunFlags {
            full: self.full,
            self_test: self.self_test && !self.no_self_test,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    netcheck_core::init_tracing(cli.json, level);

    let code = match run(&cli).await {
        Ok(report) => {
            if let Err(e) = print_report(&report, cli.report_json) {
                eprintln!("netcheck: {:#}", e);
                EXIT_FATAL
            } else {
                report.exit_code()
            }
        }
        Err(e) => {
            eprintln!("netcheck: {:#}", e);
            EXIT_FATAL
        }
    };
    std::process::exit(code);
}

async fn run(cli: &Cli) -> Result<RunReport> {
    let config = load_config(cli.config.as_deref())?;
    let probe = CommandProbe::new();
    let host = SystemHost;

    Orchestrator::new(&probe, &host, &config)
        .run(cli.flags())
        .await
        .context("Network diagnostics aborted")
}

fn load_config(path: Option<&Path>) -> Result<DiagnosticsConfig> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "Loading config");
            DiagnosticsConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))
        }
        None => Ok(DiagnosticsConfig::default()),
    }
}

fn print_report(report: &RunReport, as_json: bool) -> Result<()> {
    if as_json {
        let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
        println!("{}", json);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

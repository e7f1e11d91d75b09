//! System clock check.

use chrono::{DateTime, TimeZone, Utc};

use super::Diagnostics;
use crate::context::{FailureCategory, Run, RunContext};
use crate::error::Result;

const CALENDAR_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Whether the clock check should run for this context.
///
/// HTTPS failing while plain HTTP works is the usual symptom of a clock far
/// enough off to break certificate validation. Certificate failures do not
/// count in the registry, so a failed primary check also qualifies.
pub fn should_check_time(context: &RunContext) -> bool {
    if context.flags.full {
        return true;
    }
    let https_failed = context.failures.has_failed(FailureCategory::Https)
        || context.endpoints.primary == Some(false);
    https_failed && context.endpoints.http == Some(true)
}

fn describe_skew(skew_secs: i64) -> String {
    let direction = if skew_secs > 0 { "ahead" } else { "behind" };
    format!(
        "The local clock is {} seconds {} of the reference time",
        skew_secs.unsigned_abs(),
        direction
    )
}

impl Diagnostics<'_> {
    /// Compare the local clock to network time, or failing that to the
    /// install timestamp.
    pub async fn check_system_time(&self, run: &mut Run) -> Result<bool> {
        run.verdicts.begin_check("System time");
        let tolerance = self.config.clock_tolerance_secs;

        if let Some(time) = run.context.network_time {
            let skew = time.skew_secs();
            run.verdicts.info(format!(
                "Local time {} vs network time {} ({}s)",
                time.local.format(CALENDAR_FORMAT),
                time.network.format(CALENDAR_FORMAT),
                skew
            ));
            if skew.abs() <= tolerance {
                run.verdicts.pass(format!(
                    "System clock is within {}s of network time",
                    tolerance
                ));
                return Ok(true);
            }
            self.record_clock_error(run, time.local, time.network, "network time", skew);
            return Ok(false);
        }

        let stamp = self
            .host
            .read_file(&self.config.install_timestamp_file)
            .and_then(|content| content.trim().parse::<i64>().ok())
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());

        let Some(stamp) = stamp else {
            run.verdicts
                .info("No network time or install timestamp available, skipping clock check");
            return Ok(true);
        };

        let now = self.host.now();
        if now >= stamp {
            run.verdicts
                .pass("System clock is not earlier than the install timestamp");
            return Ok(true);
        }
        let skew = (now - stamp).num_seconds();
        self.record_clock_error(run, now, stamp, "install timestamp", skew);
        Ok(false)
    }

    fn record_clock_error(
        &self,
        run: &mut Run,
        local: DateTime<Utc>,
        reference: DateTime<Utc>,
        reference_name: &str,
        skew_secs: i64,
    ) {
        run.verdicts.error(format!(
            "System clock {} does not match {} {}",
            local.format(CALENDAR_FORMAT),
            reference_name,
            reference.format(CALENDAR_FORMAT)
        ));
        run.verdicts.info(describe_skew(skew_secs));
        run.verdicts.warning(
            "An incorrect system clock breaks TLS certificate validation",
        );
        run.verdicts
            .action("Enable network time synchronization: timedatectl set-ntp true");
        run.verdicts.action(
            "If this is a virtual machine, sync the clock from the hypervisor; on physical hardware, check the BIOS/RTC clock",
        );
    }
}

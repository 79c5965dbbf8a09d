//! The tokio-driven pass loop.
//!
//! [`run_scheduler`] owns the host side of the scheduler contract: it
//! feeds wall-clock samples from a [`Clock`] into catch-up passes and
//! turns each [`PassOutcome`] into either a `tokio::time::sleep` (positive
//! wait) or a bare yield (zero wait, "let the host breathe, then resume").
//! Control-plane work -- queued reconfiguration and stop requests from the
//! shared [`DriverControl`] -- happens only at pass boundaries, mirroring
//! the scheduler's own stop semantics.
//!
//! [`PassOutcome`]: cadence_core::PassOutcome

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use cadence_core::{TickScheduler, TickSink};

use crate::clock::Clock;
use crate::control::{DriverCommand, DriverControl};

/// Why the tick loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverEndReason {
    /// A sink returned a stop directive during an update.
    SinkStop,
    /// A stop was requested through the control handle.
    ControlStop,
    /// The configured pass limit was reached.
    PassLimit,
}

/// Result of a completed tick loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverResult {
    /// Why the loop ended.
    pub end_reason: DriverEndReason,
    /// Ticks emitted over the scheduler's lifetime.
    pub total_ticks: u64,
    /// Catch-up passes executed, including the one inside `start`.
    pub passes: u64,
}

/// Drive a scheduler until it stops.
///
/// Starts the scheduler (which emits the `start` notification and the
/// first batch of due ticks), then repeats: apply drained control
/// commands, honor stop requests, honor the pass limit, wait as the last
/// pass requested, run the next pass. The loop ends when the scheduler is
/// no longer running, whichever side stopped it.
pub async fn run_scheduler<C: Clock>(
    scheduler: &mut TickScheduler,
    clock: &C,
    control: &Arc<DriverControl>,
    sink: &mut dyn TickSink,
) -> DriverResult {
    info!(
        ticks_per_second = scheduler.ticks_per_second(),
        tick_interval_ms = scheduler.tick_interval_ms(),
        max_catch_up = scheduler.max_catch_up(),
        wait_ms = scheduler.wait_ms(),
        max_passes = control.max_passes(),
        "tick loop starting"
    );

    let mut outcome = scheduler.start(clock.now_ms(), sink);
    let mut passes: u64 = 1;

    loop {
        // --- Apply queued reconfiguration ---
        for command in control.drain_commands().await {
            apply_command(scheduler, command);
        }

        // --- Honor a control-plane stop ---
        if control.is_stop_requested() && scheduler.is_running() {
            scheduler.stop(sink);
            return finish(DriverEndReason::ControlStop, scheduler, passes);
        }

        // --- A sink stopped the scheduler mid-pass ---
        let Some(wait_ms) = outcome.next_wait_ms else {
            return finish(DriverEndReason::SinkStop, scheduler, passes);
        };

        // --- Honor the pass limit ---
        if control.pass_limit_reached(passes) {
            scheduler.stop(sink);
            return finish(DriverEndReason::PassLimit, scheduler, passes);
        }

        // --- Wait, then run the next pass ---
        if wait_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(wait_ms)).await;
        } else {
            // Zero wait means yield once to the host scheduler and resume.
            tokio::task::yield_now().await;
        }

        outcome = scheduler.run_pass(clock.now_ms(), sink);
        passes = passes.saturating_add(1);
    }
}

/// Apply one control command, logging the transition. A rejected rate is
/// logged and skipped; the loop keeps its current configuration.
fn apply_command(scheduler: &mut TickScheduler, command: DriverCommand) {
    match command {
        DriverCommand::SetTicksPerSecond(rate) => match scheduler.set_ticks_per_second(rate) {
            Ok(()) => info!(
                rate,
                tick_interval_ms = scheduler.tick_interval_ms(),
                "tick rate changed"
            ),
            Err(error) => warn!(rate, %error, "rejected tick rate change"),
        },
        DriverCommand::SetMaxCatchUp(max_catch_up) => {
            scheduler.set_max_catch_up(max_catch_up);
            info!(max_catch_up, "catch-up bound changed");
        }
        DriverCommand::SetWaitMs(wait_ms) => {
            scheduler.set_wait_ms(wait_ms);
            info!(wait_ms, "inter-pass wait changed");
        }
    }
}

/// Log the loop end and assemble the result.
fn finish(end_reason: DriverEndReason, scheduler: &TickScheduler, passes: u64) -> DriverResult {
    let total_ticks = scheduler.total_ticks();
    info!(reason = ?end_reason, total_ticks, passes, "tick loop ended");
    DriverResult {
        end_reason,
        total_ticks,
        passes,
    }
}

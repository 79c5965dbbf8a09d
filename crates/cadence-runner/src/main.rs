//! Demo entry point for the cadence tick loop.
//!
//! Loads an optional YAML scheduler config (first CLI argument), wires a
//! logging sink, and drives the loop until Ctrl-C. Every completed
//! one-second window of ticks is logged at info level, individual ticks
//! at trace.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, trace};
use tracing_subscriber::EnvFilter;

use cadence_core::{SchedulerConfig, TickDirective, TickScheduler, TickSink, TickSnapshot};
use cadence_runner::{DriverControl, DriverStatus, TokioClock, run_scheduler};

/// Sink that reports loop progress through `tracing`.
#[derive(Debug, Default)]
struct LogSink;

impl TickSink for LogSink {
    fn on_start(&mut self, snapshot: TickSnapshot) {
        info!(
            ticks_per_second = snapshot.ticks_per_second,
            tick_interval_ms = snapshot.tick_interval_ms,
            max_catch_up = snapshot.max_catch_up,
            wait_ms = snapshot.wait_ms,
            "tick loop observer attached"
        );
    }

    fn on_update(&mut self, snapshot: TickSnapshot) -> TickDirective {
        trace!(
            total_ticks = snapshot.total_ticks,
            current_tick = snapshot.current_tick,
            "tick"
        );
        if snapshot.current_tick == 0 && snapshot.total_ticks > 0 {
            info!(total_ticks = snapshot.total_ticks, "one-second window complete");
        }
        TickDirective::Continue
    }

    fn on_stop(&mut self, snapshot: TickSnapshot) {
        info!(total_ticks = snapshot.total_ticks, "tick loop stopping");
    }
}

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the configuration file cannot be loaded or the
/// scheduler rejects the configured rate.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => SchedulerConfig::from_file(Path::new(&path))?,
        None => SchedulerConfig::default(),
    };
    info!(
        ticks_per_second = ?config.ticks_per_second,
        max_catch_up = ?config.max_catch_up,
        wait_ms = ?config.wait_ms,
        "configuration loaded"
    );

    let mut scheduler = TickScheduler::new(&config)?;
    let control = Arc::new(DriverControl::unbounded());

    // Ctrl-C requests a clean stop at the next pass boundary.
    let signal_control = Arc::clone(&control);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, requesting stop");
            signal_control.request_stop();
        }
    });

    let clock = TokioClock::new();
    let mut sink = LogSink;
    let result = run_scheduler(&mut scheduler, &clock, &control, &mut sink).await;

    let status = DriverStatus::capture(&scheduler, &control);
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        passes = result.passes,
        elapsed_seconds = status.elapsed_seconds,
        "shutdown complete"
    );
    Ok(())
}

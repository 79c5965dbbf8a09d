//! Shared control state for a running tick loop.
//!
//! [`DriverControl`] is wrapped in [`Arc`] and shared between the driver
//! task and whoever operates it (a signal handler, an admin API, a test).
//! The stop flag is atomic so the loop can poll it lock-free between
//! passes; reconfiguration travels as queued [`DriverCommand`]s that the
//! driver drains and applies at the same boundary.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use cadence_core::TickScheduler;

/// A live reconfiguration request, applied between catch-up passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverCommand {
    /// Change the target rate (recomputes the tick interval).
    SetTicksPerSecond(u32),
    /// Change the per-pass catch-up bound.
    SetMaxCatchUp(u32),
    /// Change the inter-pass wait.
    SetWaitMs(u64),
}

/// Shared handle for stopping and reconfiguring a running tick loop.
#[derive(Debug)]
pub struct DriverControl {
    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Queued reconfiguration commands awaiting the next pass boundary.
    commands: Mutex<Vec<DriverCommand>>,

    /// Wall-clock time when this control was created.
    started_at: DateTime<Utc>,

    /// Maximum number of catch-up passes before the driver stops the
    /// scheduler on its own (0 = unlimited).
    max_passes: u64,
}

impl DriverControl {
    /// Create a control handle that stops the loop after `max_passes`
    /// passes (0 = unlimited).
    #[must_use]
    pub fn new(max_passes: u64) -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
            commands: Mutex::new(Vec::new()),
            started_at: Utc::now(),
            max_passes,
        }
    }

    /// Create an unbounded control handle.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(0)
    }

    /// Request a clean stop. The driver stops the scheduler at the next
    /// pass boundary; the batch in progress is never interrupted.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Queue a reconfiguration command for the next pass boundary.
    pub async fn send(&self, command: DriverCommand) {
        let mut queue = self.commands.lock().await;
        queue.push(command);
    }

    /// Drain all queued commands, in submission order.
    pub async fn drain_commands(&self) -> Vec<DriverCommand> {
        let mut queue = self.commands.lock().await;
        std::mem::take(&mut *queue)
    }

    /// Check whether the pass limit has been reached.
    ///
    /// Returns `true` if `max_passes > 0` and `passes >= max_passes`.
    pub const fn pass_limit_reached(&self, passes: u64) -> bool {
        self.max_passes > 0 && passes >= self.max_passes
    }

    /// Configured pass limit (0 = unlimited).
    pub const fn max_passes(&self) -> u64 {
        self.max_passes
    }

    /// Wall-clock time when this control was created.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Elapsed wall-clock seconds since this control was created.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        // Negative only if the wall clock jumped; report 0 in that case.
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }
}

/// JSON-serializable status of a tick loop, for operator surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverStatus {
    /// Whether the scheduler is running.
    pub running: bool,
    /// Ticks emitted so far.
    pub total_ticks: u64,
    /// Tick index within the current one-second window.
    pub current_tick: u64,
    /// Target rate in ticks per second.
    pub ticks_per_second: u32,
    /// Derived milliseconds between ticks.
    pub tick_interval_ms: u64,
    /// Catch-up bound per pass.
    pub max_catch_up: u32,
    /// Inter-pass wait in milliseconds.
    pub wait_ms: u64,
    /// Whether a stop has been requested.
    pub stop_requested: bool,
    /// Elapsed wall-clock seconds since the control was created.
    pub elapsed_seconds: u64,
    /// ISO 8601 timestamp of when the control was created.
    pub started_at: String,
}

impl DriverStatus {
    /// Capture the current status of a scheduler/control pair.
    #[must_use]
    pub fn capture(scheduler: &TickScheduler, control: &Arc<DriverControl>) -> Self {
        Self {
            running: scheduler.is_running(),
            total_ticks: scheduler.total_ticks(),
            current_tick: scheduler.current_tick(),
            ticks_per_second: scheduler.ticks_per_second(),
            tick_interval_ms: scheduler.tick_interval_ms(),
            max_catch_up: scheduler.max_catch_up(),
            wait_ms: scheduler.wait_ms(),
            stop_requested: control.is_stop_requested(),
            elapsed_seconds: control.elapsed_seconds(),
            started_at: control.started_at().to_rfc3339(),
        }
    }
}

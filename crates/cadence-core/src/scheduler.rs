//! The fixed-timestep catch-up scheduler.
//!
//! [`TickScheduler`] advances a tick counter at a target rate, tolerating
//! host-timer delay by emitting several due ticks in one pass ("frame
//! skipping"), bounded by `max_catch_up`. It is a two-state machine --
//! stopped or running -- with one transition edge: each catch-up pass
//! reports whether (and after how long) the host should schedule the next
//! pass.
//!
//! # Design Principles
//!
//! - Time enters only as a `now_ms` argument. The scheduler never reads a
//!   clock, so passes replay deterministically in tests.
//! - Derived values (`tick_interval_ms`, `current_tick`) are recomputed
//!   from their inputs at write/read time -- never stored stale.
//! - The `running` flag is consulted only at pass boundaries. A stop issued
//!   from inside an `update` handler lets the rest of the batch finish and
//!   suppresses the *next* pass, never the current one.

use tracing::{debug, trace};

use crate::config::{ConfigError, SchedulerConfig, validate_rate};
use crate::sink::{TickDirective, TickSink, TickSnapshot};

/// What the host should do after a catch-up pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassOutcome {
    /// Number of `update` notifications emitted during the pass.
    pub ticks_emitted: u32,

    /// `Some(wait)` if the scheduler is still running and the next pass
    /// should run after `wait` milliseconds (zero means "yield once, then
    /// resume"). `None` if the scheduler stopped and no pass follows.
    pub next_wait_ms: Option<u64>,
}

/// Fixed-timestep update scheduler with bounded catch-up.
///
/// Construct it from a [`SchedulerConfig`], then drive it with
/// [`start`](Self::start) and repeated [`run_pass`](Self::run_pass) calls,
/// honoring each [`PassOutcome`]. All notifications go to the
/// [`TickSink`] handed to each call, synchronously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickScheduler {
    /// Target rate in ticks per second. Always in `1..=1000`.
    ticks_per_second: u32,

    /// Derived `floor(1000 / ticks_per_second)`. Always >= 1.
    tick_interval_ms: u64,

    /// Maximum ticks emitted in one pass before yielding.
    max_catch_up: u32,

    /// Delay between scheduling passes in milliseconds.
    wait_ms: u64,

    /// Whether the loop is active.
    running: bool,

    /// Wall-clock sample taken at the start of the current pass.
    pass_started_ms: u64,

    /// Threshold at or before which the next tick is due.
    due_time_ms: u64,

    /// Ticks emitted over the scheduler's lifetime.
    total_ticks: u64,
}

impl TickScheduler {
    /// Create a scheduler from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRate`] if the configured rate is zero
    /// or above 1000.
    pub fn new(config: &SchedulerConfig) -> Result<Self, ConfigError> {
        let ticks_per_second = config.effective_ticks_per_second()?;
        Ok(Self {
            ticks_per_second,
            tick_interval_ms: interval_for(ticks_per_second),
            max_catch_up: config.effective_max_catch_up(),
            wait_ms: config.effective_wait_ms(),
            running: false,
            pass_started_ms: 0,
            due_time_ms: 0,
            total_ticks: 0,
        })
    }

    /// Create a scheduler with the default configuration (60 ticks per
    /// second, catch-up bound 10, no inter-pass wait).
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            ticks_per_second: crate::config::DEFAULT_TICKS_PER_SECOND,
            tick_interval_ms: interval_for(crate::config::DEFAULT_TICKS_PER_SECOND),
            max_catch_up: crate::config::DEFAULT_MAX_CATCH_UP,
            wait_ms: crate::config::DEFAULT_WAIT_MS,
            running: false,
            pass_started_ms: 0,
            due_time_ms: 0,
            total_ticks: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Start the loop and run the first catch-up pass immediately.
    ///
    /// Emits the `start` notification synchronously, marks the scheduler
    /// running, baselines both the pass reference and the due time to
    /// `now_ms`, then runs a pass (so the first tick fires right away).
    ///
    /// Calling `start` while already running is idempotent in the
    /// counter sense: the `start` notification is emitted again and the
    /// due-time baseline resets to `now_ms`, but `total_ticks` is kept.
    pub fn start(&mut self, now_ms: u64, sink: &mut dyn TickSink) -> PassOutcome {
        debug!(now_ms, total_ticks = self.total_ticks, "scheduler starting");
        sink.on_start(self.snapshot());
        self.running = true;
        self.pass_started_ms = now_ms;
        self.due_time_ms = now_ms;
        self.run_pass(now_ms, sink)
    }

    /// Stop the loop.
    ///
    /// Marks the scheduler stopped and emits the `stop` notification
    /// synchronously. A pass already executing is not interrupted; stopping
    /// only prevents the next pass from being scheduled. Callable without a
    /// prior `start`, in which case it simply emits the notification.
    pub fn stop(&mut self, sink: &mut dyn TickSink) {
        self.running = false;
        debug!(total_ticks = self.total_ticks, "scheduler stopped");
        sink.on_stop(self.snapshot());
    }

    /// Run one catch-up pass at wall-clock time `now_ms`.
    ///
    /// Emits one `update` per due tick -- `due_time <= now` (inclusive) --
    /// up to `max_catch_up` ticks, advancing the due time by one interval
    /// per tick. A [`TickDirective::Stop`] from the sink triggers
    /// [`stop`](Self::stop) inline (so the `stop` notification observes the
    /// counters as they stood during that update), after which the
    /// remaining due ticks in the batch still emit. The stop is performed
    /// at most once per batch.
    ///
    /// The returned [`PassOutcome`] carries `Some(wait)` only if the
    /// scheduler is still running once the batch completes.
    pub fn run_pass(&mut self, now_ms: u64, sink: &mut dyn TickSink) -> PassOutcome {
        self.pass_started_ms = now_ms;
        let limit = self.total_ticks.saturating_add(u64::from(self.max_catch_up));
        let mut ticks_emitted: u32 = 0;

        while self.due_time_ms <= self.pass_started_ms && self.total_ticks < limit {
            let directive = sink.on_update(self.snapshot());
            if directive == TickDirective::Stop && self.running {
                self.stop(sink);
            }
            self.due_time_ms = self.due_time_ms.saturating_add(self.tick_interval_ms);
            self.total_ticks = self.total_ticks.saturating_add(1);
            ticks_emitted = ticks_emitted.saturating_add(1);
        }

        if ticks_emitted > 0 {
            trace!(
                ticks_emitted,
                total_ticks = self.total_ticks,
                due_time_ms = self.due_time_ms,
                "catch-up pass complete"
            );
        }

        PassOutcome {
            ticks_emitted,
            next_wait_ms: if self.running { Some(self.wait_ms) } else { None },
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Whether the loop is active.
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Ticks emitted over the scheduler's lifetime.
    pub const fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Tick index within the current one-second window.
    ///
    /// Computed as `total_ticks % ticks_per_second` with the rate as it is
    /// *now*, so a live rate change is reflected immediately.
    pub fn current_tick(&self) -> u64 {
        // Rate is >= 1 by construction; the fallback is unreachable.
        self.total_ticks
            .checked_rem(u64::from(self.ticks_per_second))
            .unwrap_or(0)
    }

    /// Target rate in ticks per second.
    pub const fn ticks_per_second(&self) -> u32 {
        self.ticks_per_second
    }

    /// Derived nominal milliseconds between ticks.
    pub const fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }

    /// Catch-up bound per pass.
    pub const fn max_catch_up(&self) -> u32 {
        self.max_catch_up
    }

    /// Delay between scheduling passes in milliseconds.
    pub const fn wait_ms(&self) -> u64 {
        self.wait_ms
    }

    /// Capture a point-in-time view for notification payloads and status
    /// reporting.
    pub fn snapshot(&self) -> TickSnapshot {
        TickSnapshot {
            total_ticks: self.total_ticks,
            current_tick: self.current_tick(),
            ticks_per_second: self.ticks_per_second,
            tick_interval_ms: self.tick_interval_ms,
            max_catch_up: self.max_catch_up,
            wait_ms: self.wait_ms,
            running: self.running,
        }
    }

    // -----------------------------------------------------------------------
    // Live mutation
    // -----------------------------------------------------------------------

    /// Change the target rate, recomputing the tick interval.
    ///
    /// Takes effect immediately, including mid-run. Neither `due_time` nor
    /// `total_ticks` is adjusted retroactively; already-scheduled due times
    /// keep the old spacing, new ones use the new interval.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRate`] (leaving the rate unchanged) if
    /// `rate` is zero or above 1000.
    pub fn set_ticks_per_second(&mut self, rate: u32) -> Result<(), ConfigError> {
        validate_rate(rate)?;
        self.ticks_per_second = rate;
        self.tick_interval_ms = interval_for(rate);
        Ok(())
    }

    /// Change the catch-up bound. Takes effect at the next pass.
    pub const fn set_max_catch_up(&mut self, max_catch_up: u32) {
        self.max_catch_up = max_catch_up;
    }

    /// Change the inter-pass wait. Takes effect when the current pass
    /// reports its outcome.
    pub const fn set_wait_ms(&mut self, wait_ms: u64) {
        self.wait_ms = wait_ms;
    }
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Derive the nominal per-tick interval for a validated rate.
fn interval_for(rate: u32) -> u64 {
    // Rate is validated to 1..=1000, so the result is in 1..=1000.
    1000_u64.checked_div(u64::from(rate)).unwrap_or(1000)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;

    /// Everything a test needs to observe: the full notification stream.
    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    enum Event {
        Start(TickSnapshot),
        Update(TickSnapshot),
        Stop(TickSnapshot),
    }

    /// Recording sink that can request a stop when a predicate on the
    /// update snapshot holds.
    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
        stop_when_current_tick: Option<u64>,
    }

    impl Recorder {
        fn stopping_at(current_tick: u64) -> Self {
            Self {
                events: Vec::new(),
                stop_when_current_tick: Some(current_tick),
            }
        }

        fn updates(&self) -> Vec<TickSnapshot> {
            self.events
                .iter()
                .filter_map(|event| match event {
                    Event::Update(snapshot) => Some(*snapshot),
                    _ => None,
                })
                .collect()
        }

        fn stops(&self) -> Vec<TickSnapshot> {
            self.events
                .iter()
                .filter_map(|event| match event {
                    Event::Stop(snapshot) => Some(*snapshot),
                    _ => None,
                })
                .collect()
        }

        fn starts(&self) -> Vec<TickSnapshot> {
            self.events
                .iter()
                .filter_map(|event| match event {
                    Event::Start(snapshot) => Some(*snapshot),
                    _ => None,
                })
                .collect()
        }
    }

    impl TickSink for Recorder {
        fn on_start(&mut self, snapshot: TickSnapshot) {
            self.events.push(Event::Start(snapshot));
        }

        fn on_update(&mut self, snapshot: TickSnapshot) -> TickDirective {
            self.events.push(Event::Update(snapshot));
            if self.stop_when_current_tick == Some(snapshot.current_tick) {
                TickDirective::Stop
            } else {
                TickDirective::Continue
            }
        }

        fn on_stop(&mut self, snapshot: TickSnapshot) {
            self.events.push(Event::Stop(snapshot));
        }
    }

    fn scheduler_with(rate: u32, max_catch_up: u32, wait_ms: u64) -> TickScheduler {
        TickScheduler::new(&SchedulerConfig {
            ticks_per_second: Some(rate),
            max_catch_up: Some(max_catch_up),
            wait_ms: Some(wait_ms),
        })
        .unwrap()
    }

    // P1: interval derivation.
    #[test]
    fn interval_is_floor_of_1000_over_rate() {
        for (rate, expected) in [(1, 1000), (3, 333), (50, 20), (60, 16), (999, 1), (1000, 1)] {
            let scheduler = scheduler_with(rate, 10, 0);
            assert_eq!(scheduler.tick_interval_ms(), expected, "rate {rate}");
        }
    }

    // Scenario B: defaults.
    #[test]
    fn defaults_match_contract() {
        let scheduler = TickScheduler::new(&SchedulerConfig::default()).unwrap();
        assert_eq!(scheduler.ticks_per_second(), 60);
        assert_eq!(scheduler.max_catch_up(), 10);
        assert_eq!(scheduler.wait_ms(), 0);
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.total_ticks(), 0);
    }

    #[test]
    fn with_defaults_matches_default_config() {
        let from_config = TickScheduler::new(&SchedulerConfig::default()).unwrap();
        assert_eq!(TickScheduler::with_defaults(), from_config);
    }

    #[test]
    fn invalid_rates_are_rejected_at_construction() {
        for rate in [0, 1001, u32::MAX] {
            let result = TickScheduler::new(&SchedulerConfig {
                ticks_per_second: Some(rate),
                ..SchedulerConfig::default()
            });
            assert!(result.is_err(), "rate {rate}");
        }
    }

    #[test]
    fn explicit_zero_catch_up_emits_no_ticks_but_still_reschedules() {
        let mut scheduler = scheduler_with(60, 0, 4);
        let mut sink = Recorder::default();

        let outcome = scheduler.start(0, &mut sink);

        assert_eq!(outcome.ticks_emitted, 0);
        assert_eq!(outcome.next_wait_ms, Some(4));
        assert!(sink.updates().is_empty());
        assert_eq!(sink.starts().len(), 1);
    }

    #[test]
    fn start_emits_start_then_first_update_immediately() {
        let mut scheduler = scheduler_with(50, 10, 0);
        let mut sink = Recorder::default();

        let outcome = scheduler.start(1_000, &mut sink);

        assert_eq!(outcome.ticks_emitted, 1);
        assert_eq!(outcome.next_wait_ms, Some(0));
        assert!(matches!(
            sink.events.as_slice(),
            [Event::Start(_), Event::Update(_)]
        ));
        // The first update observes the pre-increment counter.
        let first = *sink.updates().first().unwrap();
        assert_eq!(first.total_ticks, 0);
        assert_eq!(first.current_tick, 0);
        assert_eq!(scheduler.total_ticks(), 1);
    }

    // P3: bounded catch-up.
    #[test]
    fn catch_up_is_bounded_per_pass() {
        let mut scheduler = scheduler_with(100, 10, 0);
        let mut sink = Recorder::default();

        let _ = scheduler.start(0, &mut sink);
        assert_eq!(scheduler.total_ticks(), 1);

        // 1000ms late: 100 ticks are due, but only 10 may emit.
        let outcome = scheduler.run_pass(1_000, &mut sink);
        assert_eq!(outcome.ticks_emitted, 10);
        assert_eq!(scheduler.total_ticks(), 11);

        // The backlog drains 10 at a time on subsequent passes.
        let outcome = scheduler.run_pass(1_000, &mut sink);
        assert_eq!(outcome.ticks_emitted, 10);
        assert_eq!(scheduler.total_ticks(), 21);
    }

    // P2: monotone counter, +1 per update.
    #[test]
    fn total_ticks_increments_exactly_once_per_update() {
        let mut scheduler = scheduler_with(100, 10, 0);
        let mut sink = Recorder::default();

        let _ = scheduler.start(0, &mut sink);
        let _ = scheduler.run_pass(40, &mut sink);
        let _ = scheduler.run_pass(90, &mut sink);

        let updates = sink.updates();
        assert_eq!(u64::try_from(updates.len()).unwrap(), scheduler.total_ticks());
        let mut expected: u64 = 0;
        for snapshot in &updates {
            assert_eq!(snapshot.total_ticks, expected);
            expected = expected.saturating_add(1);
        }
    }

    #[test]
    fn due_time_advances_only_in_interval_increments() {
        let mut scheduler = scheduler_with(100, 10, 0);
        let mut sink = Recorder::default();

        let _ = scheduler.start(0, &mut sink);
        // Pass at t=35 with a 10ms interval: due times 10, 20, 30 are
        // overdue, 40 is not. Exactly 3 ticks emit.
        let outcome = scheduler.run_pass(35, &mut sink);
        assert_eq!(outcome.ticks_emitted, 3);

        // Nothing more is due until t=40.
        let outcome = scheduler.run_pass(39, &mut sink);
        assert_eq!(outcome.ticks_emitted, 0);
        let outcome = scheduler.run_pass(40, &mut sink);
        assert_eq!(outcome.ticks_emitted, 1);
    }

    // P4 / Scenario C: wraparound under a live rate change.
    #[test]
    fn current_tick_uses_the_rate_at_read_time() {
        let mut scheduler = scheduler_with(1000, 25, 0);
        let mut sink = Recorder::default();

        // Accumulate exactly 25 ticks: one at start, 24 in the next pass.
        let _ = scheduler.start(0, &mut sink);
        let _ = scheduler.run_pass(24, &mut sink);
        assert_eq!(scheduler.total_ticks(), 25);

        scheduler.set_ticks_per_second(10).unwrap();
        assert_eq!(scheduler.current_tick(), 5);
        assert_eq!(scheduler.total_ticks(), 25);
        assert_eq!(scheduler.tick_interval_ms(), 100);
    }

    #[test]
    fn rejected_rate_change_leaves_state_untouched() {
        let mut scheduler = scheduler_with(60, 10, 0);
        assert!(scheduler.set_ticks_per_second(0).is_err());
        assert!(scheduler.set_ticks_per_second(5_000).is_err());
        assert_eq!(scheduler.ticks_per_second(), 60);
        assert_eq!(scheduler.tick_interval_ms(), 16);
    }

    // P5: stop from inside an update handler.
    #[test]
    fn stop_during_update_finishes_the_batch() {
        let mut scheduler = scheduler_with(100, 10, 0);
        // Stop on the very first update of the late pass (current_tick 1).
        let mut sink = Recorder::stopping_at(1);

        let _ = scheduler.start(0, &mut sink);
        assert_eq!(scheduler.total_ticks(), 1);

        // 5 ticks due (10..=50); the first one requests the stop.
        let outcome = scheduler.run_pass(50, &mut sink);

        assert_eq!(outcome.ticks_emitted, 5);
        assert_eq!(outcome.next_wait_ms, None);
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.total_ticks(), 6);

        // Exactly one stop, emitted inline: it observed the counter before
        // the stopping tick was accounted.
        let stops = sink.stops();
        assert_eq!(stops.len(), 1);
        assert_eq!(stops.first().unwrap().total_ticks, 1);

        // All six updates fired despite the mid-batch stop.
        assert_eq!(sink.updates().len(), 6);
    }

    // Scenario A, driven with explicit timestamps.
    #[test]
    fn scenario_config_50_5_5() {
        let mut scheduler = scheduler_with(50, 5, 5);
        let mut sink = Recorder::stopping_at(1);

        let outcome = scheduler.start(1_000, &mut sink);
        let start = *sink.starts().first().unwrap();
        assert_eq!(
            (start.ticks_per_second, start.max_catch_up, start.wait_ms),
            (50, 5, 5)
        );
        assert_eq!(outcome.ticks_emitted, 1);
        assert_eq!(outcome.next_wait_ms, Some(5));

        // Passes at 5ms spacing until the second tick is due at t=1020.
        for now in [1_005, 1_010, 1_015] {
            let outcome = scheduler.run_pass(now, &mut sink);
            assert_eq!(outcome.ticks_emitted, 0);
        }
        let outcome = scheduler.run_pass(1_020, &mut sink);
        assert_eq!(outcome.ticks_emitted, 1);
        assert_eq!(outcome.next_wait_ms, None);

        // Exactly one update with current_tick 0 precedes the stopping one,
        // and the stop notification reports total_ticks == 1.
        let updates = sink.updates();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates.first().unwrap().current_tick, 0);
        assert_eq!(updates.get(1).unwrap().current_tick, 1);
        let stops = sink.stops();
        assert_eq!(stops.len(), 1);
        assert_eq!(stops.first().unwrap().total_ticks, 1);
    }

    // Scenario D: stop without start.
    #[test]
    fn stop_without_start_emits_one_stop_and_nothing_else() {
        let mut scheduler = TickScheduler::with_defaults();
        let mut sink = Recorder::default();

        scheduler.stop(&mut sink);

        assert!(!scheduler.is_running());
        assert!(matches!(sink.events.as_slice(), [Event::Stop(_)]));
        assert!(sink.updates().is_empty());
    }

    #[test]
    fn restarting_keeps_the_tick_counter() {
        let mut scheduler = scheduler_with(100, 10, 0);
        let mut sink = Recorder::default();

        let _ = scheduler.start(0, &mut sink);
        assert_eq!(scheduler.total_ticks(), 1);

        // Second start while running: notifies again, re-baselines, and the
        // counter carries over.
        let outcome = scheduler.start(500, &mut sink);
        assert_eq!(outcome.ticks_emitted, 1);
        assert_eq!(sink.starts().len(), 2);
        assert_eq!(scheduler.total_ticks(), 2);
        assert!(scheduler.is_running());
    }

    #[test]
    fn live_wait_and_catch_up_changes_apply_to_following_passes() {
        let mut scheduler = scheduler_with(100, 10, 0);
        let mut sink = Recorder::default();

        let outcome = scheduler.start(0, &mut sink);
        assert_eq!(outcome.next_wait_ms, Some(0));

        scheduler.set_wait_ms(7);
        let outcome = scheduler.run_pass(10, &mut sink);
        assert_eq!(outcome.next_wait_ms, Some(7));

        scheduler.set_max_catch_up(2);
        // 98 ticks overdue, but the new bound caps the batch at 2.
        let outcome = scheduler.run_pass(1_000, &mut sink);
        assert_eq!(outcome.ticks_emitted, 2);
    }

    #[test]
    fn snapshot_reflects_live_state() {
        let mut scheduler = scheduler_with(50, 5, 5);
        let mut sink = Recorder::default();
        let _ = scheduler.start(0, &mut sink);

        let snapshot = scheduler.snapshot();
        assert!(snapshot.running);
        assert_eq!(snapshot.total_ticks, 1);
        assert_eq!(snapshot.current_tick, 1);
        assert_eq!(snapshot.tick_interval_ms, 20);
    }
}

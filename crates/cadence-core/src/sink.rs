//! Notification sink for scheduler lifecycle and tick events.
//!
//! The scheduler does not own its observers. It is handed a [`TickSink`]
//! for each operation and emits `start`, `update`, and `stop` notifications
//! into it synchronously, on the caller's thread of control. A sink that
//! wants the loop to end returns [`TickDirective::Stop`] from
//! [`TickSink::on_update`]; the scheduler performs the stop inline, so the
//! observable ordering matches a reentrant `stop()` call made from inside
//! the update handler.
//!
//! Sinks must not block: a slow handler delays the whole loop. Panics in a
//! handler are not caught and propagate to whoever drives the pass.

use serde::Serialize;

/// A point-in-time view of the scheduler, captured at emission time.
///
/// Snapshots are plain copies. Counters reflect the state *before* the
/// emitted tick is accounted, so the first `update` of a run observes
/// `total_ticks == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickSnapshot {
    /// Ticks emitted over the scheduler's lifetime.
    pub total_ticks: u64,

    /// Tick index within the current one-second window
    /// (`total_ticks % ticks_per_second`).
    pub current_tick: u64,

    /// Target rate in ticks per second.
    pub ticks_per_second: u32,

    /// Derived nominal milliseconds between ticks.
    pub tick_interval_ms: u64,

    /// Catch-up bound per pass.
    pub max_catch_up: u32,

    /// Delay between scheduling passes in milliseconds.
    pub wait_ms: u64,

    /// Whether the loop is active.
    pub running: bool,
}

/// What the sink wants the scheduler to do after an `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickDirective {
    /// Keep going.
    #[default]
    Continue,

    /// Stop the scheduler, as if `stop()` were called from inside the
    /// update handler. Remaining due ticks in the current batch still emit.
    Stop,
}

/// Receiver for scheduler notifications.
///
/// `Send` is required so a sink can ride along inside an async driver task.
pub trait TickSink: Send {
    /// Called once per `start()`, before the scheduler marks itself running.
    fn on_start(&mut self, _snapshot: TickSnapshot) {}

    /// Called once per emitted tick.
    fn on_update(&mut self, snapshot: TickSnapshot) -> TickDirective;

    /// Called once per `stop()`, after the scheduler marks itself stopped.
    fn on_stop(&mut self, _snapshot: TickSnapshot) {}
}

/// A sink that ignores every notification. Useful in tests and as a
/// placeholder host.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSink;

impl TickSink for NoOpSink {
    fn on_update(&mut self, _snapshot: TickSnapshot) -> TickDirective {
        TickDirective::Continue
    }
}

/// Adapter turning a closure into an update-only sink.
pub struct UpdateFn<F>
where
    F: FnMut(TickSnapshot) -> TickDirective + Send,
{
    handler: F,
}

impl<F> UpdateFn<F>
where
    F: FnMut(TickSnapshot) -> TickDirective + Send,
{
    /// Wrap a closure that handles `update` notifications.
    pub const fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F> TickSink for UpdateFn<F>
where
    F: FnMut(TickSnapshot) -> TickDirective + Send,
{
    fn on_update(&mut self, snapshot: TickSnapshot) -> TickDirective {
        (self.handler)(snapshot)
    }
}

/// Ordered multi-listener dispatch.
///
/// Listeners are notified in subscription order. Every listener sees every
/// notification, even when an earlier listener in the same `update` asked
/// to stop; the stop directive is aggregated and reported once all
/// listeners have run.
#[derive(Default)]
pub struct FanOutSink {
    listeners: Vec<Box<dyn TickSink>>,
}

impl FanOutSink {
    /// Create an empty fan-out sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener at the end of the dispatch order.
    pub fn subscribe<S: TickSink + 'static>(&mut self, listener: S) {
        self.listeners.push(Box::new(listener));
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listeners are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl TickSink for FanOutSink {
    fn on_start(&mut self, snapshot: TickSnapshot) {
        for listener in &mut self.listeners {
            listener.on_start(snapshot);
        }
    }

    fn on_update(&mut self, snapshot: TickSnapshot) -> TickDirective {
        let mut directive = TickDirective::Continue;
        for listener in &mut self.listeners {
            if listener.on_update(snapshot) == TickDirective::Stop {
                directive = TickDirective::Stop;
            }
        }
        directive
    }

    fn on_stop(&mut self, snapshot: TickSnapshot) {
        for listener in &mut self.listeners {
            listener.on_stop(snapshot);
        }
    }
}

impl std::fmt::Debug for FanOutSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanOutSink")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

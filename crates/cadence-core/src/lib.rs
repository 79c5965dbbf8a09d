//! Fixed-timestep tick scheduler for the Cadence workspace.
//!
//! This crate owns the scheduling state machine: it decides how many
//! simulation ticks are due at a given wall-clock instant, emits them to a
//! notification sink with bounded catch-up, and tells the host when to run
//! the next pass. The wall clock itself never enters this crate except as a
//! `now_ms` argument, so every behavior is deterministically testable.
//!
//! # Modules
//!
//! - [`config`] -- [`SchedulerConfig`] with explicit optionality, defaults,
//!   validation, and YAML loading.
//! - [`scheduler`] -- [`TickScheduler`], the two-state (stopped/running)
//!   catch-up loop.
//! - [`sink`] -- [`TickSink`] notification trait plus fan-out and adapter
//!   implementations.
//!
//! [`SchedulerConfig`]: config::SchedulerConfig
//! [`TickScheduler`]: scheduler::TickScheduler
//! [`TickSink`]: sink::TickSink

pub mod config;
pub mod scheduler;
pub mod sink;

pub use config::{ConfigError, SchedulerConfig};
pub use scheduler::{PassOutcome, TickScheduler};
pub use sink::{FanOutSink, NoOpSink, TickDirective, TickSink, TickSnapshot, UpdateFn};

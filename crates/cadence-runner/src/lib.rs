//! Host side of the cadence scheduler: clocks, operator controls, and the
//! tokio-driven pass loop.
//!
//! `cadence-core` is deliberately clock-free; this crate supplies the two
//! host collaborators the scheduler needs -- a now-in-milliseconds reader
//! ([`Clock`]) and a deferred-callback primitive (`tokio::time::sleep`
//! inside [`run_scheduler`]) -- plus a shared [`DriverControl`] handle so
//! other tasks can stop or reconfigure a running loop.
//!
//! # Modules
//!
//! - [`clock`] -- [`Clock`] trait with monotonic std and tokio impls.
//! - [`control`] -- [`DriverControl`] shared handle and [`DriverStatus`]
//!   reporting.
//! - [`driver`] -- [`run_scheduler`], the async pass loop.
//!
//! [`Clock`]: clock::Clock
//! [`DriverControl`]: control::DriverControl
//! [`DriverStatus`]: control::DriverStatus
//! [`run_scheduler`]: driver::run_scheduler

pub mod clock;
pub mod control;
pub mod driver;

pub use clock::{Clock, MonotonicClock, TokioClock};
pub use control::{DriverCommand, DriverControl, DriverStatus};
pub use driver::{DriverEndReason, DriverResult, run_scheduler};

//! Monotonic now-in-milliseconds readers.

/// A monotonic "now in milliseconds" reader, anchored at construction.
///
/// The scheduler only ever compares these values against each other, so
/// the epoch is arbitrary; zero is the moment the clock was created.
pub trait Clock {
    /// Milliseconds elapsed since this clock was created.
    fn now_ms(&self) -> u64;
}

/// Clock backed by [`std::time::Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: std::time::Instant,
}

impl MonotonicClock {
    /// Anchor a new clock at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Clock backed by [`tokio::time::Instant`].
///
/// Under a paused tokio runtime (`start_paused` tests) this clock advances
/// with the virtual time, which makes driver behavior fully deterministic.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    /// Anchor a new clock at the current tokio instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_clock_follows_virtual_time() {
        let clock = TokioClock::new();
        assert_eq!(clock.now_ms(), 0);
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        assert_eq!(clock.now_ms(), 50);
    }
}

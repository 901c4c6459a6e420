//! Monotonic millisecond clocks for interval accounting
//!
//! The ledger never reads wall-clock time directly. Every timestamp it stamps
//! on an interval comes from a [`Clock`], so tests and trace replay can drive
//! time by hand while production code uses [`MonotonicClock`].
//!
//! # Example
//!
//! ```
//! use sensor_ledger::clock::{Clock, ManualClock};
//!
//! let clock = ManualClock::new();
//! clock.set(10);
//! clock.advance(5);
//! assert_eq!(clock.now_ms(), 15);
//! ```

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Source of elapsed milliseconds since an arbitrary fixed epoch
///
/// Readings are expected to be non-decreasing. The ledger tolerates a clock
/// that goes backwards by clamping the affected interval to zero.
pub trait Clock: Send + Sync + Debug {
    fn now_ms(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Monotonic clock backed by `Instant::now()`
///
/// The epoch is the moment the clock was constructed.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
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
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Externally driven clock
///
/// Thread-safe: the reading is a single atomic, so a `ManualClock` can be
/// shared through `Arc` between a collector and the code advancing time.
///
/// # Example
///
/// ```
/// use sensor_ledger::clock::{Clock, ManualClock};
/// use std::sync::Arc;
///
/// let clock = Arc::new(ManualClock::with_value(100));
/// let shared = Arc::clone(&clock);
/// clock.advance(20);
/// assert_eq!(shared.now_ms(), 120);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    /// Create a manual clock reading 0
    pub const fn new() -> Self {
        Self {
            millis: AtomicU64::new(0),
        }
    }

    /// Create a manual clock with a specific starting reading
    pub const fn with_value(initial_ms: u64) -> Self {
        Self {
            millis: AtomicU64::new(initial_ms),
        }
    }

    /// Jump to an absolute reading
    ///
    /// Setting a value lower than the current one is allowed; it is how tests
    /// simulate a clock reset.
    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    /// Move the reading forward, returning the new value
    pub fn advance(&self, delta_ms: u64) -> u64 {
        self.millis
            .fetch_add(delta_ms, Ordering::SeqCst)
            .saturating_add(delta_ms)
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_starts_at_zero() {
        let clock = ManualClock::new();
        assert_eq!(clock.now_ms(), 0);
    }

    #[test]
    fn test_manual_clock_set_and_advance() {
        let clock = ManualClock::with_value(7);
        assert_eq!(clock.advance(3), 10);
        assert_eq!(clock.now_ms(), 10);

        clock.set(2);
        assert_eq!(clock.now_ms(), 2);
    }

    #[test]
    fn test_arc_clock_delegates() {
        let clock = Arc::new(ManualClock::new());
        let handle: Arc<dyn Clock> = clock.clone();
        clock.set(42);
        assert_eq!(handle.now_ms(), 42);
    }

    #[test]
    fn test_monotonic_clock_non_decreasing() {
        let clock = MonotonicClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }

    #[test]
    fn test_manual_clock_thread_safety() {
        use std::thread;

        let clock = Arc::new(ManualClock::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let clock = Arc::clone(&clock);
                thread::spawn(move || {
                    for _ in 0..100 {
                        clock.advance(1);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(clock.now_ms(), 400);
    }
}

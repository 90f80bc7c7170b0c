// crates/clock-gate-core/src/runtime/clock.rs
// ============================================================================
// Module: Clock Gate Clocks
// Description: Monotonic and manually driven clock implementations.
// Purpose: Provide wall-clock and virtual-time sources for the gate.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! [`MonotonicClock`] reads `Instant` and sleeps the thread. [`ManualClock`]
//! only moves when advanced or slept on, which makes timeout behavior exact
//! and instantaneous in tests and in virtual-time replays.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use crate::interfaces::Clock;

// ============================================================================
// SECTION: Monotonic Clock
// ============================================================================

/// Real monotonic clock measured from its construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    /// Construction instant.
    origin: Instant,
}

impl MonotonicClock {
    /// Creates a clock whose origin is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

// ============================================================================
// SECTION: Manual Clock
// ============================================================================

/// Virtual clock advanced explicitly; sleeping advances it by the sleep length.
///
/// # Invariants
/// - Clones share one time value.
/// - Time never moves backwards.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    /// Elapsed virtual nanoseconds.
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock at virtual time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves virtual time forward.
    pub fn advance(&self, duration: Duration) {
        let step = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        let _ = self.nanos.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
            Some(current.saturating_add(step))
        });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

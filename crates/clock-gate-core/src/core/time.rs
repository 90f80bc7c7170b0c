// crates/clock-gate-core/src/core/time.rs
// ============================================================================
// Module: Clock Gate Timeouts
// Description: Phase timeouts with an explicit "wait forever" sentinel.
// Purpose: Bound the start handshake and per-step clock waits.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Gate phases are bounded by a [`Timeout`]. Host configuration expresses
//! timeouts in seconds with `-1` meaning "never time out"; that sentinel maps
//! to [`Timeout::Infinite`] so no caller ever compares against a magic number.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Host-facing sentinel seconds value meaning "wait forever".
pub const INFINITE_TIMEOUT_SECS: f64 = -1.0;

// ============================================================================
// SECTION: Timeout
// ============================================================================

/// Errors returned when converting host timeout values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimeoutError {
    /// Value is neither a positive finite number nor the sentinel.
    #[error("timeout must be positive seconds or -1 for infinite (got {0})")]
    Invalid(f64),
}

/// Upper bound on how long a gate phase may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Expire once this much time has elapsed.
    Finite(Duration),
    /// Never expire.
    Infinite,
}

impl Timeout {
    /// Converts host seconds (`-1` for infinite) into a timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TimeoutError::Invalid`] for zero, negative (other than `-1`),
    /// or non-finite values.
    #[allow(clippy::float_cmp, reason = "Sentinel is an exact host value.")]
    pub fn from_secs_f64(secs: f64) -> Result<Self, TimeoutError> {
        if secs == INFINITE_TIMEOUT_SECS {
            return Ok(Self::Infinite);
        }
        if !secs.is_finite() || secs <= 0.0 {
            return Err(TimeoutError::Invalid(secs));
        }
        Duration::try_from_secs_f64(secs).map(Self::Finite).map_err(|_| TimeoutError::Invalid(secs))
    }

    /// Returns true once `elapsed` has reached the bound.
    #[must_use]
    pub fn is_expired(self, elapsed: Duration) -> bool {
        match self {
            Self::Finite(limit) => elapsed >= limit,
            Self::Infinite => false,
        }
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(limit) => write!(f, "{:.1} sec", limit.as_secs_f64()),
            Self::Infinite => f.write_str("infinite"),
        }
    }
}

// crates/clock-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Clock Gate Interfaces
// Description: Bus, channel, host, and clock contracts used by the gate.
// Purpose: Keep the gate independent of any concrete bus client or host engine.
// Dependencies: thiserror, crate::core
// ============================================================================

//! ## Overview
//! The gate consumes two things from its collaborators: a bus that opens
//! consume-only channels, and a host that receives ticks and stop requests.
//! Time is read through [`Clock`] so tests can run on virtual time.
//! Invariants:
//! - `MessageChannel::poll` never blocks.
//! - `MessageChannel::close` is idempotent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use thiserror::Error;

use crate::core::ChannelSpec;
use crate::core::ClockTick;
use crate::core::Message;
use crate::core::StopReason;

// ============================================================================
// SECTION: Message Bus
// ============================================================================

/// Errors raised while opening a channel.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Every variant is fatal to gate start-up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelInitError {
    /// Transport or broker connection failed.
    #[error("channel transport error on {topic}: {reason}")]
    Transport {
        /// Topic being opened.
        topic: String,
        /// Failure detail.
        reason: String,
    },
    /// Consumer or topic configuration was rejected.
    #[error("channel configuration error on {topic}: {reason}")]
    Configuration {
        /// Topic being opened.
        topic: String,
        /// Failure detail.
        reason: String,
    },
    /// The consumer could not be positioned at its start offset.
    #[error("channel assignment error on {topic}: {reason}")]
    Assignment {
        /// Topic being opened.
        topic: String,
        /// Failure detail.
        reason: String,
    },
}

/// Errors raised by an open channel.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The bus could not answer the request.
    #[error("channel unavailable: {0}")]
    Unavailable(String),
    /// The channel was already closed.
    #[error("channel closed")]
    Closed,
}

/// Absolute read position for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPosition {
    /// First retained record.
    Beginning,
    /// Log offset of the next record to deliver.
    Offset(i64),
}

/// Consume-only connection to one topic.
pub trait MessageChannel: Send {
    /// Returns the topic this channel reads.
    fn topic(&self) -> &str;

    /// Attempts to receive one message without blocking.
    fn poll(&mut self) -> Option<Message>;

    /// Returns the offset the next produced record will receive.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the bus cannot report the watermark.
    fn high_watermark(&mut self) -> Result<i64, ChannelError>;

    /// Repositions the channel.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the position cannot be assigned.
    fn seek(&mut self, position: StartPosition) -> Result<(), ChannelError>;

    /// Releases the channel; later calls are no-ops.
    fn close(&mut self);
}

/// Factory for consume-only channels.
pub trait MessageBus {
    /// Opens a channel without positioning it.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelInitError`] on transport or configuration failure.
    fn connect(&self, spec: &ChannelSpec) -> Result<Box<dyn MessageChannel>, ChannelInitError>;
}

// ============================================================================
// SECTION: Host
// ============================================================================

/// Errors reported by the host while handling a tick.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The host could not process the tick.
    #[error("host tick failed: {0}")]
    TickFailed(String),
}

/// Simulation host driven by the gate.
pub trait GateHost {
    /// Delivers one clock tick.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] when the host cannot process the tick.
    fn tick(&mut self, tick: &ClockTick) -> Result<(), HostError>;

    /// Requests a graceful simulation stop.
    fn request_stop(&mut self, reason: StopReason);
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Monotonic time source with a matching sleep.
pub trait Clock {
    /// Returns time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;

    /// Suspends the caller for roughly `duration`.
    fn sleep(&self, duration: Duration);
}

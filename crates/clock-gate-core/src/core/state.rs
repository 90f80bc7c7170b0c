// crates/clock-gate-core/src/core/state.rs
// ============================================================================
// Module: Clock Gate State Model
// Description: Gate phases, stop reasons, and step outcomes.
// Purpose: Describe where the orchestration gate is and what a step did.
// Dependencies: serde, crate::core::message
// ============================================================================

//! ## Overview
//! The gate moves `WaitingStart -> Running -> {TimedOut | StoppedByCommand}`.
//! Both terminal phases correspond to a host stop request; the
//! [`StopReason`] records which condition fired.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::message::ClockTick;

// ============================================================================
// SECTION: Phases
// ============================================================================

/// Orchestration gate phase.
///
/// # Invariants
/// - Only the gate's own step loop mutates the phase.
/// - `TimedOut` and `StoppedByCommand` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatePhase {
    /// Waiting for the orchestrator start command.
    WaitingStart,
    /// Gating host ticks on clock messages.
    Running,
    /// A start or clock timeout elapsed.
    TimedOut,
    /// The orchestrator issued a stop command.
    StoppedByCommand,
}

impl GatePhase {
    /// Returns true for phases that no longer process steps.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::TimedOut | Self::StoppedByCommand)
    }

    /// Returns a stable label for the phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WaitingStart => "waiting_start",
            Self::Running => "running",
            Self::TimedOut => "timed_out",
            Self::StoppedByCommand => "stopped_by_command",
        }
    }
}

impl fmt::Display for GatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the gate asked the host to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// No start command arrived within the start timeout.
    StartTimeout,
    /// No clock message arrived within the clock timeout.
    ClockTimeout,
    /// The orchestrator sent a stop command.
    StopCommand,
}

impl StopReason {
    /// Returns the terminal phase that corresponds to the reason.
    #[must_use]
    pub const fn phase(self) -> GatePhase {
        match self {
            Self::StartTimeout | Self::ClockTimeout => GatePhase::TimedOut,
            Self::StopCommand => GatePhase::StoppedByCommand,
        }
    }

    /// Returns a stable label for the reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StartTimeout => "start_timeout",
            Self::ClockTimeout => "clock_timeout",
            Self::StopCommand => "stop_command",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Steps
// ============================================================================

/// Host simulation step classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Step at which external-event side effects are permitted.
    Major,
    /// Intermediate solver step; the gate does nothing.
    Minor,
}

/// Result of one gate step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Minor step; nothing was polled.
    Skipped,
    /// Start command received; the gate is now running.
    Started,
    /// Clock message received and exactly one host tick fired.
    Ticked(ClockTick),
    /// The gate requested a host stop during this step.
    Stopped(StopReason),
    /// The gate was already in a terminal phase.
    Halted(GatePhase),
}

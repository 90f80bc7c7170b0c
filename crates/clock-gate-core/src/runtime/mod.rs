// crates/clock-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Clock Gate Runtime
// Description: Clocks, command recognition, consumer setup, and the gate.
// Purpose: Drive a host simulation from clock and orchestrator channels.
// Dependencies: crate::{codec, core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement the orchestration gate and the helpers it is
//! built from. The gate is single-threaded and driven synchronously by the
//! host, one call per simulation step.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod clock;
pub mod command;
pub mod consumer;
pub mod gate;

#[cfg(test)]
mod tests;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use clock::ManualClock;
pub use clock::MonotonicClock;
pub use command::OrchestratorCommand;
pub use command::is_orchestrator_command;
pub use command::read_command;
pub use consumer::open_consumer;
pub use gate::GateError;
pub use gate::GateSettings;
pub use gate::OrchestrationGate;

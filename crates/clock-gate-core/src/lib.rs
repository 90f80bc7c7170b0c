// crates/clock-gate-core/src/lib.rs
// ============================================================================
// Module: Clock Gate Core Library
// Description: Public API surface for the clock gate core.
// Purpose: Expose core types, the document codec, interfaces, and the gate.
// Dependencies: crate::{codec, core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Clock gate core lets a host simulation advance in lockstep with an
//! external clock stream while an orchestrator controls start and stop over a
//! second channel. It also provides the field codec that maps flat typed
//! value lists to and from enveloped JSON payloads. It is bus-agnostic and
//! integrates through the [`MessageBus`] and [`GateHost`] interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod codec;
pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use codec::CodecError;
pub use codec::CodecLimits;
pub use codec::DecodeReport;
pub use codec::EncodeOutput;
pub use codec::FieldCodec;
pub use codec::InputLength;
pub use codec::JSON_DATA_TYPE_NAME;
pub use codec::PayloadEnvelope;
pub use interfaces::ChannelError;
pub use interfaces::ChannelInitError;
pub use interfaces::Clock;
pub use interfaces::GateHost;
pub use interfaces::HostError;
pub use interfaces::MessageBus;
pub use interfaces::MessageChannel;
pub use interfaces::StartPosition;
pub use runtime::GateError;
pub use runtime::GateSettings;
pub use runtime::ManualClock;
pub use runtime::MonotonicClock;
pub use runtime::OrchestrationGate;
pub use runtime::OrchestratorCommand;
pub use runtime::is_orchestrator_command;
pub use runtime::open_consumer;
pub use runtime::read_command;

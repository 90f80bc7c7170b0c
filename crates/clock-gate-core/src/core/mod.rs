// crates/clock-gate-core/src/core/mod.rs
// ============================================================================
// Module: Clock Gate Core Types
// Description: Field paths, typed values, messages, timeouts, and gate state.
// Purpose: Shared data model for the codec, interfaces, and runtime.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Plain data types with no I/O. Everything here is constructed by callers and
//! passed by value or reference into the codec and the gate runtime.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod field;
pub mod message;
pub mod state;
pub mod time;
pub mod value;


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use field::FieldPath;
pub use field::FieldPathError;
pub use field::LeafType;
pub use field::METADATA_NAMESPACE;
pub use message::ChannelSpec;
pub use message::ClockTick;
pub use message::Message;
pub use message::OffsetPolicy;
pub use message::PayloadLimits;
pub use state::GatePhase;
pub use state::StepKind;
pub use state::StepOutcome;
pub use state::StopReason;
pub use time::INFINITE_TIMEOUT_SECS;
pub use time::Timeout;
pub use time::TimeoutError;
pub use value::Scalar;
pub use value::TypedValue;

// crates/clock-gate-bus/src/lib.rs
// ============================================================================
// Module: Clock Gate Bus Library
// Description: Reference message bus implementations for the clock gate.
// Purpose: Provide in-process and scripted buses behind the core interfaces.
// Dependencies: clock-gate-core, serde, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`MemoryBus`] is an in-process topic log with high watermarks, per-group
//! committed offsets, and failure injection. [`ReplayBus`] plays a JSON-lines
//! script onto a memory bus as its clock advances.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod memory;
pub mod replay;


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use memory::AUTO_OFFSET_RESET;
pub use memory::MemoryBus;
pub use memory::MemoryBusError;
pub use memory::MemoryChannel;
pub use replay::ReplayBus;
pub use replay::ReplayError;
pub use replay::ReplayRecord;
pub use replay::ReplayScript;

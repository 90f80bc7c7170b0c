// crates/clock-gate-config/src/lib.rs
// ============================================================================
// Module: Clock Gate Config Library
// Description: Canonical config model and validation for clock-gate.toml.
// Purpose: Single source of truth for clock gate configuration semantics.
// Dependencies: clock-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! `clock-gate-config` defines the configuration model for the clock gate and
//! its field codec. It provides strict, fail-closed validation and converts a
//! validated file into core [`clock_gate_core::GateSettings`] and
//! [`clock_gate_core::FieldCodec`] values.
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;

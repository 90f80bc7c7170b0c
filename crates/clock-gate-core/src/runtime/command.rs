// crates/clock-gate-core/src/runtime/command.rs
// ============================================================================
// Module: Clock Gate Orchestrator Commands
// Description: Recognition of start/stop commands on the command channel.
// Purpose: Decode just enough of a command payload to read `data.command`.
// Dependencies: crate::codec, crate::core
// ============================================================================

//! ## Overview
//! Command payloads use the standard envelope, so wrapped generic JSON
//! commands are unwrapped before `data.command` is read. Recognition never
//! fails loudly: anything that is not an exact, case-sensitive match is
//! simply "not this command".

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use crate::codec::CodecError;
use crate::codec::InputLength;
use crate::codec::PayloadEnvelope;
use crate::codec::decode_field;
use crate::codec::frame_input;
use crate::core::FieldPath;
use crate::core::LeafType;
use crate::core::Message;
use crate::core::PayloadLimits;
use crate::core::TypedValue;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Dotted path of the command string inside a command payload.
pub const COMMAND_FIELD_PATH: &str = "data.command";

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Orchestrator commands understood by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorCommand {
    /// Leave `WaitingStart` and begin gating ticks.
    Start,
    /// Stop the simulation.
    Stop,
}

impl OrchestratorCommand {
    /// Returns the wire value of the command.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }
}

impl fmt::Display for OrchestratorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads the `data.command` string from a command payload.
///
/// # Errors
///
/// Returns [`CodecError`] when the payload is malformed, has no data root, or
/// `data.command` is missing or not a string.
pub fn read_command(payload: &[u8]) -> Result<String, CodecError> {
    let path = FieldPath::parse(COMMAND_FIELD_PATH, LeafType::String)?;
    let envelope = PayloadEnvelope::parse(payload)?;
    let data = envelope.root_for(&path).ok_or_else(|| CodecError::FieldNotFound {
        path: COMMAND_FIELD_PATH.to_string(),
        segment: path.namespace().to_string(),
    })?;
    match decode_field(data, &path)? {
        TypedValue::String(command) => Ok(command),
        other => Err(CodecError::TypeMismatch {
            path: COMMAND_FIELD_PATH.to_string(),
            expected: LeafType::String,
            found: other.leaf_type().as_str(),
        }),
    }
}

/// Returns true when the payload carries exactly the expected command.
#[must_use]
pub fn is_orchestrator_command(payload: &[u8], expected: OrchestratorCommand) -> bool {
    read_command(payload).is_ok_and(|command| command == expected.as_str())
}

// ============================================================================
// SECTION: Scratch Buffers
// ============================================================================

/// Bounded copy of the last command message.
///
/// # Invariants
/// - Contents never exceed the configured payload and key limits.
/// - Cleared before every load and after every rejected command.
#[derive(Debug, Clone)]
pub(crate) struct CommandScratch {
    /// Payload bytes, truncated to the payload limit.
    payload: Vec<u8>,
    /// Key bytes, truncated to the key limit.
    key: Vec<u8>,
    /// Buffer capacities.
    limits: PayloadLimits,
}

impl CommandScratch {
    /// Creates empty scratch buffers with the given capacities.
    pub(crate) fn new(limits: PayloadLimits) -> Self {
        Self {
            payload: Vec::with_capacity(limits.max_payload_len),
            key: Vec::with_capacity(limits.max_key_len),
            limits,
        }
    }

    /// Replaces the contents with a bounded copy of `message`.
    pub(crate) fn load(&mut self, message: &Message) {
        self.clear();
        let payload_len = message.payload.len().min(self.limits.max_payload_len);
        let key_len = message.key.len().min(self.limits.max_key_len);
        self.payload.extend_from_slice(&message.payload[..payload_len]);
        self.key.extend_from_slice(&message.key[..key_len]);
    }

    /// Empties both buffers.
    pub(crate) fn clear(&mut self) {
        self.payload.clear();
        self.key.clear();
    }

    /// Returns the payload up to its first nul byte.
    pub(crate) fn payload(&self) -> &[u8] {
        frame_input(&self.payload, InputLength::NulTerminated)
    }

    /// Returns the key bytes.
    pub(crate) fn key(&self) -> &[u8] {
        &self.key
    }
}

// crates/clock-gate-core/src/core/message.rs
// ============================================================================
// Module: Clock Gate Messages
// Description: Bus messages, channel descriptors, and clock tick outputs.
// Purpose: Carry consumed records from bus channels to the gate and host.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Message`] is one record consumed from a bus topic. Channels are opened
//! from a [`ChannelSpec`] whose [`OffsetPolicy`] decides where reading starts.
//! When the gate accepts a clock message it hands a [`ClockTick`] to the host,
//! with payload and key truncated to the configured [`PayloadLimits`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Messages
// ============================================================================

/// Record consumed from a bus topic.
///
/// # Invariants
/// - Ownership transfers to the caller of `poll`; channels keep no alias.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Raw payload bytes.
    pub payload: Vec<u8>,
    /// Raw key bytes (empty when the record has no key).
    pub key: Vec<u8>,
    /// Producer or broker timestamp in unix milliseconds.
    pub timestamp_millis: Option<i64>,
}

impl Message {
    /// Creates a message with a payload and no key or timestamp.
    #[must_use]
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            key: Vec::new(),
            timestamp_millis: None,
        }
    }

    /// Sets the record key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = key.into();
        self
    }

    /// Sets the record timestamp.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp_millis: i64) -> Self {
        self.timestamp_millis = Some(timestamp_millis);
        self
    }
}

// ============================================================================
// SECTION: Channel Descriptors
// ============================================================================

/// Where a newly opened channel begins reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetPolicy {
    /// Skip backlog: start at the topic high watermark.
    #[default]
    Latest,
    /// Replay the full retained log.
    Earliest,
    /// Resume from the group's committed offset, or the bus default.
    StoredOrDefault,
}

impl OffsetPolicy {
    /// Returns a stable label for the policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Earliest => "earliest",
            Self::StoredOrDefault => "stored_or_default",
        }
    }
}

impl fmt::Display for OffsetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptor for a consume-only channel on one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    /// Topic name.
    pub topic: String,
    /// Consumer group name.
    pub group: String,
    /// Initial offset policy.
    pub offset_policy: OffsetPolicy,
    /// Adapter passthrough properties (consumer and topic configuration).
    pub properties: BTreeMap<String, String>,
}

impl ChannelSpec {
    /// Creates a channel descriptor without passthrough properties.
    #[must_use]
    pub fn new(
        topic: impl Into<String>,
        group: impl Into<String>,
        offset_policy: OffsetPolicy,
    ) -> Self {
        Self {
            topic: topic.into(),
            group: group.into(),
            offset_policy,
            properties: BTreeMap::new(),
        }
    }
}

// ============================================================================
// SECTION: Clock Ticks
// ============================================================================

/// Output buffer capacities for delivered payloads and keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadLimits {
    /// Maximum payload bytes delivered to the host.
    pub max_payload_len: usize,
    /// Maximum key bytes delivered to the host.
    pub max_key_len: usize,
}

impl Default for PayloadLimits {
    fn default() -> Self {
        Self {
            max_payload_len: 1024,
            max_key_len: 128,
        }
    }
}

/// Clock message delivered to the host with one tick.
///
/// # Invariants
/// - `payload.len() <= max_payload_len` and `key.len() <= max_key_len`.
/// - `timestamp_millis` is `None` unless timestamp output is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockTick {
    /// Payload bytes, truncated to the payload limit.
    pub payload: Vec<u8>,
    /// Delivered payload length.
    pub payload_len: u32,
    /// Key bytes, truncated to the key limit.
    pub key: Vec<u8>,
    /// Delivered key length.
    pub key_len: u32,
    /// Record timestamp when timestamp output is enabled.
    pub timestamp_millis: Option<i64>,
    /// True when payload or key was cut to fit the limits.
    pub truncated: bool,
}

impl ClockTick {
    /// Builds a tick from a consumed clock message.
    #[must_use]
    pub fn from_message(message: Message, limits: PayloadLimits, emit_timestamp: bool) -> Self {
        let Message {
            mut payload,
            mut key,
            timestamp_millis,
        } = message;
        let truncated = payload.len() > limits.max_payload_len || key.len() > limits.max_key_len;
        payload.truncate(limits.max_payload_len);
        key.truncate(limits.max_key_len);
        Self {
            payload_len: u32::try_from(payload.len()).unwrap_or(u32::MAX),
            key_len: u32::try_from(key.len()).unwrap_or(u32::MAX),
            payload,
            key,
            timestamp_millis: if emit_timestamp { timestamp_millis } else { None },
            truncated,
        }
    }
}

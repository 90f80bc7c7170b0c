// crates/clock-gate-bus/src/memory.rs
// ============================================================================
// Module: Clock Gate Memory Bus
// Description: In-process topic logs with watermarks and committed offsets.
// Purpose: Reference message bus for tests, replays, and local runs.
// Dependencies: clock-gate-core, thiserror, tracing
// ============================================================================

//! ## Overview
//! Each topic is an append-only log; a record's offset is its index. Channels
//! keep their own read position and commit it per consumer group after every
//! delivered record, so a later `StoredOrDefault` channel in the same group
//! resumes where the previous one stopped.
//! Invariants:
//! - The high watermark equals the number of records in the topic.
//! - Offsets are never reused.
//!
//! Passthrough properties: `auto.offset.reset` (`earliest` | `latest`) picks
//! the start position when a group has no committed offset. Any other value
//! is a configuration error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use clock_gate_core::ChannelError;
use clock_gate_core::ChannelInitError;
use clock_gate_core::ChannelSpec;
use clock_gate_core::Message;
use clock_gate_core::MessageBus;
use clock_gate_core::MessageChannel;
use clock_gate_core::StartPosition;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Passthrough property selecting the start position without a committed offset.
pub const AUTO_OFFSET_RESET: &str = "auto.offset.reset";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// In-memory bus errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryBusError {
    /// Shared bus state was poisoned by a panicking holder.
    #[error("memory bus state poisoned")]
    Poisoned,
}

// ============================================================================
// SECTION: State
// ============================================================================

/// Shared topic logs and group offsets.
#[derive(Debug, Default)]
struct BusState {
    /// Records per topic in offset order.
    topics: BTreeMap<String, Vec<Message>>,
    /// Next offset to read, keyed by `(group, topic)`.
    committed: BTreeMap<(String, String), i64>,
    /// Topics whose watermark query fails.
    failing_watermarks: BTreeSet<String>,
    /// Topics whose connect fails.
    failing_connects: BTreeSet<String>,
}

impl BusState {
    /// Returns the watermark of `topic` (zero when it does not exist yet).
    fn watermark(&self, topic: &str) -> i64 {
        self.topics.get(topic).map_or(0, |log| offset_of(log.len()))
    }
}

// ============================================================================
// SECTION: Memory Bus
// ============================================================================

/// In-process message bus; clones share the same topics.
#[derive(Debug, Clone, Default)]
pub struct MemoryBus {
    /// Shared state.
    state: Arc<Mutex<BusState>>,
}

impl MemoryBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record and returns its offset.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryBusError::Poisoned`] when the shared state is poisoned.
    pub fn publish(&self, topic: &str, message: Message) -> Result<i64, MemoryBusError> {
        let mut state = self.lock()?;
        let log = state.topics.entry(topic.to_string()).or_default();
        log.push(message);
        let offset = offset_of(log.len()) - 1;
        debug!(topic, offset, "published record");
        Ok(offset)
    }

    /// Returns the current high watermark of `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryBusError::Poisoned`] when the shared state is poisoned.
    pub fn high_watermark(&self, topic: &str) -> Result<i64, MemoryBusError> {
        Ok(self.lock()?.watermark(topic))
    }

    /// Returns the committed offset of `group` on `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryBusError::Poisoned`] when the shared state is poisoned.
    pub fn committed_offset(
        &self,
        group: &str,
        topic: &str,
    ) -> Result<Option<i64>, MemoryBusError> {
        Ok(self.lock()?.committed.get(&(group.to_string(), topic.to_string())).copied())
    }

    /// Makes watermark queries on `topic` fail.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryBusError::Poisoned`] when the shared state is poisoned.
    pub fn fail_watermark(&self, topic: &str) -> Result<(), MemoryBusError> {
        self.lock()?.failing_watermarks.insert(topic.to_string());
        Ok(())
    }

    /// Makes channel connects on `topic` fail.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryBusError::Poisoned`] when the shared state is poisoned.
    pub fn fail_connect(&self, topic: &str) -> Result<(), MemoryBusError> {
        self.lock()?.failing_connects.insert(topic.to_string());
        Ok(())
    }

    /// Opens a channel positioned at the group's committed offset or the reset default.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelInitError`] when connects on the topic are set to fail,
    /// the passthrough properties are invalid, or the state is poisoned.
    pub fn open(&self, spec: &ChannelSpec) -> Result<MemoryChannel, ChannelInitError> {
        let reset = match spec.properties.get(AUTO_OFFSET_RESET).map(String::as_str) {
            None | Some("earliest") => OffsetReset::Earliest,
            Some("latest") => OffsetReset::Latest,
            Some(other) => {
                return Err(ChannelInitError::Configuration {
                    topic: spec.topic.clone(),
                    reason: format!("unsupported {AUTO_OFFSET_RESET} value: {other}"),
                });
            }
        };
        let state = self.lock().map_err(|err| ChannelInitError::Transport {
            topic: spec.topic.clone(),
            reason: err.to_string(),
        })?;
        if state.failing_connects.contains(&spec.topic) {
            return Err(ChannelInitError::Transport {
                topic: spec.topic.clone(),
                reason: "broker connection refused".to_string(),
            });
        }
        let committed = state.committed.get(&(spec.group.clone(), spec.topic.clone())).copied();
        let position = committed.unwrap_or(match reset {
            OffsetReset::Earliest => 0,
            OffsetReset::Latest => state.watermark(&spec.topic),
        });
        drop(state);
        debug!(
            topic = spec.topic.as_str(),
            group = spec.group.as_str(),
            position,
            "memory channel opened"
        );
        Ok(MemoryChannel {
            topic: spec.topic.clone(),
            group: spec.group.clone(),
            position,
            state: Arc::clone(&self.state),
            closed: false,
        })
    }

    /// Locks the shared state.
    fn lock(&self) -> Result<MutexGuard<'_, BusState>, MemoryBusError> {
        self.state.lock().map_err(|_| MemoryBusError::Poisoned)
    }
}

impl MessageBus for MemoryBus {
    fn connect(&self, spec: &ChannelSpec) -> Result<Box<dyn MessageChannel>, ChannelInitError> {
        Ok(Box::new(self.open(spec)?))
    }
}

/// Start position used when a group has no committed offset.
#[derive(Debug, Clone, Copy)]
enum OffsetReset {
    /// Offset zero.
    Earliest,
    /// Current watermark.
    Latest,
}

// ============================================================================
// SECTION: Memory Channel
// ============================================================================

/// Consume-only channel over one in-memory topic.
#[derive(Debug)]
pub struct MemoryChannel {
    /// Topic name.
    topic: String,
    /// Consumer group used for commits.
    group: String,
    /// Next offset to deliver.
    position: i64,
    /// Shared bus state.
    state: Arc<Mutex<BusState>>,
    /// True once closed.
    closed: bool,
}

impl MemoryChannel {
    /// Returns the next offset this channel will deliver.
    #[must_use]
    pub const fn position(&self) -> i64 {
        self.position
    }
}

impl MessageChannel for MemoryChannel {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn poll(&mut self) -> Option<Message> {
        if self.closed {
            return None;
        }
        let Ok(mut state) = self.state.lock() else {
            warn!(topic = self.topic.as_str(), "memory bus state poisoned; no message");
            return None;
        };
        let index = usize::try_from(self.position).ok()?;
        let message = state.topics.get(&self.topic)?.get(index)?.clone();
        self.position += 1;
        state.committed.insert((self.group.clone(), self.topic.clone()), self.position);
        Some(message)
    }

    fn high_watermark(&mut self) -> Result<i64, ChannelError> {
        if self.closed {
            return Err(ChannelError::Closed);
        }
        let state =
            self.state.lock().map_err(|_| ChannelError::Unavailable("state poisoned".to_string()))?;
        if state.failing_watermarks.contains(&self.topic) {
            return Err(ChannelError::Unavailable(format!(
                "watermark query timed out for {}",
                self.topic
            )));
        }
        Ok(state.watermark(&self.topic))
    }

    fn seek(&mut self, position: StartPosition) -> Result<(), ChannelError> {
        if self.closed {
            return Err(ChannelError::Closed);
        }
        self.position = match position {
            StartPosition::Beginning => 0,
            StartPosition::Offset(offset) if offset >= 0 => offset,
            StartPosition::Offset(offset) => {
                return Err(ChannelError::Unavailable(format!("negative offset {offset}")));
            }
        };
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            debug!(topic = self.topic.as_str(), position = self.position, "memory channel closed");
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts a log length to an offset.
fn offset_of(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

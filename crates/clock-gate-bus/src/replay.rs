// crates/clock-gate-bus/src/replay.rs
// ============================================================================
// Module: Clock Gate Replay Bus
// Description: Time-released JSON-lines scripts played onto a memory bus.
// Purpose: Reproduce orchestrator and clock traffic against any clock.
// Dependencies: clock-gate-core, serde, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! A replay script is one JSON object per line:
//! `{"topic": "...", "at_ms": 500, "payload": {...}, "key": "k", "timestamp_ms": 1}`.
//! `payload` may be an object (serialized compactly) or a raw string. Blank
//! lines and lines starting with `#` are skipped. Records become visible on
//! their topic once the replay clock reaches `at_ms`; release happens lazily
//! before every poll and watermark query.
//! Security posture: scripts are untrusted input with size and count limits.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use clock_gate_core::ChannelError;
use clock_gate_core::ChannelInitError;
use clock_gate_core::ChannelSpec;
use clock_gate_core::Clock;
use clock_gate_core::Message;
use clock_gate_core::MessageBus;
use clock_gate_core::MessageChannel;
use clock_gate_core::StartPosition;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

use crate::memory::MemoryBus;
use crate::memory::MemoryBusError;
use crate::memory::MemoryChannel;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum replay script size in bytes.
pub const MAX_SCRIPT_BYTES: u64 = 16 * 1024 * 1024;
/// Maximum number of records in one script.
pub const MAX_SCRIPT_RECORDS: usize = 100_000;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Replay script and replay bus errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    /// Script file could not be read.
    #[error("replay script io error: {0}")]
    Io(String),
    /// A script line is malformed.
    #[error("replay script line {line}: {reason}")]
    Parse {
        /// One-based line number.
        line: usize,
        /// Failure detail.
        reason: String,
    },
    /// Script exceeds size or record limits.
    #[error("replay script too large: {0}")]
    TooLarge(String),
    /// Releasing a record onto the bus failed.
    #[error(transparent)]
    Bus(#[from] MemoryBusError),
}

// ============================================================================
// SECTION: Script
// ============================================================================

/// One scheduled record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayRecord {
    /// Destination topic.
    pub topic: String,
    /// Release time relative to the replay clock origin.
    pub at: Duration,
    /// Record contents.
    pub message: Message,
}

/// Raw script line.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptLine {
    /// Destination topic.
    topic: String,
    /// Release time in milliseconds.
    at_ms: u64,
    /// Object payload or raw string payload.
    payload: Value,
    /// Optional record key.
    #[serde(default)]
    key: Option<String>,
    /// Optional record timestamp.
    #[serde(default)]
    timestamp_ms: Option<i64>,
}

/// Parsed replay script ordered by release time.
///
/// # Invariants
/// - Records are sorted by `at`; ties keep script order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayScript {
    /// Scheduled records.
    records: Vec<ReplayRecord>,
}

impl ReplayScript {
    /// Parses a JSON-lines script.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Parse`] for malformed lines and
    /// [`ReplayError::TooLarge`] when the record limit is exceeded.
    pub fn parse(text: &str) -> Result<Self, ReplayError> {
        let mut records = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if records.len() == MAX_SCRIPT_RECORDS {
                return Err(ReplayError::TooLarge(format!(
                    "more than {MAX_SCRIPT_RECORDS} records"
                )));
            }
            let parsed: ScriptLine = serde_json::from_str(line).map_err(|err| ReplayError::Parse {
                line: index + 1,
                reason: err.to_string(),
            })?;
            records.push(record_from_line(parsed, index + 1)?);
        }
        records.sort_by_key(|record| record.at);
        Ok(Self { records })
    }

    /// Loads and parses a script file.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Io`] when the file cannot be read, plus every
    /// error [`ReplayScript::parse`] returns.
    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let metadata = fs::metadata(path).map_err(|err| ReplayError::Io(err.to_string()))?;
        if metadata.len() > MAX_SCRIPT_BYTES {
            return Err(ReplayError::TooLarge(format!("{} bytes", metadata.len())));
        }
        let text = fs::read_to_string(path).map_err(|err| ReplayError::Io(err.to_string()))?;
        Self::parse(&text)
    }

    /// Returns the scheduled records.
    #[must_use]
    pub fn records(&self) -> &[ReplayRecord] {
        &self.records
    }

    /// Returns the release time of the last record.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.records.last().map_or(Duration::ZERO, |record| record.at)
    }
}

/// Converts a raw script line into a record.
fn record_from_line(line: ScriptLine, number: usize) -> Result<ReplayRecord, ReplayError> {
    if line.topic.is_empty() {
        return Err(ReplayError::Parse {
            line: number,
            reason: "topic must be non-empty".to_string(),
        });
    }
    let payload = match line.payload {
        Value::String(text) => text.into_bytes(),
        Value::Object(map) => serde_json::to_vec(&map).map_err(|err| ReplayError::Parse {
            line: number,
            reason: err.to_string(),
        })?,
        _ => {
            return Err(ReplayError::Parse {
                line: number,
                reason: "payload must be an object or a string".to_string(),
            });
        }
    };
    let mut message = Message::new(payload);
    if let Some(key) = line.key {
        message = message.with_key(key);
    }
    if let Some(timestamp) = line.timestamp_ms {
        message = message.with_timestamp(timestamp);
    }
    Ok(ReplayRecord {
        topic: line.topic,
        at: Duration::from_millis(line.at_ms),
        message,
    })
}

// ============================================================================
// SECTION: Replay Bus
// ============================================================================

/// State shared by the replay bus and its channels.
#[derive(Debug)]
struct ReplayShared<K> {
    /// Release clock.
    clock: K,
    /// Records not yet released, earliest first.
    pending: Mutex<VecDeque<ReplayRecord>>,
    /// Bus records are released onto.
    bus: MemoryBus,
}

impl<K: Clock> ReplayShared<K> {
    /// Publishes every pending record whose release time has passed.
    fn release_due(&self) -> Result<usize, ReplayError> {
        let now = self.clock.now();
        let mut pending = self.pending.lock().map_err(|_| MemoryBusError::Poisoned)?;
        let mut released = 0;
        while pending.front().is_some_and(|record| record.at <= now) {
            let Some(record) = pending.pop_front() else {
                break;
            };
            let at_ms = u64::try_from(record.at.as_millis()).unwrap_or(u64::MAX);
            let offset = self.bus.publish(&record.topic, record.message)?;
            debug!(topic = record.topic.as_str(), offset, at_ms, "replayed record");
            released += 1;
        }
        Ok(released)
    }
}

/// Message bus that releases a replay script onto a memory bus over time.
#[derive(Debug)]
pub struct ReplayBus<K> {
    /// Shared release state.
    shared: Arc<ReplayShared<K>>,
}

impl<K: Clock + Send + Sync + 'static> ReplayBus<K> {
    /// Creates a replay bus over a fresh memory bus.
    #[must_use]
    pub fn new(script: ReplayScript, clock: K) -> Self {
        Self::with_bus(script, clock, MemoryBus::new())
    }

    /// Creates a replay bus that releases onto an existing memory bus.
    #[must_use]
    pub fn with_bus(script: ReplayScript, clock: K, bus: MemoryBus) -> Self {
        Self {
            shared: Arc::new(ReplayShared {
                clock,
                pending: Mutex::new(script.records.into()),
                bus,
            }),
        }
    }

    /// Returns the underlying memory bus.
    #[must_use]
    pub fn memory(&self) -> &MemoryBus {
        &self.shared.bus
    }

    /// Releases every due record now and returns how many were published.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Bus`] when the bus state is poisoned.
    pub fn release_due(&self) -> Result<usize, ReplayError> {
        self.shared.release_due()
    }

    /// Returns the number of records not yet released.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Bus`] when the state is poisoned.
    pub fn pending(&self) -> Result<usize, ReplayError> {
        Ok(self.shared.pending.lock().map_err(|_| MemoryBusError::Poisoned)?.len())
    }
}

impl<K: Clock + Send + Sync + 'static> MessageBus for ReplayBus<K> {
    fn connect(&self, spec: &ChannelSpec) -> Result<Box<dyn MessageChannel>, ChannelInitError> {
        let inner = self.shared.bus.open(spec)?;
        Ok(Box::new(ReplayChannel {
            inner,
            shared: Arc::clone(&self.shared),
        }))
    }
}

/// Memory channel that releases due records before reading.
///
/// Records are released only by `poll`, so a record due at open time still
/// counts as produced after the channel was positioned.
struct ReplayChannel<K> {
    /// Underlying memory channel.
    inner: MemoryChannel,
    /// Shared release state.
    shared: Arc<ReplayShared<K>>,
}

impl<K: Clock> ReplayChannel<K> {
    /// Releases due records, logging instead of failing.
    fn release(&self) {
        if let Err(err) = self.shared.release_due() {
            warn!(topic = self.inner.topic(), error = %err, "replay release failed");
        }
    }
}

impl<K: Clock + Send + Sync + 'static> MessageChannel for ReplayChannel<K> {
    fn topic(&self) -> &str {
        self.inner.topic()
    }

    fn poll(&mut self) -> Option<Message> {
        self.release();
        self.inner.poll()
    }

    fn high_watermark(&mut self) -> Result<i64, ChannelError> {
        self.inner.high_watermark()
    }

    fn seek(&mut self, position: StartPosition) -> Result<(), ChannelError> {
        self.inner.seek(position)
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

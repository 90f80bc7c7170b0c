// crates/clock-gate-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Scripted bus, recording host, and payload helpers.
// Purpose: Drive the gate deterministically on virtual time.
// Dependencies: clock-gate-core, serde_json
// ============================================================================

//! ## Overview
//! [`ScriptedBus`] serves per-topic logs whose records become visible at a
//! scheduled virtual time read from a shared [`ManualClock`]. Because the
//! gate sleeps on the same clock, every timeout elapses instantly and exactly.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use clock_gate_core::ChannelError;
use clock_gate_core::ChannelInitError;
use clock_gate_core::ChannelSpec;
use clock_gate_core::Clock;
use clock_gate_core::ClockTick;
use clock_gate_core::GateHost;
use clock_gate_core::GateSettings;
use clock_gate_core::HostError;
use clock_gate_core::ManualClock;
use clock_gate_core::Message;
use clock_gate_core::MessageBus;
use clock_gate_core::MessageChannel;
use clock_gate_core::StartPosition;
use clock_gate_core::StopReason;
use clock_gate_core::Timeout;
use serde_json::json;

// ============================================================================
// SECTION: Scripted Bus
// ============================================================================

/// Scheduled record: visible once virtual time reaches `at`.
type Scheduled = (Duration, Message);

/// Channel calls observed by the bus.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    /// `(topic, position)` for every seek.
    pub seeks: Vec<(String, StartPosition)>,
    /// Topic of every close.
    pub closes: Vec<String>,
}

/// Bus whose topics replay scheduled records on virtual time.
pub struct ScriptedBus {
    /// Shared virtual clock.
    clock: ManualClock,
    /// Scheduled records per topic.
    logs: Mutex<BTreeMap<String, Vec<Scheduled>>>,
    /// Topics whose connect fails.
    failing: Mutex<BTreeSet<String>>,
    /// Observed channel calls.
    calls: Arc<Mutex<CallLog>>,
}

impl ScriptedBus {
    /// Creates an empty bus on `clock`.
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            logs: Mutex::new(BTreeMap::new()),
            failing: Mutex::new(BTreeSet::new()),
            calls: Arc::new(Mutex::new(CallLog::default())),
        }
    }

    /// Schedules `message` on `topic` at virtual time `at`.
    pub fn schedule(&self, topic: &str, at: Duration, message: Message) {
        let mut logs = self.logs.lock().unwrap();
        let log = logs.entry(topic.to_string()).or_default();
        log.push((at, message));
        log.sort_by_key(|(at, _)| *at);
    }

    /// Makes `connect` fail for `topic`.
    pub fn fail_connect(&self, topic: &str) {
        self.failing.lock().unwrap().insert(topic.to_string());
    }

    /// Returns a snapshot of observed channel calls.
    pub fn calls(&self) -> CallLog {
        self.calls.lock().unwrap().clone()
    }
}

impl MessageBus for ScriptedBus {
    fn connect(&self, spec: &ChannelSpec) -> Result<Box<dyn MessageChannel>, ChannelInitError> {
        if self.failing.lock().unwrap().contains(&spec.topic) {
            return Err(ChannelInitError::Transport {
                topic: spec.topic.clone(),
                reason: "broker unreachable".to_string(),
            });
        }
        let log = self.logs.lock().unwrap().get(&spec.topic).cloned().unwrap_or_default();
        Ok(Box::new(ScriptedChannel {
            topic: spec.topic.clone(),
            log,
            position: 0,
            clock: self.clock.clone(),
            calls: Arc::clone(&self.calls),
            closed: false,
        }))
    }
}

/// Channel over one scheduled topic log.
struct ScriptedChannel {
    /// Topic name.
    topic: String,
    /// Scheduled records; offsets are indices.
    log: Vec<Scheduled>,
    /// Next offset to deliver.
    position: usize,
    /// Shared virtual clock.
    clock: ManualClock,
    /// Observed channel calls.
    calls: Arc<Mutex<CallLog>>,
    /// True once closed.
    closed: bool,
}

impl MessageChannel for ScriptedChannel {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn poll(&mut self) -> Option<Message> {
        if self.closed {
            return None;
        }
        let (at, message) = self.log.get(self.position)?;
        if *at > self.clock.now() {
            return None;
        }
        self.position += 1;
        Some(message.clone())
    }

    fn high_watermark(&mut self) -> Result<i64, ChannelError> {
        let now = self.clock.now();
        let visible = self.log.iter().filter(|(at, _)| *at <= now).count();
        Ok(i64::try_from(visible).unwrap())
    }

    fn seek(&mut self, position: StartPosition) -> Result<(), ChannelError> {
        self.position = match position {
            StartPosition::Beginning => 0,
            StartPosition::Offset(offset) => usize::try_from(offset).unwrap(),
        };
        self.calls.lock().unwrap().seeks.push((self.topic.clone(), position));
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.calls.lock().unwrap().closes.push(self.topic.clone());
        }
    }
}

// ============================================================================
// SECTION: Recording Host
// ============================================================================

/// Host that records ticks and stop requests.
#[derive(Debug, Default)]
pub struct RecordingHost {
    /// Delivered ticks in order.
    pub ticks: Vec<ClockTick>,
    /// Stop requests in order.
    pub stops: Vec<StopReason>,
    /// When true, every tick is rejected.
    pub reject_ticks: bool,
}

impl GateHost for RecordingHost {
    fn tick(&mut self, tick: &ClockTick) -> Result<(), HostError> {
        if self.reject_ticks {
            return Err(HostError::TickFailed("solver diverged".to_string()));
        }
        self.ticks.push(tick.clone());
        Ok(())
    }

    fn request_stop(&mut self, reason: StopReason) {
        self.stops.push(reason);
    }
}

// ============================================================================
// SECTION: Payload Helpers
// ============================================================================

/// Builds a plain orchestrator command message.
pub fn command(name: &str) -> Message {
    Message::new(json!({"data": {"command": name}}).to_string())
}

/// Builds a clock message carrying simulation time in nanoseconds.
pub fn clock_message(sim_nanos: u64) -> Message {
    Message::new(
        json!({
            "metadata": {"type_name": "aerosim::types::TimeStamp"},
            "data": {"nanosec": sim_nanos}
        })
        .to_string(),
    )
}

/// Builds gate settings with finite timeouts in seconds.
pub fn settings(start_secs: u64, clock_secs: u64) -> GateSettings {
    GateSettings {
        start_timeout: Timeout::Finite(Duration::from_secs(start_secs)),
        clock_timeout: Timeout::Finite(Duration::from_secs(clock_secs)),
        ..GateSettings::default()
    }
}

/// Milliseconds as a duration.
pub const fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

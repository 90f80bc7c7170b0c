// crates/clock-gate-core/src/runtime/tests.rs
// ============================================================================
// Module: Runtime Unit Tests
// Description: Unit tests for command recognition, clocks, and consumer setup.
// Purpose: Pin command matching and offset policy positioning.
// Dependencies: clock-gate-core, serde_json
// ============================================================================

//! ## Overview
//! Uses a minimal in-module channel that records seeks to verify each offset
//! policy, plus direct checks on command parsing and scratch buffers.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::json;

use super::ManualClock;
use super::OrchestratorCommand;
use super::command::CommandScratch;
use super::is_orchestrator_command;
use super::open_consumer;
use super::read_command;
use crate::codec::CodecError;
use crate::codec::JSON_DATA_TYPE_NAME;
use crate::core::ChannelSpec;
use crate::core::Message;
use crate::core::OffsetPolicy;
use crate::core::PayloadLimits;
use crate::interfaces::ChannelError;
use crate::interfaces::ChannelInitError;
use crate::interfaces::Clock;
use crate::interfaces::MessageBus;
use crate::interfaces::MessageChannel;
use crate::interfaces::StartPosition;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Shared record of channel calls.
#[derive(Default)]
struct Probe {
    /// Positions passed to `seek`.
    seeks: Vec<StartPosition>,
    /// Number of `close` calls.
    closes: usize,
}

/// Channel that never delivers and records positioning calls.
struct ProbeChannel {
    /// Watermark query result.
    watermark: Result<i64, ChannelError>,
    /// Whether `seek` fails.
    seek_fails: bool,
    /// Shared call record.
    probe: Arc<Mutex<Probe>>,
}

impl MessageChannel for ProbeChannel {
    fn topic(&self) -> &str {
        "probe"
    }

    fn poll(&mut self) -> Option<Message> {
        None
    }

    fn high_watermark(&mut self) -> Result<i64, ChannelError> {
        self.watermark.clone()
    }

    fn seek(&mut self, position: StartPosition) -> Result<(), ChannelError> {
        if self.seek_fails {
            return Err(ChannelError::Unavailable("partition unassigned".to_string()));
        }
        self.probe.lock().unwrap().seeks.push(position);
        Ok(())
    }

    fn close(&mut self) {
        self.probe.lock().unwrap().closes += 1;
    }
}

/// Bus handing out [`ProbeChannel`]s.
struct ProbeBus {
    /// Watermark query result for new channels.
    watermark: Result<i64, ChannelError>,
    /// Whether new channels fail `seek`.
    seek_fails: bool,
    /// Shared call record.
    probe: Arc<Mutex<Probe>>,
}

impl ProbeBus {
    /// Creates a bus whose channels report `watermark`.
    fn new(watermark: Result<i64, ChannelError>) -> Self {
        Self {
            watermark,
            seek_fails: false,
            probe: Arc::new(Mutex::new(Probe::default())),
        }
    }
}

impl MessageBus for ProbeBus {
    fn connect(&self, _spec: &ChannelSpec) -> Result<Box<dyn MessageChannel>, ChannelInitError> {
        Ok(Box::new(ProbeChannel {
            watermark: self.watermark.clone(),
            seek_fails: self.seek_fails,
            probe: Arc::clone(&self.probe),
        }))
    }
}

/// Builds a clock channel descriptor with the given policy.
fn spec(policy: OffsetPolicy) -> ChannelSpec {
    ChannelSpec::new("aerosim.clock", "aerosim.simulink", policy)
}

// ============================================================================
// SECTION: Commands
// ============================================================================

#[test]
fn command_matches_exactly() {
    let payload = br#"{"data":{"command":"start"}}"#;
    assert!(is_orchestrator_command(payload, OrchestratorCommand::Start));
    assert!(!is_orchestrator_command(payload, OrchestratorCommand::Stop));
    let capitalised = br#"{"data":{"command":"Start"}}"#;
    assert!(!is_orchestrator_command(capitalised, OrchestratorCommand::Start));
}

#[test]
fn command_unwraps_generic_json_payloads() {
    let payload = json!({
        "metadata": {"type_name": JSON_DATA_TYPE_NAME},
        "data": {"data": "{\"command\":\"stop\"}"}
    });
    assert!(is_orchestrator_command(payload.to_string().as_bytes(), OrchestratorCommand::Stop));
}

#[test]
fn command_failures_are_not_matches() {
    let payloads: [&[u8]; 4] = [b"not json", br#"{"data":{}}"#, br#"{"data":{"command":1}}"#, b""];
    for payload in payloads {
        assert!(!is_orchestrator_command(payload, OrchestratorCommand::Start));
    }
    let err = read_command(br#"{"metadata":{}}"#).unwrap_err();
    assert!(matches!(err, CodecError::FieldNotFound { .. }), "{err:?}");
}

#[test]
fn scratch_truncates_and_stops_at_nul() {
    let limits = PayloadLimits {
        max_payload_len: 8,
        max_key_len: 2,
    };
    let mut scratch = CommandScratch::new(limits);
    scratch.load(&Message::new(b"{}\0tail-bytes".to_vec()).with_key(b"key".to_vec()));
    assert_eq!(scratch.payload(), b"{}");
    assert_eq!(scratch.key(), b"ke");
    scratch.clear();
    assert!(scratch.payload().is_empty());
    assert!(scratch.key().is_empty());
}

// ============================================================================
// SECTION: Clocks
// ============================================================================

#[test]
fn manual_clock_sleep_advances_shared_time() {
    let clock = ManualClock::new();
    let shared = clock.clone();
    clock.sleep(Duration::from_millis(10));
    shared.advance(Duration::from_secs(1));
    assert_eq!(clock.now(), Duration::from_millis(1010));
}

// ============================================================================
// SECTION: Consumer Initialization
// ============================================================================

/// Verifies `Latest` skips the backlog by seeking to the watermark.
#[test]
fn latest_policy_seeks_to_high_watermark() {
    let bus = ProbeBus::new(Ok(42));
    open_consumer(&bus, &spec(OffsetPolicy::Latest)).unwrap();
    assert_eq!(bus.probe.lock().unwrap().seeks, vec![StartPosition::Offset(42)]);
}

#[test]
fn latest_policy_falls_back_when_watermark_fails() {
    let bus = ProbeBus::new(Err(ChannelError::Unavailable("broker down".to_string())));
    open_consumer(&bus, &spec(OffsetPolicy::Latest)).unwrap();
    assert!(bus.probe.lock().unwrap().seeks.is_empty());
}

#[test]
fn earliest_and_stored_policies_do_not_query_watermark() {
    let bus = ProbeBus::new(Ok(9));
    open_consumer(&bus, &spec(OffsetPolicy::Earliest)).unwrap();
    open_consumer(&bus, &spec(OffsetPolicy::StoredOrDefault)).unwrap();
    assert_eq!(bus.probe.lock().unwrap().seeks, vec![StartPosition::Beginning]);
}

#[test]
fn seek_failure_is_an_assignment_error() {
    let mut bus = ProbeBus::new(Ok(3));
    bus.seek_fails = true;
    let Err(err) = open_consumer(&bus, &spec(OffsetPolicy::Latest)) else {
        panic!("seek failure must fail channel init");
    };
    assert!(matches!(err, ChannelInitError::Assignment { .. }), "{err:?}");
    assert_eq!(bus.probe.lock().unwrap().closes, 1);
}

// crates/clock-gate-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for CLI input parsing, rendering, and replay driving.
// Purpose: Ensure helpers fail closed and render stable output.
// Dependencies: clock-gate-cli main helpers, tempfile
// ============================================================================

//! ## Overview
//! Exercises bounded reads, value-list parsing, decode rendering, and the
//! replay driver on a virtual clock.

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

use std::io::Write;

use clock_gate_bus::ReplayScript;
use clock_gate_core::ClockTick;
use clock_gate_core::CodecLimits;
use clock_gate_core::FieldCodec;
use clock_gate_core::FieldPath;
use clock_gate_core::GatePhase;
use clock_gate_core::GateSettings;
use clock_gate_core::InputLength;
use clock_gate_core::LeafType;
use clock_gate_core::ManualClock;
use clock_gate_core::Message;
use clock_gate_core::PayloadLimits;
use clock_gate_core::StopReason;
use clock_gate_core::TypedValue;
use serde_json::json;

use super::ReadLimitError;
use super::drive_gate;
use super::parse_values;
use super::read_bytes_with_limit;
use super::render_decode;
use super::tick_line;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a codec with a string, a float, and a bool field.
fn codec() -> FieldCodec {
    let fields = vec![
        FieldPath::parse("metadata.type_name", LeafType::String).unwrap(),
        FieldPath::parse("data.pose.x", LeafType::Float64).unwrap(),
        FieldPath::parse("data.ready", LeafType::Bool).unwrap(),
    ];
    FieldCodec::new(fields, CodecLimits::default()).unwrap()
}

// ============================================================================
// SECTION: Bounded Reads
// ============================================================================

#[test]
fn read_bytes_with_limit_allows_small_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"{}").unwrap();
    let bytes = read_bytes_with_limit(file.path(), 8).unwrap();
    assert_eq!(bytes, b"{}");
}

#[test]
fn read_bytes_with_limit_rejects_large_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&[b' '; 9]).unwrap();
    let err = read_bytes_with_limit(file.path(), 8).unwrap_err();
    assert!(matches!(err, ReadLimitError::TooLarge { size: 9, limit: 8 }), "{err:?}");
}

#[test]
fn read_bytes_with_limit_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_bytes_with_limit(&dir.path().join("absent.json"), 8).unwrap_err();
    assert!(matches!(err, ReadLimitError::Io(_)), "{err:?}");
}

// ============================================================================
// SECTION: Value Parsing
// ============================================================================

#[test]
fn parse_values_converts_in_field_order() {
    let values = parse_values(&codec(), r#"["kind", 2, true]"#).unwrap();
    assert_eq!(
        values,
        vec![
            TypedValue::String("kind".to_string()),
            TypedValue::Float64(2.0),
            TypedValue::Bool(true),
        ]
    );
}

#[test]
fn parse_values_rejects_wrong_count_and_types() {
    let err = parse_values(&codec(), r#"["kind", 2]"#).unwrap_err();
    assert_eq!(err.to_string(), "expected 3 values, got 2");
    let err = parse_values(&codec(), r#"["kind", "fast", true]"#).unwrap_err();
    assert_eq!(err.to_string(), "value for data.pose.x is not a valid float64");
    let err = parse_values(&codec(), r#"{"x": 1}"#).unwrap_err();
    assert_eq!(err.to_string(), "values must be a JSON array");
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

#[test]
fn render_decode_reports_values_and_failures() {
    let codec = codec();
    let mut outputs = vec![None; 3];
    let input = br#"{"metadata": {"type_name": "t"}, "data": {"pose": {"x": 0.5}}}"#;
    let report = codec.decode_into(input, InputLength::NulTerminated, &mut outputs).unwrap();
    let summary = serde_json::to_value(render_decode(&codec, &outputs, &report)).unwrap();
    assert_eq!(
        summary["fields"][0],
        json!({"path": "metadata.type_name", "type": "string", "value": "t"})
    );
    assert_eq!(summary["fields"][1]["value"], json!(0.5));
    assert_eq!(summary["fields"][2]["value"], json!(null));
    assert_eq!(summary["failures"][0]["path"], json!("data.ready"));
}

#[test]
fn tick_line_carries_lengths_and_timestamp() {
    let message = Message::new("abcdef").with_key("k").with_timestamp(42);
    let limits = PayloadLimits {
        max_payload_len: 4,
        max_key_len: 8,
    };
    let tick = ClockTick::from_message(message, limits, true);
    let line = tick_line(3, &tick);
    assert_eq!(
        line,
        json!({
            "tick": 3,
            "payload": "abcd",
            "payload_len": 4,
            "key": "k",
            "key_len": 1,
            "timestamp_ms": 42,
            "truncated": true,
        })
    );
}

// ============================================================================
// SECTION: Replay Driver
// ============================================================================

#[test]
fn drive_gate_runs_script_to_stop_on_virtual_time() {
    let script = ReplayScript::parse(
        r#"{"topic": "aerosim.orchestrator.commands", "at_ms": 50, "payload": {"data": {"command": "start"}}}
{"topic": "aerosim.clock", "at_ms": 60, "payload": {"data": {"nanosec": 1}}}
{"topic": "aerosim.orchestrator.commands", "at_ms": 90, "payload": {"data": {"command": "stop"}}}"#,
    )
    .unwrap();
    let outcome = drive_gate(script, GateSettings::default(), ManualClock::new(), None).unwrap();
    assert_eq!(outcome.phase, GatePhase::StoppedByCommand);
    assert_eq!(outcome.stop_reason, Some(StopReason::StopCommand));
    assert_eq!(outcome.steps, 3);
    assert_eq!(outcome.ticks, 1);
}

#[test]
fn drive_gate_honours_step_limit() {
    let script = ReplayScript::parse(
        r#"{"topic": "aerosim.orchestrator.commands", "at_ms": 0, "payload": {"data": {"command": "start"}}}"#,
    )
    .unwrap();
    let outcome = drive_gate(script, GateSettings::default(), ManualClock::new(), Some(1)).unwrap();
    assert_eq!(outcome.phase, GatePhase::Running);
    assert_eq!(outcome.stop_reason, None);
    assert_eq!(outcome.steps, 1);
}

#[test]
fn drive_gate_reports_start_timeout() {
    let outcome = drive_gate(
        ReplayScript::default(),
        GateSettings::default(),
        ManualClock::new(),
        None,
    )
    .unwrap();
    assert_eq!(outcome.phase, GatePhase::TimedOut);
    assert_eq!(outcome.stop_reason, Some(StopReason::StartTimeout));
}

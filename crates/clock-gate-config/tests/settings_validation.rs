//! Settings conversion and section validation tests for clock-gate-config.
// crates/clock-gate-config/tests/settings_validation.rs
// =============================================================================
// Module: Config Settings Validation Tests
// Description: Validate section rules and conversion into core settings.
// Purpose: Ensure every accepted file maps to well-formed gate and codec values.
// =============================================================================

use std::time::Duration;

use clock_gate_config::ClockGateConfig;
use clock_gate_config::ConfigError;
use clock_gate_core::InputLength;
use clock_gate_core::LeafType;
use clock_gate_core::OffsetPolicy;
use clock_gate_core::Timeout;
use clock_gate_core::TypedValue;

/// Result type for tests that report failures as messages.
type TestResult = Result<(), String>;

/// Full example configuration.
const FULL: &str = r#"
[bus]
brokers = "broker-1:9092,broker-2:9092"
conf = { "fetch.wait.max.ms" = "10", "auto.offset.reset" = "earliest" }
topic_conf = { "auto.offset.reset" = "latest" }

[gate]
start_timeout_secs = -1.0
clock_timeout_secs = 2.5
poll_interval_ms = 5
max_payload_len = 256
max_key_len = 16
output_timestamp = false

[channels.clock]
topic = "sim.clock"
offset_policy = "earliest"

[channels.commands]
group = "sim.commands"

[codec]
max_len = 512
emit_length = false
input_length = "bounded"

[[codec.fields]]
path = "metadata.type_name"
type = "string"

[[codec.fields]]
path = "data.position.x"
type = "double"

[[codec.fields]]
path = "data.count"
type = "uint16"
"#;

/// Parses `text` and returns the error message, failing when it validates.
fn invalid_message(text: &str) -> Result<String, String> {
    match ClockGateConfig::from_toml(text) {
        Err(ConfigError::Invalid(message)) => Ok(message),
        Err(error) => Err(format!("expected invalid config, got {error}")),
        Ok(_) => Err("expected config to be rejected".to_string()),
    }
}

/// Asserts that `text` is rejected with a message containing `needle`.
fn assert_rejected(text: &str, needle: &str) -> TestResult {
    let message = invalid_message(text)?;
    if message.contains(needle) {
        Ok(())
    } else {
        Err(format!("error {message} did not contain {needle}"))
    }
}

#[test]
fn full_config_maps_to_gate_settings() -> TestResult {
    let config = ClockGateConfig::from_toml(FULL).map_err(|err| err.to_string())?;
    let settings = config.gate_settings().map_err(|err| err.to_string())?;
    if settings.brokers != "broker-1:9092,broker-2:9092" {
        return Err(format!("unexpected brokers {}", settings.brokers));
    }
    if settings.start_timeout != Timeout::Infinite {
        return Err("start timeout should be infinite".to_string());
    }
    if settings.clock_timeout != Timeout::Finite(Duration::from_millis(2500)) {
        return Err("clock timeout should be 2.5 seconds".to_string());
    }
    if settings.poll_interval != Duration::from_millis(5) {
        return Err("poll interval should be 5 ms".to_string());
    }
    if settings.limits.max_payload_len != 256 || settings.limits.max_key_len != 16 {
        return Err("payload limits not applied".to_string());
    }
    if settings.emit_timestamp {
        return Err("timestamp output should be disabled".to_string());
    }
    Ok(())
}

#[test]
fn channels_fill_defaults_and_share_passthrough() -> TestResult {
    let config = ClockGateConfig::from_toml(FULL).map_err(|err| err.to_string())?;
    let settings = config.gate_settings().map_err(|err| err.to_string())?;
    let clock = &settings.clock_channel;
    let commands = &settings.command_channel;
    if clock.topic != "sim.clock" || clock.group != "aerosim.simulink" {
        return Err(format!("unexpected clock channel {} / {}", clock.topic, clock.group));
    }
    if clock.offset_policy != OffsetPolicy::Earliest {
        return Err("clock channel should read from earliest".to_string());
    }
    if commands.topic != "aerosim.orchestrator.commands" || commands.group != "sim.commands" {
        return Err(format!("unexpected command channel {} / {}", commands.topic, commands.group));
    }
    if commands.offset_policy != OffsetPolicy::Latest {
        return Err("command channel should default to latest".to_string());
    }
    for spec in [clock, commands] {
        if spec.properties.get("auto.offset.reset").map(String::as_str) != Some("latest") {
            return Err("topic_conf should override conf".to_string());
        }
        if spec.properties.get("fetch.wait.max.ms").map(String::as_str) != Some("10") {
            return Err("consumer passthrough missing".to_string());
        }
    }
    Ok(())
}

#[test]
fn codec_section_builds_field_codec() -> TestResult {
    let config = ClockGateConfig::from_toml(FULL).map_err(|err| err.to_string())?;
    let codec = config.field_codec().map_err(|err| err.to_string())?;
    let types: Vec<LeafType> = codec.fields().iter().map(|field| field.leaf_type()).collect();
    if types != [LeafType::String, LeafType::Float64, LeafType::Uint16] {
        return Err("field types not preserved in order".to_string());
    }
    if codec.limits().max_len != 512 || codec.limits().emit_length {
        return Err("codec limits not applied".to_string());
    }

    let input =
        br#"{"metadata": {"type_name": "t"}, "data": {"position": {"x": 1.5}, "count": 7}}"#;
    let framing = config.input_length(input.len());
    if framing != InputLength::Bounded(input.len()) {
        return Err("bounded framing expected".to_string());
    }
    let mut outputs = vec![None; 3];
    let report = codec.decode_into(input, framing, &mut outputs).map_err(|err| err.to_string())?;
    if !report.is_complete() {
        return Err("every field should decode".to_string());
    }
    let expected = vec![
        Some(TypedValue::String("t".to_string())),
        Some(TypedValue::Float64(1.5)),
        Some(TypedValue::Uint16(7)),
    ];
    if outputs != expected {
        return Err("decoded values differ".to_string());
    }
    Ok(())
}

#[test]
fn bus_rejects_empty_brokers() -> TestResult {
    assert_rejected("[bus]\nbrokers = \"  \"\n", "bus.brokers must be non-empty")
}

#[test]
fn bus_rejects_oversized_passthrough() -> TestResult {
    let entries: Vec<String> = (0..65).map(|index| format!("\"k{index}\" = \"v\"")).collect();
    let text = format!("[bus]\nconf = {{ {} }}\n", entries.join(", "));
    assert_rejected(&text, "bus.conf exceeds 64 entries")
}

#[test]
fn gate_rejects_zero_and_non_sentinel_negative_timeouts() -> TestResult {
    assert_rejected("[gate]\nstart_timeout_secs = 0.0\n", "gate.start_timeout_secs")?;
    assert_rejected("[gate]\nclock_timeout_secs = -2.0\n", "gate.clock_timeout_secs")?;
    assert_rejected("[gate]\nclock_timeout_secs = nan\n", "gate.clock_timeout_secs")
}

#[test]
fn gate_rejects_out_of_range_sizes() -> TestResult {
    assert_rejected("[gate]\npoll_interval_ms = 0\n", "gate.poll_interval_ms")?;
    assert_rejected("[gate]\npoll_interval_ms = 1001\n", "gate.poll_interval_ms")?;
    assert_rejected("[gate]\nmax_payload_len = 0\n", "gate.max_payload_len")?;
    assert_rejected("[gate]\nmax_key_len = 65537\n", "gate.max_key_len")?;
    assert_rejected("[codec]\nmax_len = 0\n", "codec.max_len")
}

#[test]
fn channels_reject_empty_names_and_shared_topics() -> TestResult {
    assert_rejected("[channels.clock]\ntopic = \"\"\n", "channels.clock.topic")?;
    assert_rejected("[channels.commands]\ngroup = \" \"\n", "channels.commands.group")?;
    assert_rejected(
        "[channels.clock]\ntopic = \"shared\"\n[channels.commands]\ntopic = \"shared\"\n",
        "must use different topics",
    )?;
    assert_rejected(
        "[channels.commands]\ntopic = \"aerosim.clock\"\n",
        "must use different topics",
    )
}

#[test]
fn codec_rejects_malformed_and_duplicate_paths() -> TestResult {
    assert_rejected(
        "[[codec.fields]]\npath = \"data\"\ntype = \"bool\"\n",
        "codec.fields[0].path",
    )?;
    assert_rejected(
        "[[codec.fields]]\npath = \"data..x\"\ntype = \"bool\"\n",
        "codec.fields[0].path",
    )?;
    assert_rejected(
        concat!(
            "[[codec.fields]]\npath = \"data.x\"\ntype = \"bool\"\n",
            "[[codec.fields]]\npath = \"data.x\"\ntype = \"int8\"\n",
        ),
        "codec.fields[1].path duplicates data.x",
    )
}

#[test]
fn codec_rejects_too_many_fields() -> TestResult {
    let mut text = String::new();
    for index in 0..257 {
        text.push_str(&format!("[[codec.fields]]\npath = \"data.f{index}\"\ntype = \"int32\"\n"));
    }
    assert_rejected(&text, "codec.fields exceeds 256 entries")
}

#[test]
fn single_alias_maps_to_float32() -> TestResult {
    let config =
        ClockGateConfig::from_toml("[[codec.fields]]\npath = \"data.v\"\ntype = \"single\"\n")
            .map_err(|err| err.to_string())?;
    let codec = config.field_codec().map_err(|err| err.to_string())?;
    match codec.fields().first().map(|field| field.leaf_type()) {
        Some(LeafType::Float32) => Ok(()),
        _ => Err("single should map to float32".to_string()),
    }
}

#[test]
fn nul_terminated_is_the_default_framing() -> TestResult {
    let config = ClockGateConfig::default();
    if config.input_length(10) != InputLength::NulTerminated {
        return Err("default framing should be nul-terminated".to_string());
    }
    Ok(())
}

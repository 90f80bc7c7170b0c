// crates/clock-gate-cli/src/main.rs
// ============================================================================
// Module: Clock Gate CLI Entry Point
// Description: Command dispatcher for config, codec, and replay workflows.
// Purpose: Provide offline tooling around the clock gate and field codec.
// Dependencies: clap, clock-gate-bus, clock-gate-config, clock-gate-core,
//               serde, serde_json, thiserror, tracing, tracing-subscriber.
// ============================================================================

//! ## Overview
//! The `clock-gate` CLI validates configuration files, runs the configured
//! field codec over documents and value lists, and replays JSON-lines bus
//! scripts through a live orchestration gate. Diagnostics go to stderr via
//! `tracing`; command results go to stdout as JSON lines.
//! Security posture: inputs are untrusted and read with hard size limits.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clock_gate_bus::ReplayBus;
use clock_gate_bus::ReplayScript;
use clock_gate_config::ClockGateConfig;
use clock_gate_core::Clock;
use clock_gate_core::ClockTick;
use clock_gate_core::CodecError;
use clock_gate_core::DecodeReport;
use clock_gate_core::EncodeOutput;
use clock_gate_core::FieldCodec;
use clock_gate_core::GateHost;
use clock_gate_core::GatePhase;
use clock_gate_core::GateSettings;
use clock_gate_core::HostError;
use clock_gate_core::ManualClock;
use clock_gate_core::MonotonicClock;
use clock_gate_core::OrchestrationGate;
use clock_gate_core::StepKind;
use clock_gate_core::StopReason;
use clock_gate_core::TypedValue;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a document passed to `codec decode`.
const MAX_INPUT_BYTES: usize = 16 * 1024 * 1024;
/// Filter applied when `--log-level` does not parse.
const FALLBACK_LOG_FILTER: &str = "warn";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "clock-gate", disable_help_subcommand = true, version)]
struct Cli {
    /// Log filter (trace, debug, info, warn, error, or an `EnvFilter` directive).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Field codec utilities.
    Codec {
        /// Selected codec subcommand.
        #[command(subcommand)]
        command: CodecCommand,
    },
    /// Replay a bus script through an orchestration gate.
    Replay(ReplayCommand),
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a clock gate configuration file.
    Validate(ConfigValidateCommand),
}

/// Field codec subcommands.
#[derive(Subcommand, Debug)]
enum CodecCommand {
    /// Decode a JSON document into the configured fields.
    Decode(CodecDecodeCommand),
    /// Encode a JSON array of field values into a document.
    Encode(CodecEncodeCommand),
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to clock-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for codec decode.
#[derive(Args, Debug)]
struct CodecDecodeCommand {
    /// Optional config file path (defaults to clock-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Document to decode.
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
}

/// Arguments for codec encode.
#[derive(Args, Debug)]
struct CodecEncodeCommand {
    /// Optional config file path (defaults to clock-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// JSON array with one value per configured field, in field order.
    #[arg(long, value_name = "JSON")]
    values: String,
}

/// Arguments for replay.
#[derive(Args, Debug)]
struct ReplayCommand {
    /// Optional config file path (defaults to clock-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// JSON-lines replay script.
    #[arg(long, value_name = "PATH")]
    script: PathBuf,
    /// Maximum number of major steps (defaults to running until the gate stops).
    #[arg(long, value_name = "N")]
    steps: Option<u64>,
    /// Run on a virtual clock that advances only while the gate sleeps.
    #[arg(long)]
    virtual_time: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing error messages.
///
/// # Invariants
/// - `message` is a complete, printable sentence fragment.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);
    match cli.command {
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Codec {
            command,
        } => command_codec(command),
        Commands::Replay(command) => command_replay(&command),
    }
}

/// Installs the stderr log subscriber.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(FALLBACK_LOG_FILTER));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    config.gate_settings().map_err(|err| CliError::new(format!("config load failed: {err}")))?;
    config.field_codec().map_err(|err| CliError::new(format!("config load failed: {err}")))?;
    write_stdout_line("config ok").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Loads configuration, mapping failures to CLI errors.
fn load_config(path: Option<&Path>) -> CliResult<ClockGateConfig> {
    ClockGateConfig::load(path).map_err(|err| CliError::new(format!("config load failed: {err}")))
}

// ============================================================================
// SECTION: Codec Commands
// ============================================================================

/// Dispatches codec subcommands.
fn command_codec(command: CodecCommand) -> CliResult<ExitCode> {
    match command {
        CodecCommand::Decode(command) => command_codec_decode(&command),
        CodecCommand::Encode(command) => command_codec_encode(&command),
    }
}

/// Decoded field entry in `codec decode` output.
#[derive(Debug, Serialize)]
struct DecodedField {
    /// Dotted field path.
    path: String,
    /// Leaf type label.
    #[serde(rename = "type")]
    leaf_type: String,
    /// Decoded value, or null when the field kept no value.
    value: Value,
}

/// Failure entry in `codec decode` output.
#[derive(Debug, Serialize)]
struct DecodeFailureEntry {
    /// Dotted field path.
    path: String,
    /// Failure detail.
    error: String,
}

/// Complete `codec decode` output.
#[derive(Debug, Serialize)]
struct DecodeSummary {
    /// Every configured field in order.
    fields: Vec<DecodedField>,
    /// Fields that could not be read.
    failures: Vec<DecodeFailureEntry>,
}

/// Executes the codec decode command.
fn command_codec_decode(command: &CodecDecodeCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let codec = build_codec(&config)?;
    let bytes = read_bytes_with_limit(&command.input, MAX_INPUT_BYTES).map_err(|err| {
        CliError::new(format!("failed to read {}: {err}", command.input.display()))
    })?;
    let mut outputs = vec![None; codec.fields().len()];
    let report = codec
        .decode_into(&bytes, config.input_length(bytes.len()), &mut outputs)
        .map_err(|err| CliError::new(format!("decode failed: {err}")))?;
    let summary = render_decode(&codec, &outputs, &report);
    write_json_line(&summary)?;
    Ok(ExitCode::SUCCESS)
}

/// Builds the decode summary for `outputs`.
fn render_decode(
    codec: &FieldCodec,
    outputs: &[Option<TypedValue>],
    report: &DecodeReport,
) -> DecodeSummary {
    let fields = codec
        .fields()
        .iter()
        .zip(outputs)
        .map(|(field, value)| DecodedField {
            path: field.as_str().to_string(),
            leaf_type: field.leaf_type().to_string(),
            value: value.as_ref().map_or(Value::Null, TypedValue::to_json),
        })
        .collect();
    let failures = report
        .failures
        .iter()
        .map(|failure| DecodeFailureEntry {
            path: failure.path.clone(),
            error: failure.error.to_string(),
        })
        .collect();
    DecodeSummary {
        fields,
        failures,
    }
}

/// Executes the codec encode command.
fn command_codec_encode(command: &CodecEncodeCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let codec = build_codec(&config)?;
    let values = parse_values(&codec, &command.values)?;
    let mut output = EncodeOutput::default();
    match codec.encode_into(&values, &mut output) {
        Ok(()) => {}
        Err(CodecError::LengthExceeded { actual, max }) => {
            warn!(actual, max, "encoded document exceeds codec.max_len; emitting empty payload");
        }
        Err(err) => return Err(CliError::new(format!("encode failed: {err}"))),
    }
    let mut bytes = output.payload;
    bytes.push(b'\n');
    write_stdout_bytes(&bytes).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    if let Some(length) = output.length {
        write_stderr_line(&format!("length: {length}"))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Builds the configured field codec.
fn build_codec(config: &ClockGateConfig) -> CliResult<FieldCodec> {
    config.field_codec().map_err(|err| CliError::new(format!("config load failed: {err}")))
}

/// Parses a JSON array of values against the codec's field types.
fn parse_values(codec: &FieldCodec, text: &str) -> CliResult<Vec<TypedValue>> {
    let parsed: Value = serde_json::from_str(text)
        .map_err(|err| CliError::new(format!("values must be a JSON array: {err}")))?;
    let Value::Array(items) = parsed else {
        return Err(CliError::new("values must be a JSON array".to_string()));
    };
    let fields = codec.fields();
    if items.len() != fields.len() {
        return Err(CliError::new(format!(
            "expected {} values, got {}",
            fields.len(),
            items.len()
        )));
    }
    fields
        .iter()
        .zip(&items)
        .map(|(field, item)| {
            TypedValue::from_json(field.leaf_type(), item).ok_or_else(|| {
                CliError::new(format!(
                    "value for {} is not a valid {}",
                    field.as_str(),
                    field.leaf_type()
                ))
            })
        })
        .collect()
}

// ============================================================================
// SECTION: Replay Command
// ============================================================================

/// Executes the replay command.
fn command_replay(command: &ReplayCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let settings = config
        .gate_settings()
        .map_err(|err| CliError::new(format!("config load failed: {err}")))?;
    let script = ReplayScript::load(&command.script).map_err(|err| {
        CliError::new(format!("failed to load {}: {err}", command.script.display()))
    })?;
    info!(
        records = script.records().len(),
        virtual_time = command.virtual_time,
        "replay script loaded"
    );
    let outcome = if command.virtual_time {
        drive_gate(script, settings, ManualClock::new(), command.steps)?
    } else {
        drive_gate(script, settings, MonotonicClock::new(), command.steps)?
    };
    write_json_line(&outcome)?;
    if outcome.phase == GatePhase::TimedOut {
        let reason = outcome.stop_reason.map_or("unknown", StopReason::as_str);
        write_stderr_line(&format!("gate timed out: {reason}"))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Final replay summary.
#[derive(Debug, Serialize)]
struct ReplayOutcome {
    /// Gate phase after the last step.
    phase: GatePhase,
    /// Stop reason when the gate reached a terminal phase.
    stop_reason: Option<StopReason>,
    /// Major steps taken.
    steps: u64,
    /// Host ticks fired.
    ticks: u64,
}

/// Runs a gate over a replay of `script` until it stops or `steps` run out.
fn drive_gate<K: Clock + Clone + Send + Sync + 'static>(
    script: ReplayScript,
    settings: GateSettings,
    clock: K,
    steps: Option<u64>,
) -> CliResult<ReplayOutcome> {
    let bus = ReplayBus::new(script, clock.clone());
    let mut gate = OrchestrationGate::start(&bus, settings, clock)
        .map_err(|err| CliError::new(format!("gate start failed: {err}")))?;
    let mut host = PrintingHost::default();
    let mut taken = 0_u64;
    while !gate.phase().is_terminal() && steps.is_none_or(|limit| taken < limit) {
        gate.step(StepKind::Major, &mut host)
            .map_err(|err| CliError::new(format!("gate step failed: {err}")))?;
        taken += 1;
    }
    gate.close();
    Ok(ReplayOutcome {
        phase: gate.phase(),
        stop_reason: gate.stop_reason(),
        steps: taken,
        ticks: host.ticks,
    })
}

/// Host that prints every tick as a JSON line.
#[derive(Debug, Default)]
struct PrintingHost {
    /// Ticks printed so far.
    ticks: u64,
}

impl GateHost for PrintingHost {
    fn tick(&mut self, tick: &ClockTick) -> Result<(), HostError> {
        self.ticks += 1;
        let line = tick_line(self.ticks, tick);
        write_stdout_line(&line.to_string()).map_err(|err| HostError::TickFailed(err.to_string()))
    }

    fn request_stop(&mut self, reason: StopReason) {
        info!(reason = reason.as_str(), ticks = self.ticks, "replay host stop requested");
    }
}

/// Renders one tick as a JSON object.
fn tick_line(index: u64, tick: &ClockTick) -> Value {
    json!({
        "tick": index,
        "payload": String::from_utf8_lossy(&tick.payload),
        "payload_len": tick.payload_len,
        "key": String::from_utf8_lossy(&tick.key),
        "key_len": tick.key_len,
        "timestamp_ms": tick.timestamp_millis,
        "truncated": tick.truncated,
    })
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Errors raised by bounded file reads.
#[derive(Debug, Error)]
enum ReadLimitError {
    /// File I/O failure.
    #[error("{0}")]
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    #[error("file size {size} exceeds limit {limit}")]
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes)
}

/// Writes a serializable value to stdout as one compact JSON line.
fn write_json_line<T: Serialize>(value: &T) -> CliResult<()> {
    let mut bytes = serde_json::to_vec(value)
        .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))?;
    bytes.push(b'\n');
    write_stdout_bytes(&bytes).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

// crates/clock-gate-config/src/config.rs
// ============================================================================
// Module: Clock Gate Configuration
// Description: Configuration loading and validation for the clock gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: clock-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional and falls back to the gate defaults; whatever is
//! present is validated before it can be turned into [`GateSettings`] or a
//! [`FieldCodec`].
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use clock_gate_core::ChannelSpec;
use clock_gate_core::CodecLimits;
use clock_gate_core::FieldCodec;
use clock_gate_core::FieldPath;
use clock_gate_core::GateSettings;
use clock_gate_core::InputLength;
use clock_gate_core::LeafType;
use clock_gate_core::OffsetPolicy;
use clock_gate_core::PayloadLimits;
use clock_gate_core::Timeout;
use clock_gate_core::runtime::gate::DEFAULT_BROKERS;
use clock_gate_core::runtime::gate::DEFAULT_CLOCK_TOPIC;
use clock_gate_core::runtime::gate::DEFAULT_COMMAND_TOPIC;
use clock_gate_core::runtime::gate::DEFAULT_CONSUMER_GROUP;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "clock-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "CLOCK_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of entries in one passthrough table.
pub(crate) const MAX_PASSTHROUGH_ENTRIES: usize = 64;
/// Maximum number of codec fields.
pub(crate) const MAX_CODEC_FIELDS: usize = 256;
/// Maximum payload buffer size in bytes.
pub(crate) const MAX_PAYLOAD_LEN: usize = 16 * 1024 * 1024;
/// Maximum key buffer size in bytes.
pub(crate) const MAX_KEY_LEN: usize = 64 * 1024;
/// Maximum encoded document capacity in bytes.
pub(crate) const MAX_ENCODED_LEN: usize = 16 * 1024 * 1024;
/// Maximum poll interval in milliseconds.
pub(crate) const MAX_POLL_INTERVAL_MS: u64 = 1000;

// ============================================================================
// SECTION: Root
// ============================================================================

/// Clock gate configuration root.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClockGateConfig {
    /// Bus connection configuration.
    #[serde(default)]
    pub bus: BusConfig,
    /// Gate timing and buffer configuration.
    #[serde(default)]
    pub gate: GateConfig,
    /// Clock and command channel configuration.
    #[serde(default)]
    pub channels: ChannelsConfig,
    /// JSON field codec configuration.
    #[serde(default)]
    pub codec: CodecConfig,
}

impl ClockGateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: `path`, then `CLOCK_GATE_CONFIG`, then
    /// `./clock-gate.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bus.validate()?;
        self.gate.validate()?;
        self.channels.validate()?;
        self.codec.validate()?;
        Ok(())
    }

    /// Builds gate settings from the validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a timeout cannot be converted.
    pub fn gate_settings(&self) -> Result<GateSettings, ConfigError> {
        let properties = self.bus.properties();
        Ok(GateSettings {
            brokers: self.bus.brokers.clone(),
            clock_channel: self.channels.clock.spec(self.channels.clock_topic(), &properties),
            command_channel: self
                .channels
                .commands
                .spec(self.channels.command_topic(), &properties),
            start_timeout: timeout("gate.start_timeout_secs", self.gate.start_timeout_secs)?,
            clock_timeout: timeout("gate.clock_timeout_secs", self.gate.clock_timeout_secs)?,
            poll_interval: Duration::from_millis(self.gate.poll_interval_ms),
            limits: PayloadLimits {
                max_payload_len: self.gate.max_payload_len,
                max_key_len: self.gate.max_key_len,
            },
            emit_timestamp: self.gate.output_timestamp,
        })
    }

    /// Builds the field codec from the validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a field path is malformed or
    /// duplicated.
    pub fn field_codec(&self) -> Result<FieldCodec, ConfigError> {
        let fields = self.codec.field_paths()?;
        FieldCodec::new(fields, self.codec.limits())
            .map_err(|err| ConfigError::Invalid(format!("codec.fields: {err}")))
    }

    /// Returns the decoder input framing for a buffer of `available` bytes.
    #[must_use]
    pub const fn input_length(&self, available: usize) -> InputLength {
        match self.codec.input_length {
            InputLengthMode::NulTerminated => InputLength::NulTerminated,
            InputLengthMode::Bounded => InputLength::Bounded(available),
        }
    }
}

// ============================================================================
// SECTION: Bus
// ============================================================================

/// Bus connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    /// Connection descriptor handed to the bus adapter.
    #[serde(default = "default_brokers")]
    pub brokers: String,
    /// Consumer passthrough properties.
    #[serde(default)]
    pub conf: BTreeMap<String, String>,
    /// Topic passthrough properties; win over `conf` on conflicts.
    #[serde(default)]
    pub topic_conf: BTreeMap<String, String>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            brokers: default_brokers(),
            conf: BTreeMap::new(),
            topic_conf: BTreeMap::new(),
        }
    }
}

impl BusConfig {
    /// Validates bus configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.brokers.trim().is_empty() {
            return Err(ConfigError::Invalid("bus.brokers must be non-empty".to_string()));
        }
        validate_passthrough("bus.conf", &self.conf)?;
        validate_passthrough("bus.topic_conf", &self.topic_conf)?;
        Ok(())
    }

    /// Returns the merged passthrough properties.
    fn properties(&self) -> BTreeMap<String, String> {
        let mut merged = self.conf.clone();
        merged.extend(self.topic_conf.iter().map(|(key, value)| (key.clone(), value.clone())));
        merged
    }
}

/// Validates one passthrough table.
fn validate_passthrough(field: &str, table: &BTreeMap<String, String>) -> Result<(), ConfigError> {
    if table.len() > MAX_PASSTHROUGH_ENTRIES {
        return Err(ConfigError::Invalid(format!(
            "{field} exceeds {MAX_PASSTHROUGH_ENTRIES} entries"
        )));
    }
    if table.keys().any(|key| key.trim().is_empty()) {
        return Err(ConfigError::Invalid(format!("{field} keys must be non-empty")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Gate timing and buffer configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateConfig {
    /// Seconds to wait for the start command (`-1` waits forever).
    #[serde(default = "default_start_timeout_secs")]
    pub start_timeout_secs: f64,
    /// Seconds to wait for each clock message (`-1` waits forever).
    #[serde(default = "default_clock_timeout_secs")]
    pub clock_timeout_secs: f64,
    /// Sleep between empty poll cycles in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Clock payload and command scratch capacity in bytes.
    #[serde(default = "default_max_payload_len")]
    pub max_payload_len: usize,
    /// Clock key capacity in bytes.
    #[serde(default = "default_max_key_len")]
    pub max_key_len: usize,
    /// Whether ticks carry the record timestamp.
    #[serde(default = "default_output_timestamp")]
    pub output_timestamp: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            start_timeout_secs: default_start_timeout_secs(),
            clock_timeout_secs: default_clock_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            max_payload_len: default_max_payload_len(),
            max_key_len: default_max_key_len(),
            output_timestamp: default_output_timestamp(),
        }
    }
}

impl GateConfig {
    /// Validates gate configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        timeout("gate.start_timeout_secs", self.start_timeout_secs)?;
        timeout("gate.clock_timeout_secs", self.clock_timeout_secs)?;
        if !(1 ..= MAX_POLL_INTERVAL_MS).contains(&self.poll_interval_ms) {
            return Err(ConfigError::Invalid(format!(
                "gate.poll_interval_ms must be between 1 and {MAX_POLL_INTERVAL_MS}"
            )));
        }
        validate_size("gate.max_payload_len", self.max_payload_len, MAX_PAYLOAD_LEN)?;
        validate_size("gate.max_key_len", self.max_key_len, MAX_KEY_LEN)?;
        Ok(())
    }
}

/// Converts configured seconds into a timeout.
fn timeout(field: &str, secs: f64) -> Result<Timeout, ConfigError> {
    Timeout::from_secs_f64(secs).map_err(|err| ConfigError::Invalid(format!("{field}: {err}")))
}

/// Validates a buffer size against `1..=max`.
fn validate_size(field: &str, value: usize, max: usize) -> Result<(), ConfigError> {
    if value == 0 || value > max {
        return Err(ConfigError::Invalid(format!("{field} must be between 1 and {max}")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Channels
// ============================================================================

/// Clock and command channel configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelsConfig {
    /// Clock channel.
    #[serde(default)]
    pub clock: ChannelConfig,
    /// Orchestrator command channel.
    #[serde(default)]
    pub commands: ChannelConfig,
}

impl ChannelsConfig {
    /// Validates channel configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.clock.validate("channels.clock")?;
        self.commands.validate("channels.commands")?;
        if self.clock_topic() == self.command_topic() {
            return Err(ConfigError::Invalid(
                "channels.clock and channels.commands must use different topics".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the effective clock topic.
    #[must_use]
    pub fn clock_topic(&self) -> &str {
        self.clock.topic.as_deref().unwrap_or(DEFAULT_CLOCK_TOPIC)
    }

    /// Returns the effective command topic.
    #[must_use]
    pub fn command_topic(&self) -> &str {
        self.commands.topic.as_deref().unwrap_or(DEFAULT_COMMAND_TOPIC)
    }
}

/// One consume-only channel; unset fields take the gate defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    /// Topic name.
    #[serde(default)]
    pub topic: Option<String>,
    /// Consumer group.
    #[serde(default)]
    pub group: Option<String>,
    /// Initial offset policy.
    #[serde(default)]
    pub offset_policy: Option<OffsetPolicy>,
}

impl ChannelConfig {
    /// Validates one channel.
    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        if self.topic.as_deref().is_some_and(|topic| topic.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("{field}.topic must be non-empty")));
        }
        if self.group.as_deref().is_some_and(|group| group.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("{field}.group must be non-empty")));
        }
        Ok(())
    }

    /// Builds the channel descriptor with passthrough properties.
    fn spec(&self, topic: &str, properties: &BTreeMap<String, String>) -> ChannelSpec {
        let mut spec = ChannelSpec::new(
            topic,
            self.group.as_deref().unwrap_or(DEFAULT_CONSUMER_GROUP),
            self.offset_policy.unwrap_or(OffsetPolicy::Latest),
        );
        spec.properties = properties.clone();
        spec
    }
}

// ============================================================================
// SECTION: Codec
// ============================================================================

/// How decode input length is determined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputLengthMode {
    /// Stop at the first nul byte.
    #[default]
    NulTerminated,
    /// Use the caller-supplied length.
    Bounded,
}

/// JSON field codec configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodecConfig {
    /// Encoded document capacity in bytes.
    #[serde(default = "default_codec_max_len")]
    pub max_len: usize,
    /// Whether encode emits a length output.
    #[serde(default = "default_emit_length")]
    pub emit_length: bool,
    /// Decode input framing.
    #[serde(default)]
    pub input_length: InputLengthMode,
    /// Ordered field list.
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_len: default_codec_max_len(),
            emit_length: default_emit_length(),
            input_length: InputLengthMode::default(),
            fields: Vec::new(),
        }
    }
}

impl CodecConfig {
    /// Validates codec configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_size("codec.max_len", self.max_len, MAX_ENCODED_LEN)?;
        if self.fields.len() > MAX_CODEC_FIELDS {
            return Err(ConfigError::Invalid(format!(
                "codec.fields exceeds {MAX_CODEC_FIELDS} entries"
            )));
        }
        self.field_paths()?;
        Ok(())
    }

    /// Returns the codec limits.
    #[must_use]
    pub const fn limits(&self) -> CodecLimits {
        CodecLimits {
            max_len: self.max_len,
            emit_length: self.emit_length,
        }
    }

    /// Parses every field path, rejecting malformed and duplicate paths.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn field_paths(&self) -> Result<Vec<FieldPath>, ConfigError> {
        let mut seen = BTreeSet::new();
        let mut paths = Vec::with_capacity(self.fields.len());
        for (index, field) in self.fields.iter().enumerate() {
            let path = FieldPath::parse(&field.path, field.leaf_type).map_err(|err| {
                ConfigError::Invalid(format!("codec.fields[{index}].path: {err}"))
            })?;
            if !seen.insert(path.as_str().to_string()) {
                return Err(ConfigError::Invalid(format!(
                    "codec.fields[{index}].path duplicates {}",
                    path.as_str()
                )));
            }
            paths.push(path);
        }
        Ok(paths)
    }
}

/// One codec field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    /// Dotted field path.
    pub path: String,
    /// Leaf type.
    #[serde(rename = "type")]
    pub leaf_type: LeafType,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default broker descriptor.
fn default_brokers() -> String {
    DEFAULT_BROKERS.to_string()
}

/// Default start timeout in seconds.
const fn default_start_timeout_secs() -> f64 {
    30.0
}

/// Default clock timeout in seconds.
const fn default_clock_timeout_secs() -> f64 {
    5.0
}

/// Default poll interval in milliseconds.
const fn default_poll_interval_ms() -> u64 {
    10
}

/// Default payload capacity.
const fn default_max_payload_len() -> usize {
    1024
}

/// Default key capacity.
const fn default_max_key_len() -> usize {
    128
}

/// Default timestamp output toggle.
const fn default_output_timestamp() -> bool {
    true
}

/// Default encoded document capacity.
const fn default_codec_max_len() -> usize {
    clock_gate_core::codec::mapper::DEFAULT_MAX_ENCODED_LEN
}

/// Default length output toggle.
const fn default_emit_length() -> bool {
    true
}

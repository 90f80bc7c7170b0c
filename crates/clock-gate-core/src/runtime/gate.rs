// crates/clock-gate-core/src/runtime/gate.rs
// ============================================================================
// Module: Clock Gate Orchestration Gate
// Description: Start handshake, clock-gated ticks, and timeout termination.
// Purpose: Advance a host simulation in lockstep with an external clock.
// Dependencies: thiserror, tracing, crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The gate owns one clock channel and one command channel. Each major step
//! runs one bounded polling loop for the current phase:
//! - `WaitingStart` polls the command channel until a start command arrives
//!   or the start timeout elapses.
//! - `Running` polls the command channel then the clock channel each cycle
//!   until a stop command, a clock message, or the clock timeout.
//!
//! Invariants:
//! - A stop command pending in the same cycle as a clock message wins.
//! - At most one host tick fires per step.
//! - Both channels are released exactly once, on `close` or drop.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::core::ChannelSpec;
use crate::core::ClockTick;
use crate::core::GatePhase;
use crate::core::Message;
use crate::core::OffsetPolicy;
use crate::core::PayloadLimits;
use crate::core::StepKind;
use crate::core::StepOutcome;
use crate::core::StopReason;
use crate::core::Timeout;
use crate::interfaces::ChannelInitError;
use crate::interfaces::Clock;
use crate::interfaces::GateHost;
use crate::interfaces::HostError;
use crate::interfaces::MessageBus;
use crate::interfaces::MessageChannel;
use crate::runtime::command::CommandScratch;
use crate::runtime::command::OrchestratorCommand;
use crate::runtime::command::read_command;
use crate::runtime::consumer::open_consumer;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default clock topic.
pub const DEFAULT_CLOCK_TOPIC: &str = "aerosim.clock";
/// Default orchestrator command topic.
pub const DEFAULT_COMMAND_TOPIC: &str = "aerosim.orchestrator.commands";
/// Default consumer group for both channels.
pub const DEFAULT_CONSUMER_GROUP: &str = "aerosim.simulink";
/// Default broker descriptor.
pub const DEFAULT_BROKERS: &str = "localhost:9092";
/// Default start command timeout.
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(30);
/// Default clock message timeout.
pub const DEFAULT_CLOCK_TIMEOUT: Duration = Duration::from_secs(5);
/// Default sleep between empty poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Gate configuration consumed at start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct GateSettings {
    /// Broker descriptor, reported in the start-up banner.
    pub brokers: String,
    /// Clock channel descriptor.
    pub clock_channel: ChannelSpec,
    /// Command channel descriptor.
    pub command_channel: ChannelSpec,
    /// Wait bound for the start command.
    pub start_timeout: Timeout,
    /// Wait bound for each clock message.
    pub clock_timeout: Timeout,
    /// Sleep between empty poll cycles.
    pub poll_interval: Duration,
    /// Payload and key limits for delivered clock messages and command scratch.
    pub limits: PayloadLimits,
    /// Whether ticks carry the record timestamp.
    pub emit_timestamp: bool,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            brokers: DEFAULT_BROKERS.to_string(),
            clock_channel: ChannelSpec::new(
                DEFAULT_CLOCK_TOPIC,
                DEFAULT_CONSUMER_GROUP,
                OffsetPolicy::Latest,
            ),
            command_channel: ChannelSpec::new(
                DEFAULT_COMMAND_TOPIC,
                DEFAULT_CONSUMER_GROUP,
                OffsetPolicy::Latest,
            ),
            start_timeout: Timeout::Finite(DEFAULT_START_TIMEOUT),
            clock_timeout: Timeout::Finite(DEFAULT_CLOCK_TIMEOUT),
            poll_interval: DEFAULT_POLL_INTERVAL,
            limits: PayloadLimits::default(),
            emit_timestamp: true,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Orchestration gate errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Only `ChannelInit` is raised by `start`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// A channel could not be opened or positioned.
    #[error(transparent)]
    ChannelInit(#[from] ChannelInitError),
    /// The host rejected a tick; the gate stays running.
    #[error(transparent)]
    Host(#[from] HostError),
    /// The gate was already closed.
    #[error("orchestration gate is closed")]
    Closed,
}

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Clock-sync orchestration gate.
///
/// # Invariants
/// - `stop_reason` is set exactly when the phase is terminal.
/// - Channels are owned exclusively and closed once.
pub struct OrchestrationGate<K: Clock> {
    /// Clock channel handle.
    clock_channel: Box<dyn MessageChannel>,
    /// Command channel handle.
    command_channel: Box<dyn MessageChannel>,
    /// Start-up settings.
    settings: GateSettings,
    /// Time source for timeouts and poll sleeps.
    clock: K,
    /// Current phase.
    phase: GatePhase,
    /// Why the gate stopped, once terminal.
    stop_reason: Option<StopReason>,
    /// Bounded copy of the last command message.
    scratch: CommandScratch,
    /// True once channels were released.
    closed: bool,
}

impl<K: Clock> OrchestrationGate<K> {
    /// Opens both channels and enters `WaitingStart`.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::ChannelInit`] when either channel cannot be opened;
    /// a clock channel opened before the failure is closed again.
    pub fn start(
        bus: &dyn MessageBus,
        settings: GateSettings,
        clock: K,
    ) -> Result<Self, GateError> {
        info!(
            brokers = settings.brokers.as_str(),
            start_timeout = %settings.start_timeout,
            clock_timeout = %settings.clock_timeout,
            "starting clock gate"
        );
        let mut clock_channel = open_consumer(bus, &settings.clock_channel)?;
        let command_channel = match open_consumer(bus, &settings.command_channel) {
            Ok(channel) => channel,
            Err(err) => {
                clock_channel.close();
                return Err(err.into());
            }
        };
        Ok(Self {
            clock_channel,
            command_channel,
            scratch: CommandScratch::new(settings.limits),
            settings,
            clock,
            phase: GatePhase::WaitingStart,
            stop_reason: None,
            closed: false,
        })
    }

    /// Returns the current phase.
    #[must_use]
    pub const fn phase(&self) -> GatePhase {
        self.phase
    }

    /// Returns why the gate stopped, once terminal.
    #[must_use]
    pub const fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    /// Returns the start-up settings.
    #[must_use]
    pub const fn settings(&self) -> &GateSettings {
        &self.settings
    }

    /// Returns true once the channels were released.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Executes one host step.
    ///
    /// Blocks the caller until the phase's polling loop finishes: a start, a
    /// tick, a stop, or a timeout. Minor steps and terminal phases return
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Closed`] after `close` and [`GateError::Host`] when
    /// the host rejects a tick.
    pub fn step(
        &mut self,
        kind: StepKind,
        host: &mut dyn GateHost,
    ) -> Result<StepOutcome, GateError> {
        if self.closed {
            return Err(GateError::Closed);
        }
        if kind == StepKind::Minor {
            return Ok(StepOutcome::Skipped);
        }
        match self.phase {
            GatePhase::WaitingStart => Ok(self.await_start(host)),
            GatePhase::Running => self.await_clock(host),
            phase @ (GatePhase::TimedOut | GatePhase::StoppedByCommand) => {
                Ok(StepOutcome::Halted(phase))
            }
        }
    }

    /// Releases both channels; later calls are no-ops.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.clock_channel.close();
        self.command_channel.close();
        self.scratch.clear();
        self.closed = true;
        info!(phase = %self.phase, "clock gate released channels");
    }

    /// Polls the command channel until start or the start timeout.
    fn await_start(&mut self, host: &mut dyn GateHost) -> StepOutcome {
        info!(timeout = %self.settings.start_timeout, "waiting for orchestrator start command");
        let began = self.clock.now();
        loop {
            let received = self.command_channel.poll();
            if let Some(message) = &received
                && self.accept_command(message, OrchestratorCommand::Start)
            {
                info!("orchestrator start command received");
                self.phase = GatePhase::Running;
                return StepOutcome::Started;
            }
            if self.settings.start_timeout.is_expired(self.clock.now().saturating_sub(began)) {
                warn!(
                    timeout = %self.settings.start_timeout,
                    "orchestrator start command was not received; stopping simulation"
                );
                return self.stop(host, StopReason::StartTimeout);
            }
            if received.is_none() {
                self.clock.sleep(self.settings.poll_interval);
            }
        }
    }

    /// Polls command then clock channels until stop, a tick, or the clock timeout.
    fn await_clock(&mut self, host: &mut dyn GateHost) -> Result<StepOutcome, GateError> {
        self.scratch.clear();
        let began = self.clock.now();
        loop {
            let command = self.command_channel.poll();
            if let Some(message) = &command
                && self.accept_command(message, OrchestratorCommand::Stop)
            {
                info!("orchestrator stop command received; stopping simulation");
                return Ok(self.stop(host, StopReason::StopCommand));
            }
            if let Some(message) = self.clock_channel.poll() {
                let tick = ClockTick::from_message(
                    message,
                    self.settings.limits,
                    self.settings.emit_timestamp,
                );
                if tick.truncated {
                    debug!(
                        payload_len = tick.payload_len,
                        key_len = tick.key_len,
                        "clock message truncated to output limits"
                    );
                }
                host.tick(&tick)?;
                return Ok(StepOutcome::Ticked(tick));
            }
            if self.settings.clock_timeout.is_expired(self.clock.now().saturating_sub(began)) {
                warn!(
                    topic = self.clock_channel.topic(),
                    timeout = %self.settings.clock_timeout,
                    "clock message was not received; stopping simulation"
                );
                return Ok(self.stop(host, StopReason::ClockTimeout));
            }
            if command.is_none() {
                self.clock.sleep(self.settings.poll_interval);
            }
        }
    }

    /// Loads a command message into scratch and checks it against `expected`.
    fn accept_command(&mut self, message: &Message, expected: OrchestratorCommand) -> bool {
        self.scratch.load(message);
        let matched = match read_command(self.scratch.payload()) {
            Ok(command) if command == expected.as_str() => true,
            Ok(command) => {
                debug!(
                    command = command.as_str(),
                    expected = %expected,
                    "ignoring orchestrator command"
                );
                false
            }
            Err(err) => {
                warn!(
                    error = %err,
                    key = %String::from_utf8_lossy(self.scratch.key()),
                    "discarding malformed orchestrator command"
                );
                false
            }
        };
        if !matched {
            self.scratch.clear();
        }
        matched
    }

    /// Enters the terminal phase for `reason` and asks the host to stop.
    fn stop(&mut self, host: &mut dyn GateHost, reason: StopReason) -> StepOutcome {
        self.phase = reason.phase();
        self.stop_reason = Some(reason);
        host.request_stop(reason);
        StepOutcome::Stopped(reason)
    }
}

impl<K: Clock> Drop for OrchestrationGate<K> {
    fn drop(&mut self) {
        self.close();
    }
}

//! Lock controller: the command dispatch loop.
//!
//! [`LockController`] owns the actuator and the dispatch state. The command
//! channel, event sink, delay, and clock are injected at call sites, so the
//! whole loop runs on the host against mocks.
//!
//! ```text
//!  CommandChannel ──line──▶ ┌──────────────────────┐ ──▶ EventSink
//!                           │    LockController     │
//!  CommandChannel ◀─OK/ERR─ │  classify · dispatch  │ ──▶ LockActuator
//!                           └──────────────────────┘
//! ```
//!
//! ## States
//!
//! `Offline` until the channel starts, then `Idle` ⇄ `Dispatching(cmd)`.
//! In blocking mode `Dispatching` lasts for one `poll` call. In deadline mode
//! an unlock stays in `Dispatching(Unlock)` until its pulse is released;
//! lines arriving meanwhile stay queued in the channel and are handled in
//! order afterwards, so every unlock command gets its own pulse and reply.
//!
//! In either mode a failed LOW write holds `Dispatching` as well: every poll
//! retries the release first, and the reply goes out once the pin is LOW.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::channel::{CommandChannel, Line};
use crate::config::{LockConfig, PulseMode};
use crate::drivers::lock::{LockActuator, PulseStatus};
use crate::error::ActuatorError;

use super::commands::{LockCommand, REPLY_ERR, REPLY_OK};
use super::events::LockEvent;
use super::ports::{ClockPort, EventSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// The channel never started; nothing is read or sent.
    Offline,
    /// Waiting for a line.
    Idle,
    /// Handling a classified command.
    Dispatching(LockCommand),
}

/// Counters for the log and for tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub lines: u32,
    pub unlocks: u32,
    pub rejected: u32,
    pub actuator_faults: u32,
    pub reply_failures: u32,
}

pub struct LockController<P: OutputPin> {
    config: LockConfig,
    actuator: LockActuator<P>,
    state: DispatchState,
    stats: DispatchStats,
    /// Reply owed for the unlock whose release is still outstanding.
    awaiting_reply: Option<&'static str>,
}

impl<P: OutputPin> LockController<P> {
    /// Does **not** start the channel: call [`start`](Self::start) next.
    pub fn new(config: LockConfig, actuator: LockActuator<P>) -> Self {
        Self {
            config,
            actuator,
            state: DispatchState::Offline,
            stats: DispatchStats::default(),
            awaiting_reply: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Lock, then start the channel under the configured name.
    ///
    /// Returns `false` if the channel failed; the failure is emitted once and
    /// the controller stays `Offline` for good.
    pub fn start(
        &mut self,
        channel: &mut impl CommandChannel,
        sink: &mut impl EventSink,
    ) -> bool {
        if let Err(e) = self.actuator.release() {
            self.fault(e, sink);
        }

        match channel.begin(&self.config.device_name) {
            Ok(()) => {
                self.state = DispatchState::Idle;
                sink.emit(&LockEvent::ChannelStarted {
                    device_name: self.config.device_name.clone(),
                });
                true
            }
            Err(e) => {
                self.state = DispatchState::Offline;
                sink.emit(&LockEvent::ChannelFailed(e));
                false
            }
        }
    }

    // ── Per-iteration dispatch ────────────────────────────────

    /// Run one loop iteration in the configured [`PulseMode`].
    ///
    /// Returns the command read during this call, if any.
    pub fn poll(
        &mut self,
        channel: &mut impl CommandChannel,
        clock: &impl ClockPort,
        delay: &mut impl DelayNs,
        sink: &mut impl EventSink,
    ) -> Option<LockCommand> {
        match self.config.pulse_mode {
            PulseMode::Blocking => self.poll_blocking(channel, delay, sink),
            PulseMode::Deadline => self.poll_deadline(clock.now_ms(), channel, sink),
        }
    }

    /// Handle at most one line; an unlock sleeps through the whole pulse
    /// before replying.
    pub fn poll_blocking(
        &mut self,
        channel: &mut impl CommandChannel,
        delay: &mut impl DelayNs,
        sink: &mut impl EventSink,
    ) -> Option<LockCommand> {
        if !self.settle_release(channel, sink) {
            return None;
        }

        let line = self.next_line(channel)?;
        let cmd = self.classify(line, sink);
        self.state = DispatchState::Dispatching(cmd);

        match cmd {
            LockCommand::Unlock => {
                let duration_ms = self.config.unlock_duration_ms;
                sink.emit(&LockEvent::PulseStarted { duration_ms });
                match self.actuator.unlock_for(duration_ms, delay) {
                    Ok(()) => {
                        sink.emit(&LockEvent::PulseEnded);
                        self.reply(channel, REPLY_OK, sink);
                    }
                    Err(e) => {
                        self.pulse_failed(e, channel, sink);
                        return Some(cmd);
                    }
                }
            }
            LockCommand::Unknown => self.reply(channel, REPLY_ERR, sink),
        }

        self.state = DispatchState::Idle;
        Some(cmd)
    }

    /// Release a due pulse, then handle at most one line. An unlock
    /// energizes and returns immediately; its `OK` goes out when a later call
    /// releases the pulse.
    pub fn poll_deadline(
        &mut self,
        now_ms: u64,
        channel: &mut impl CommandChannel,
        sink: &mut impl EventSink,
    ) -> Option<LockCommand> {
        if !self.settle_release(channel, sink) {
            return None;
        }

        if self.actuator.active_pulse().is_some() {
            match self.actuator.poll(now_ms) {
                Ok(Some(_)) => self.finish_unlock(channel, sink),
                Ok(None) => return None,
                Err(e) => {
                    // Pulse stays scheduled; the LOW write is retried next call.
                    self.fault(e, sink);
                    return None;
                }
            }
        }

        let line = self.next_line(channel)?;
        let cmd = self.classify(line, sink);
        self.state = DispatchState::Dispatching(cmd);

        match cmd {
            LockCommand::Unlock => {
                let duration_ms = self.config.unlock_duration_ms;
                sink.emit(&LockEvent::PulseStarted { duration_ms });
                match self.actuator.begin_pulse(now_ms, duration_ms) {
                    Ok(PulseStatus::Running(_)) => {
                        self.awaiting_reply = Some(REPLY_OK);
                        return Some(cmd);
                    }
                    Ok(PulseStatus::Completed) => {
                        sink.emit(&LockEvent::PulseEnded);
                        self.reply(channel, REPLY_OK, sink);
                    }
                    Err(e) => {
                        self.pulse_failed(e, channel, sink);
                        return Some(cmd);
                    }
                }
            }
            LockCommand::Unknown => self.reply(channel, REPLY_ERR, sink),
        }

        self.state = DispatchState::Idle;
        Some(cmd)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn is_online(&self) -> bool {
        self.state != DispatchState::Offline
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    pub fn actuator(&self) -> &LockActuator<P> {
        &self.actuator
    }

    // ── Internal ──────────────────────────────────────────────

    fn next_line(&mut self, channel: &mut impl CommandChannel) -> Option<Line> {
        if !self.is_online() || !channel.available() {
            return None;
        }
        channel.read_line()
    }

    fn classify(&mut self, line: Line, sink: &mut impl EventSink) -> LockCommand {
        self.stats.lines = self.stats.lines.wrapping_add(1);
        let cmd = LockCommand::parse(&line);
        sink.emit(&LockEvent::CommandReceived(line));
        sink.emit(&LockEvent::CommandClassified(cmd));

        match cmd {
            LockCommand::Unlock => self.stats.unlocks = self.stats.unlocks.wrapping_add(1),
            LockCommand::Unknown => self.stats.rejected = self.stats.rejected.wrapping_add(1),
        }
        cmd
    }

    fn reply(
        &mut self,
        channel: &mut impl CommandChannel,
        reply: &'static str,
        sink: &mut impl EventSink,
    ) {
        if let Err(error) = channel.send_line(reply) {
            self.stats.reply_failures = self.stats.reply_failures.wrapping_add(1);
            warn!("Reply '{}' not sent: {}", reply, error);
            sink.emit(&LockEvent::ReplyFailed { reply, error });
        }
    }

    /// Retry a LOW write left over from an earlier failure. Returns `false`
    /// while the pin is still HIGH; no line is read until it is LOW.
    fn settle_release(
        &mut self,
        channel: &mut impl CommandChannel,
        sink: &mut impl EventSink,
    ) -> bool {
        match self.actuator.retry_release() {
            Ok(false) => true,
            Ok(true) => {
                info!("Lock: pending release completed");
                self.finish_unlock(channel, sink);
                true
            }
            Err(e) => {
                self.fault(e, sink);
                false
            }
        }
    }

    /// The pin is LOW again: send the reply owed for the unlock, if any.
    fn finish_unlock(&mut self, channel: &mut impl CommandChannel, sink: &mut impl EventSink) {
        if let Some(reply) = self.awaiting_reply.take() {
            sink.emit(&LockEvent::PulseEnded);
            self.reply(channel, reply, sink);
        }
        if self.is_online() {
            self.state = DispatchState::Idle;
        }
    }

    /// A pin write failed during an unlock. `OK` if the solenoid was powered,
    /// `ERR` if it never was; held back while the release is pending.
    fn pulse_failed(
        &mut self,
        e: ActuatorError,
        channel: &mut impl CommandChannel,
        sink: &mut impl EventSink,
    ) {
        self.fault(e, sink);
        let reply = if e == ActuatorError::DeEnergizeFailed {
            REPLY_OK
        } else {
            REPLY_ERR
        };
        self.awaiting_reply = Some(reply);
        if !self.actuator.release_pending() {
            self.finish_unlock(channel, sink);
        }
    }

    fn fault(&mut self, e: ActuatorError, sink: &mut impl EventSink) {
        self.stats.actuator_faults = self.stats.actuator_faults.wrapping_add(1);
        sink.emit(&LockEvent::ActuatorFault(e));
    }
}

impl<P: OutputPin> Drop for LockController<P> {
    fn drop(&mut self) {
        if self.actuator.is_energized() || self.actuator.release_pending() {
            info!("LockController dropped mid-pulse, releasing");
            let _ = self.actuator.release();
        }
    }
}

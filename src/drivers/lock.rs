//! Solenoid lock driver.
//!
//! One active-high digital output: HIGH powers the solenoid (unlocked), LOW
//! leaves it unpowered (locked). The driver owns the pin, so nothing else in
//! the firmware can leave the lock energized.
//!
//! Two ways to run a pulse:
//!
//! - [`LockActuator::unlock_for`]: energize, sleep, de-energize. Blocks the
//!   caller for the whole pulse.
//! - [`LockActuator::begin_pulse`] + [`LockActuator::poll`]: energize now and
//!   record a release deadline; `poll` de-energizes once the deadline passes.
//!
//! Either way the final LOW write is always attempted, including for a
//! zero-length pulse and after a failed HIGH write. A LOW write that fails
//! outside [`LockActuator::poll`] leaves a pending release; no new pulse
//! starts until [`LockActuator::retry_release`] succeeds.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, OutputPin};
use log::warn;

use crate::error::ActuatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// Pin LOW, solenoid unpowered.
    Locked,
    /// Pin HIGH, solenoid powered.
    Unlocked,
}

/// A pulse scheduled through [`LockActuator::begin_pulse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    pub started_ms: u64,
    pub release_at_ms: u64,
}

/// Outcome of [`LockActuator::begin_pulse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseStatus {
    /// Energized; waiting for the deadline.
    Running(Pulse),
    /// Zero-length pulse, already released.
    Completed,
}

pub struct LockActuator<P: OutputPin> {
    pin: P,
    state: LockState,
    pulse: Option<Pulse>,
    release_pending: bool,
    pulse_count: u32,
}

impl<P: OutputPin> LockActuator<P> {
    /// Take ownership of the pin and drive it to the locked level.
    pub fn new(pin: P) -> Result<Self, ActuatorError> {
        let mut actuator = Self {
            pin,
            state: LockState::Locked,
            pulse: None,
            release_pending: false,
            pulse_count: 0,
        };
        actuator.de_energize()?;
        Ok(actuator)
    }

    /// Energize for `duration_ms`, then de-energize. Blocks the caller.
    pub fn unlock_for(
        &mut self,
        duration_ms: u32,
        delay: &mut impl DelayNs,
    ) -> Result<(), ActuatorError> {
        self.ensure_idle()?;

        let engaged = self.energize();
        if engaged.is_ok() {
            delay.delay_ms(duration_ms);
        }
        let released = self.de_energize_or_defer();
        self.pulse_count = self.pulse_count.wrapping_add(1);

        engaged.and(released)
    }

    /// Energize now and schedule the release at `now_ms + duration_ms`.
    ///
    /// A zero duration releases immediately and returns
    /// [`PulseStatus::Completed`].
    pub fn begin_pulse(
        &mut self,
        now_ms: u64,
        duration_ms: u32,
    ) -> Result<PulseStatus, ActuatorError> {
        self.ensure_idle()?;

        if let Err(e) = self.energize() {
            let _ = self.de_energize_or_defer();
            self.pulse_count = self.pulse_count.wrapping_add(1);
            return Err(e);
        }

        if duration_ms == 0 {
            self.pulse_count = self.pulse_count.wrapping_add(1);
            self.de_energize_or_defer()?;
            return Ok(PulseStatus::Completed);
        }

        let pulse = Pulse {
            started_ms: now_ms,
            release_at_ms: now_ms.saturating_add(u64::from(duration_ms)),
        };
        self.pulse = Some(pulse);
        Ok(PulseStatus::Running(pulse))
    }

    /// Release the lock once the scheduled deadline has passed.
    ///
    /// Returns the finished pulse on the call that de-energizes it, `None`
    /// otherwise. A failed release keeps the pulse scheduled so the next poll
    /// retries the LOW write.
    pub fn poll(&mut self, now_ms: u64) -> Result<Option<Pulse>, ActuatorError> {
        let Some(pulse) = self.pulse else {
            return Ok(None);
        };
        if now_ms < pulse.release_at_ms {
            return Ok(None);
        }

        self.de_energize()?;
        self.pulse = None;
        self.pulse_count = self.pulse_count.wrapping_add(1);
        Ok(Some(pulse))
    }

    /// Drop any scheduled pulse and drive the pin LOW.
    pub fn release(&mut self) -> Result<(), ActuatorError> {
        if self.pulse.take().is_some() {
            self.pulse_count = self.pulse_count.wrapping_add(1);
        }
        self.de_energize_or_defer()
    }

    /// Retry a LOW write that failed earlier.
    ///
    /// Returns `Ok(true)` on the call that clears the pending release,
    /// `Ok(false)` if nothing was pending.
    pub fn retry_release(&mut self) -> Result<bool, ActuatorError> {
        if !self.release_pending {
            return Ok(false);
        }
        self.de_energize()?;
        self.release_pending = false;
        Ok(true)
    }

    /// A LOW write failed and has not been retried successfully yet.
    pub fn release_pending(&self) -> bool {
        self.release_pending
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn is_energized(&self) -> bool {
        self.state == LockState::Unlocked
    }

    /// Pulse currently waiting for its deadline.
    pub fn active_pulse(&self) -> Option<Pulse> {
        self.pulse
    }

    /// Completed pulses since construction.
    pub fn pulse_count(&self) -> u32 {
        self.pulse_count
    }

    fn ensure_idle(&self) -> Result<(), ActuatorError> {
        if self.pulse.is_some() || self.release_pending {
            return Err(ActuatorError::PulseInProgress);
        }
        Ok(())
    }

    fn de_energize_or_defer(&mut self) -> Result<(), ActuatorError> {
        let released = self.de_energize();
        self.release_pending = released.is_err();
        released
    }

    fn energize(&mut self) -> Result<(), ActuatorError> {
        self.pin.set_high().map_err(|e| {
            warn!("Lock: set_high failed ({:?})", e.kind());
            ActuatorError::EnergizeFailed
        })?;
        self.state = LockState::Unlocked;
        Ok(())
    }

    fn de_energize(&mut self) -> Result<(), ActuatorError> {
        self.pin.set_low().map_err(|e| {
            warn!("Lock: set_low failed ({:?})", e.kind());
            ActuatorError::DeEnergizeFailed
        })?;
        self.state = LockState::Locked;
        Ok(())
    }
}

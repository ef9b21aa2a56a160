//! Per-channel soft-PWM state machine.
//!
//! ```text
//!   arm() ──► HIGH ──(duty ticks)──► LOW ──(period - duty ticks)──► HIGH ...
//!               │
//!               └─ duty == 0 on entry: pin low, timer stopped, wait for arm()
//! ```
//!
//! The duty value is read from shared memory once per cycle, on entry to the
//! high phase, and reused for the low phase. A cycle therefore always lasts
//! exactly `carrier_period` ticks, whatever the host writes in between.

use crate::hal::CarrierTimer;
use bridge::{CarrierTiming, Channel, DutyCycle};
use embedded_hal::digital::OutputPin;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    High,
    Low,
}

/// What an interrupt (or an arm) did to the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Pin driven high, high phase scheduled.
    Rising,
    /// Pin driven low, low phase scheduled.
    Falling,
    /// Duty read as zero: pin low and the timer stopped.
    Muted,
    /// Interrupt taken while the channel was not running.
    Spurious,
}

pub struct CarrierChannel<P, T> {
    pin: P,
    timer: T,
    channel: Channel,
    timing: CarrierTiming,
    phase: Phase,
    latched: u32,
    enabled: bool,
}

impl<P: OutputPin, T: CarrierTimer> CarrierChannel<P, T> {
    /// The pin is driven low; the timer is left stopped until `arm`.
    pub fn new(
        mut pin: P,
        mut timer: T,
        channel: Channel,
        timing: CarrierTiming,
    ) -> Result<Self, P::Error> {
        pin.set_low()?;
        timer.stop();
        timer.set_count(0);
        Ok(Self {
            pin,
            timer,
            channel,
            timing,
            phase: Phase::High,
            latched: 0,
            enabled: false,
        })
    }

    /// Main-loop half: start the carrier on the first non-zero duty.
    ///
    /// Returns `true` only on the call that actually armed the timer. Once
    /// running, the interrupt keeps itself going until it reads a zero duty.
    pub fn arm(&mut self, duty: &DutyCycle) -> Result<bool, P::Error> {
        if self.enabled {
            return Ok(false);
        }
        let raw = duty.load(self.channel);
        if raw == 0 {
            return Ok(false);
        }
        self.enter_high(raw)?;
        Ok(true)
    }

    /// Interrupt half: toggle the phase and re-arm the timer.
    pub fn on_interrupt(&mut self, duty: &DutyCycle) -> Result<Edge, P::Error> {
        self.timer.stop();
        if !self.enabled {
            self.timer.clear_interrupt();
            return Ok(Edge::Spurious);
        }

        match self.phase {
            Phase::High => {
                let driven = self.pin.set_low();
                self.idle_on_error(driven)?;
                self.timer.set_count(self.timing.carrier_period - self.latched);
                self.phase = Phase::Low;
                self.timer.clear_interrupt();
                self.timer.start();
                Ok(Edge::Falling)
            }
            Phase::Low => {
                self.timer.clear_interrupt();
                self.enter_high(duty.load(self.channel))
            }
        }
    }

    fn enter_high(&mut self, raw: u32) -> Result<Edge, P::Error> {
        let duty = self.timing.clamp_duty(raw);
        self.phase = Phase::High;

        if duty == 0 {
            self.enabled = false;
            self.latched = 0;
            self.timer.stop();
            let driven = self.pin.set_low();
            self.idle_on_error(driven)?;
            return Ok(Edge::Muted);
        }

        let driven = self.pin.set_high();
        self.idle_on_error(driven)?;
        self.timer.set_count(duty);
        self.latched = duty;
        self.enabled = true;
        self.timer.start();
        Ok(Edge::Rising)
    }

    /// A failed pin write leaves the channel idle with the timer stopped, so
    /// the main loop can arm it again.
    fn idle_on_error(&mut self, driven: Result<(), P::Error>) -> Result<(), P::Error> {
        if driven.is_err() {
            self.timer.stop();
            self.enabled = false;
            self.latched = 0;
            self.phase = Phase::High;
        }
        driven
    }
}

impl<P, T> CarrierChannel<P, T> {
    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Duty of the cycle in progress; zero while muted.
    pub fn latched_duty(&self) -> u32 {
        self.latched
    }

    pub fn timing(&self) -> &CarrierTiming {
        &self.timing
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }
}

//! Host-side stand-ins for the microcontroller peripherals.
//!
//! `VirtualTimer` keeps its own tick counter and a one-shot deadline;
//! [`run_until`] plays the role of the interrupt controller, dispatching
//! expiries in order until a target tick is reached.

use crate::carrier::{CarrierChannel, Edge};
use crate::hal::CarrierTimer;
use crate::synth::SoftPwm;
use bridge::DutyCycle;
use embedded_hal::digital::{ErrorType, OutputPin};
use std::convert::Infallible;
use std::time::{Duration, Instant};

#[derive(Debug, Default, Clone)]
pub struct VirtualTimer {
    now: u64,
    count: u32,
    deadline: Option<u64>,
    pending: bool,
    expiries: u64,
}

impl VirtualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn expiries(&self) -> u64 {
        self.expiries
    }

    /// Move the clock towards `until`.
    ///
    /// Stops at the deadline if one falls strictly before `until` and
    /// returns `true`: the interrupt is then pending and the caller must
    /// service it before advancing again.
    pub fn advance(&mut self, until: u64) -> bool {
        match self.deadline {
            Some(deadline) if deadline < until => {
                self.now = self.now.max(deadline);
                self.deadline = None;
                self.pending = true;
                self.expiries += 1;
                true
            }
            _ => {
                self.now = self.now.max(until);
                false
            }
        }
    }
}

impl CarrierTimer for VirtualTimer {
    fn set_count(&mut self, ticks: u32) {
        self.count = ticks;
    }

    fn start(&mut self) {
        self.deadline = Some(self.now + u64::from(self.count));
    }

    fn stop(&mut self) {
        self.deadline = None;
    }

    fn clear_interrupt(&mut self) {
        self.pending = false;
    }
}

/// Output pin that counts edges.
#[derive(Debug, Default, Clone)]
pub struct SimPin {
    high: bool,
    rising: u64,
    falling: u64,
}

impl SimPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    pub fn rising_edges(&self) -> u64 {
        self.rising
    }

    pub fn falling_edges(&self) -> u64 {
        self.falling
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.high {
            self.falling += 1;
        }
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if !self.high {
            self.rising += 1;
        }
        self.high = true;
        Ok(())
    }
}

/// Maps wall-clock time since creation to timer ticks.
#[derive(Debug, Clone, Copy)]
pub struct TickClock {
    origin: Instant,
    timer_hz: u32,
}

impl TickClock {
    pub fn start(timer_hz: u32) -> Self {
        Self {
            origin: Instant::now(),
            timer_hz,
        }
    }

    pub fn ticks_for(&self, duration: Duration) -> u64 {
        (duration.as_nanos() * u128::from(self.timer_hz) / 1_000_000_000) as u64
    }

    pub fn now(&self) -> u64 {
        self.ticks_for(self.origin.elapsed())
    }
}

/// Edges produced while running one channel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EdgeCount {
    pub rising: u64,
    pub falling: u64,
    pub muted: u64,
}

impl EdgeCount {
    fn record(&mut self, edge: Edge) {
        match edge {
            Edge::Rising => self.rising += 1,
            Edge::Falling => self.falling += 1,
            Edge::Muted => self.muted += 1,
            Edge::Spurious => {}
        }
    }
}

/// Service every expiry of `channel` that falls before tick `until`.
pub fn run_channel_until<P: OutputPin>(
    channel: &mut CarrierChannel<P, VirtualTimer>,
    duty: &DutyCycle,
    until: u64,
) -> Result<EdgeCount, P::Error> {
    let mut edges = EdgeCount::default();
    while channel.timer_mut().advance(until) {
        edges.record(channel.on_interrupt(duty)?);
    }
    Ok(edges)
}

/// Run every channel of `pwm` up to tick `until`. No main-loop pass is made:
/// call [`SoftPwm::poll`] first to arm idle channels.
pub fn run_until<P: OutputPin>(
    pwm: &mut SoftPwm<P, VirtualTimer>,
    duty: &DutyCycle,
    until: u64,
) -> Result<Vec<EdgeCount>, P::Error> {
    pwm.channels_mut()
        .map(|channel| run_channel_until(channel, duty, until))
        .collect()
}

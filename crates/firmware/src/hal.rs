//! Hardware seams of the carrier generator.
//!
//! Pins go through `embedded_hal::digital::OutputPin`. The timer has no
//! `embedded-hal` counterpart, so it gets a small trait of its own covering
//! the four register operations the interrupt handler needs.

use embedded_hal::digital::{Error, ErrorKind, ErrorType, OutputPin};

/// One-shot hardware timer whose expiry raises the carrier interrupt.
pub trait CarrierTimer {
    /// Ticks until the next expiry. Takes effect on the next `start`.
    fn set_count(&mut self, ticks: u32);

    /// Start counting with the interrupt enabled.
    fn start(&mut self);

    /// Stop counting and mask the interrupt.
    fn stop(&mut self);

    /// Acknowledge a pending expiry.
    fn clear_interrupt(&mut self);
}

impl<T: CarrierTimer + ?Sized> CarrierTimer for &mut T {
    fn set_count(&mut self, ticks: u32) {
        (**self).set_count(ticks)
    }

    fn start(&mut self) {
        (**self).start()
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn clear_interrupt(&mut self) {
        (**self).clear_interrupt()
    }
}

/// Two pins driven as one.
///
/// The reference board wires the mono carrier to both speaker pins.
#[derive(Debug)]
pub struct PinPair<A, B> {
    first: A,
    second: B,
}

impl<A, B> PinPair<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    pub fn first(&self) -> &A {
        &self.first
    }

    pub fn second(&self) -> &B {
        &self.second
    }

    pub fn into_inner(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: OutputPin, B: OutputPin> ErrorType for PinPair<A, B> {
    type Error = ErrorKind;
}

impl<A: OutputPin, B: OutputPin> OutputPin for PinPair<A, B> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.first.set_low().map_err(|e| e.kind())?;
        self.second.set_low().map_err(|e| e.kind())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.first.set_high().map_err(|e| e.kind())?;
        self.second.set_high().map_err(|e| e.kind())
    }
}

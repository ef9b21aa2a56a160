use crate::carrier::{CarrierChannel, Edge};
use crate::hal::CarrierTimer;
use bridge::{CarrierTiming, Channel, DutyCycle};
use embedded_hal::digital::OutputPin;

/// Channels armed by one main-loop pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Armed {
    pub left: bool,
    pub right: bool,
}

impl Armed {
    pub fn any(&self) -> bool {
        self.left || self.right
    }
}

/// The soft-PWM synthesizer as wired on the board.
///
/// Mono drives one timer from the left duty field and is usually given a
/// [`PinPair`](crate::hal::PinPair). Stereo runs two independent machines,
/// each on its own timer and pin.
pub enum SoftPwm<P, T> {
    Mono(CarrierChannel<P, T>),
    Stereo {
        left: CarrierChannel<P, T>,
        right: CarrierChannel<P, T>,
    },
}

impl<P: OutputPin, T: CarrierTimer> SoftPwm<P, T> {
    pub fn mono(pins: P, timer: T, timing: CarrierTiming) -> Result<Self, P::Error> {
        Ok(Self::Mono(CarrierChannel::new(pins, timer, Channel::Left, timing)?))
    }

    pub fn stereo(left: (P, T), right: (P, T), timing: CarrierTiming) -> Result<Self, P::Error> {
        Ok(Self::Stereo {
            left: CarrierChannel::new(left.0, left.1, Channel::Left, timing)?,
            right: CarrierChannel::new(right.0, right.1, Channel::Right, timing)?,
        })
    }

    /// One pass of the main loop: arm every idle channel whose duty became
    /// non-zero.
    pub fn poll(&mut self, duty: &DutyCycle) -> Result<Armed, P::Error> {
        match self {
            Self::Mono(ch) => Ok(Armed {
                left: ch.arm(duty)?,
                right: false,
            }),
            Self::Stereo { left, right } => Ok(Armed {
                left: left.arm(duty)?,
                right: right.arm(duty)?,
            }),
        }
    }

    /// Interrupt entry for the timer driving `channel`.
    ///
    /// In mono mode every interrupt belongs to the single machine.
    pub fn on_interrupt(&mut self, channel: Channel, duty: &DutyCycle) -> Result<Edge, P::Error> {
        match self {
            Self::Mono(ch) => ch.on_interrupt(duty),
            Self::Stereo { left, .. } if channel == Channel::Left => left.on_interrupt(duty),
            Self::Stereo { right, .. } => right.on_interrupt(duty),
        }
    }
}

impl<P, T> SoftPwm<P, T> {
    pub fn is_stereo(&self) -> bool {
        matches!(self, Self::Stereo { .. })
    }

    pub fn channels(&self) -> impl Iterator<Item = &CarrierChannel<P, T>> {
        let (first, second) = match self {
            Self::Mono(ch) => (ch, None),
            Self::Stereo { left, right } => (left, Some(right)),
        };
        std::iter::once(first).chain(second)
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut CarrierChannel<P, T>> {
        let (first, second) = match self {
            Self::Mono(ch) => (ch, None),
            Self::Stereo { left, right } => (left, Some(right)),
        };
        std::iter::once(first).chain(second)
    }
}

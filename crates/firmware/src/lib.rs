//! Microcontroller side of the shared-memory link.
//!
//! The firmware waits for the host to publish the log header, takes over as
//! the log producer, then runs the soft-PWM carrier: a main loop that arms
//! idle channels and a timer interrupt that toggles them.

pub mod boot;
pub mod carrier;
pub mod config;
pub mod console;
pub mod hal;
pub mod sim;
pub mod synth;

#[cfg(test)]
mod mocks;

pub use boot::{BootLayout, Booted, bring_up};
pub use carrier::{CarrierChannel, Edge, Phase};
pub use console::Console;
pub use hal::{CarrierTimer, PinPair};
pub use synth::{Armed, SoftPwm};

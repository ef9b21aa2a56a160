//! Shared-memory substrate linking the application core and the
//! microcontroller core.
//!
//! Both sides map the same physical window. Everything that crosses it is
//! defined here: the bit-exact layouts, the ownership handshake for the log
//! header, the single-producer/single-consumer log ring and the duty-cycle
//! struct that carries audio to the soft-PWM carrier.

pub mod duty;
pub mod errors;
pub mod handshake;
pub mod header;
pub mod layout;
pub mod log_ring;
pub mod region;
pub mod timing;

pub use duty::{Channel, DutyControl, DutyCycle};
pub use errors::BridgeError;
pub use handshake::{
    HandshakeConfig, Sleep, ThreadSleep, block_until_host_ready, host_handshake, try_accept_host,
};
pub use header::LogHeader;
pub use log_ring::{LogConsumer, LogProducer, LogRing};
pub use region::SharedRegion;
pub use timing::{CarrierTiming, TimingError};

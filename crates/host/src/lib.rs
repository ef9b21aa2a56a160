//! Application-core side of the shared-memory link: the `log_mcu` byte
//! stream and the soft-PWM playback device.

pub mod config;
pub mod log_device;
pub mod sound;

pub use log_device::{LogChannelConfig, LogDevice};
pub use sound::{AudioError, HwParams, PcmBuffer, Sampler, SoftPwmDevice, TimerRestart};

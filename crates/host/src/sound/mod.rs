//! Soft-PWM sound card: an 8 kHz U8 mono playback stream turned into duty
//! values for the microcontroller carrier.

pub mod device;
pub mod hrtimer;
pub mod pcm;
pub mod playback;
pub mod sampler;

pub use device::{CARD_NAME, SoftPwmDevice, TriggerCommand};
pub use hrtimer::{PeriodicTimer, TimerStats};
pub use pcm::{AudioError, HwParams, SampleFormat, StreamDirection};
pub use playback::{PlaybackStats, SharedPcm, play};
pub use sampler::{PcmBuffer, Sampler, TimerRestart};

//! Stream parameters accepted by the soft-PWM playback device.

use bridge::BridgeError;
use std::fmt;
use thiserror::Error;

pub const RATE_HZ: u32 = 8000;
pub const CHANNELS: u32 = 1;
pub const BUFFER_BYTES_MAX: usize = 8 * 1024;
pub const PERIOD_BYTES_MIN: usize = 4;
pub const PERIOD_BYTES_MAX: usize = 4 * 1024;
pub const PERIODS_MIN: usize = 4;
pub const PERIODS_MAX: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDirection {
    Playback,
    Capture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    U8,
    S8,
    S16Le,
}

impl SampleFormat {
    pub fn bytes(&self) -> usize {
        match self {
            SampleFormat::U8 | SampleFormat::S8 => 1,
            SampleFormat::S16Le => 2,
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleFormat::U8 => "U8",
            SampleFormat::S8 => "S8",
            SampleFormat::S16Le => "S16_LE",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Only playback streams are supported")]
    NotPlayback,

    #[error("Unsupported sample format {0} (only U8)")]
    UnsupportedFormat(SampleFormat),

    #[error("Unsupported channel count {0} (mono only)")]
    UnsupportedChannels(u32),

    #[error("Unsupported rate {0} Hz (only {rate} Hz)", rate = RATE_HZ)]
    UnsupportedRate(u32),

    #[error(
        "Period of {0} bytes outside {min}..={max}",
        min = PERIOD_BYTES_MIN,
        max = PERIOD_BYTES_MAX
    )]
    PeriodSize(usize),

    #[error("{0} periods outside {min}..={max}", min = PERIODS_MIN, max = PERIODS_MAX)]
    PeriodCount(usize),

    #[error("Buffer of {0} bytes exceeds {max}", max = BUFFER_BYTES_MAX)]
    BufferTooLarge(usize),

    #[error("Buffer holds {actual} frames, parameters need {expected}")]
    BufferMismatch { expected: usize, actual: usize },

    #[error("Stream parameters have not been set")]
    NotConfigured,

    #[error("Failed to start the sampling timer: {0}")]
    Timer(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Hardware parameters negotiated for a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HwParams {
    pub direction: StreamDirection,
    pub format: SampleFormat,
    pub channels: u32,
    pub rate: u32,
    pub period_bytes: usize,
    pub periods: usize,
}

impl HwParams {
    /// The only shape the device plays: unsigned 8-bit mono at 8 kHz.
    pub fn mono_u8(period_bytes: usize, periods: usize) -> Self {
        Self {
            direction: StreamDirection::Playback,
            format: SampleFormat::U8,
            channels: CHANNELS,
            rate: RATE_HZ,
            period_bytes,
            periods,
        }
    }

    pub fn validate(&self) -> Result<(), AudioError> {
        if self.direction != StreamDirection::Playback {
            return Err(AudioError::NotPlayback);
        }
        if self.format != SampleFormat::U8 {
            return Err(AudioError::UnsupportedFormat(self.format));
        }
        if self.channels != CHANNELS {
            return Err(AudioError::UnsupportedChannels(self.channels));
        }
        if self.rate != RATE_HZ {
            return Err(AudioError::UnsupportedRate(self.rate));
        }
        if !(PERIOD_BYTES_MIN..=PERIOD_BYTES_MAX).contains(&self.period_bytes) {
            return Err(AudioError::PeriodSize(self.period_bytes));
        }
        if !(PERIODS_MIN..=PERIODS_MAX).contains(&self.periods) {
            return Err(AudioError::PeriodCount(self.periods));
        }
        let buffer = self.buffer_bytes();
        if buffer > BUFFER_BYTES_MAX {
            return Err(AudioError::BufferTooLarge(buffer));
        }
        Ok(())
    }

    pub fn frame_bytes(&self) -> usize {
        self.format.bytes() * self.channels as usize
    }

    pub fn buffer_bytes(&self) -> usize {
        self.period_bytes.saturating_mul(self.periods)
    }

    pub fn period_frames(&self) -> usize {
        self.period_bytes / self.frame_bytes().max(1)
    }

    pub fn buffer_frames(&self) -> usize {
        self.period_frames().saturating_mul(self.periods)
    }
}

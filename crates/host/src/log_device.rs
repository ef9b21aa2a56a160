//! Read-only byte stream over the microcontroller log ring.

use bridge::layout::MIN_LOG_WINDOW;
use bridge::{
    BridgeError, HandshakeConfig, LogConsumer, LogRing, SharedRegion, Sleep, host_handshake,
};
use std::io::{self, Read, Write};
use std::sync::Arc;

/// Name under which the stream is exposed.
pub const DEVICE_NAME: &str = "log_mcu";

/// Placement of the log window inside the shared region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogChannelConfig {
    pub offset: usize,
    /// Header plus ring storage.
    pub length: usize,
}

impl LogChannelConfig {
    /// Reject windows that do not fit before anything is written.
    pub fn validate(&self, region_size: usize) -> Result<(), BridgeError> {
        if self.offset > region_size {
            return Err(BridgeError::OffsetOutOfRange {
                offset: self.offset,
                region_size,
            });
        }
        if self.length > region_size - self.offset {
            return Err(BridgeError::RegionTooSmall {
                offset: self.offset,
                length: self.length,
                region_size,
            });
        }
        if self.length < MIN_LOG_WINDOW {
            return Err(BridgeError::WindowTooSmall {
                length: self.length,
                minimum: MIN_LOG_WINDOW,
            });
        }
        Ok(())
    }
}

pub struct LogDevice {
    consumer: LogConsumer,
}

impl LogDevice {
    /// Validate the window, publish the header and wait for the
    /// microcontroller to take it over.
    ///
    /// A timeout means the device never comes up; there is no retry.
    pub fn probe(
        region: Arc<SharedRegion>,
        channel: &LogChannelConfig,
        handshake: &HandshakeConfig,
        sleeper: &mut impl Sleep,
    ) -> Result<Self, BridgeError> {
        channel.validate(region.len()).inspect_err(|e| {
            tracing::error!(error = %e, "Invalid log window");
        })?;

        let ring = LogRing::attach(region, channel.offset)?;
        let consumer = host_handshake(ring, channel.length, handshake, sleeper)?;

        tracing::info!(
            device = DEVICE_NAME,
            offset = channel.offset,
            capacity = consumer.capacity(),
            "Log device registered"
        );
        Ok(Self { consumer })
    }

    pub fn name(&self) -> &'static str {
        DEVICE_NAME
    }

    pub fn capacity(&self) -> usize {
        self.consumer.capacity()
    }

    pub fn available(&self) -> usize {
        self.consumer.available()
    }

    /// Non-blocking: returns `0` when the ring is empty.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        self.consumer.read(buf)
    }

    /// Copy up to `max` bytes into `out`. On failure nothing is consumed.
    pub fn read_to<W: Write + ?Sized>(&mut self, max: usize, out: &mut W) -> io::Result<usize> {
        self.consumer.read_to(max, out)
    }

    /// Copy what is buffered right now into `out`. Bytes produced while
    /// draining are left for the next read.
    pub fn drain_to<W: Write + ?Sized>(&mut self, out: &mut W) -> io::Result<usize> {
        let snapshot = self.consumer.available();
        self.consumer.read_to(snapshot, out)
    }
}

impl Read for LogDevice {
    /// `Ok(0)` means "nothing right now", not end of stream.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.consumer.read(buf))
    }
}

//! Character output of the firmware, backed by the shared log ring.

use bridge::LogProducer;
use std::fmt;

/// Standard streams accepted by [`Console::write_bytes`].
const MAX_STD_FD: i32 = 2;

/// Formatted output into the log ring.
///
/// Output never fails and never blocks: whatever does not fit in the ring is
/// dropped and counted.
pub struct Console {
    producer: LogProducer,
    dropped: usize,
}

impl Console {
    pub fn new(producer: LogProducer) -> Self {
        Self {
            producer,
            dropped: 0,
        }
    }

    /// Raw write hook for stdout/stdin/stderr (descriptors 0 to 2).
    ///
    /// Returns the number of bytes accepted, or `None` for any other
    /// descriptor.
    pub fn write_bytes(&mut self, fd: i32, bytes: &[u8]) -> Option<usize> {
        if !(0..=MAX_STD_FD).contains(&fd) {
            return None;
        }
        Some(self.push(bytes))
    }

    /// Bytes lost to a full ring since boot.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn producer(&self) -> &LogProducer {
        &self.producer
    }

    fn push(&mut self, bytes: &[u8]) -> usize {
        let written = self.producer.write(bytes);
        self.dropped += bytes.len() - written;
        written
    }
}

impl fmt::Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push(s.as_bytes());
        Ok(())
    }
}

/// `writeln!` into a [`Console`], discarding the (always `Ok`) result.
#[macro_export]
macro_rules! console_log {
    ($console:expr, $($arg:tt)*) => {{
        use ::std::fmt::Write as _;
        let _ = writeln!($console, $($arg)*);
    }};
}

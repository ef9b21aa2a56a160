//! Ownership hand-off of the log header from host to microcontroller.
//!
//! 1. Host writes `capacity`, zeroes `head`/`tail`, fences, stores
//!    `MAGIC_HOST_READY`.
//! 2. Microcontroller, spinning since early boot, sees the ready magic and
//!    stores `MAGIC_MCU_ACK`: it is now the producer.
//! 3. Host polls for the acknowledgement within a bounded retry budget.
//!
//! The microcontroller side has no timeout. It boots far sooner than the
//! host reaches driver probe, so it simply waits.

use crate::errors::BridgeError;
use crate::layout::{MAGIC_HOST_READY, MAGIC_MCU_ACK};
use crate::log_ring::{LogConsumer, LogProducer, LogRing};
use std::sync::atomic::Ordering;
use std::time::Duration;

/// Retry budget for the host waiting on the microcontroller.
///
/// Defaults: 100 polls, 1 ms apart.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    /// Sleeps allowed before giving up.
    pub max_attempts: u32,
    /// Delay between polls.
    pub poll_interval: Duration,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            poll_interval: Duration::from_millis(1),
        }
    }
}

impl HandshakeConfig {
    /// Worst-case time spent sleeping before a timeout is reported.
    pub fn budget(&self) -> Duration {
        self.poll_interval.saturating_mul(self.max_attempts)
    }
}

/// Injectable delay used between handshake polls.
pub trait Sleep {
    fn sleep(&mut self, duration: Duration);
}

/// Real sleeping on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<F: FnMut(Duration)> Sleep for F {
    fn sleep(&mut self, duration: Duration) {
        self(duration)
    }
}

/// Host half of the handshake.
///
/// `length` is the whole log window (header plus ring). The acknowledgement
/// is checked once before the first sleep and once after each; after
/// `max_attempts` sleeps without it the probe fails and the ring is dropped.
pub fn host_handshake(
    ring: LogRing,
    length: usize,
    config: &HandshakeConfig,
    sleeper: &mut impl Sleep,
) -> Result<LogConsumer, BridgeError> {
    let capacity = ring.publish_ready(length)?;

    #[cfg(feature = "tracing")]
    tracing::debug!(
        offset = ring.offset(),
        capacity,
        "Log header published, waiting for microcontroller"
    );

    let mut attempt = 0;
    loop {
        if ring.header().init_flag.load(Ordering::Acquire) == MAGIC_MCU_ACK {
            #[cfg(feature = "tracing")]
            tracing::info!(
                offset = ring.offset(),
                capacity,
                attempts = attempt,
                "Microcontroller took over the log buffer"
            );
            return Ok(ring.into_consumer(capacity));
        }

        if attempt >= config.max_attempts {
            #[cfg(feature = "tracing")]
            tracing::error!(
                attempts = attempt,
                "Failed to handshake with the microcontroller"
            );
            return Err(BridgeError::HandshakeTimeout { attempts: attempt });
        }

        sleeper.sleep(config.poll_interval);
        attempt += 1;
    }
}

/// One non-blocking poll of the microcontroller half.
///
/// If the host has published, acknowledges and returns the producer.
/// Otherwise hands the ring back so the caller can poll again.
pub fn try_accept_host(ring: LogRing) -> Result<LogProducer, LogRing> {
    let header = ring.header();
    if header.init_flag.load(Ordering::Acquire) != MAGIC_HOST_READY {
        return Err(ring);
    }
    header.init_flag.store(MAGIC_MCU_ACK, Ordering::Release);
    Ok(ring.into_producer())
}

/// Microcontroller half: blocks forever until the host publishes.
///
/// `relax` runs between polls (a spin hint, a microsecond delay). If the host
/// never loads its driver this never returns; that is the boot contract.
pub fn block_until_host_ready(mut ring: LogRing, mut relax: impl FnMut()) -> LogProducer {
    loop {
        match try_accept_host(ring) {
            Ok(producer) => return producer,
            Err(pending) => {
                ring = pending;
                relax();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LOG_HEADER_SIZE;
    use crate::region::SharedRegion;
    use std::sync::Arc;
    use std::thread;

    fn region() -> Arc<SharedRegion> {
        Arc::new(SharedRegion::anonymous(4096).unwrap())
    }

    #[test]
    fn test_default_config() {
        let config = HandshakeConfig::default();
        assert_eq!(config.max_attempts, 100);
        assert_eq!(config.poll_interval, Duration::from_millis(1));
        assert_eq!(config.budget(), Duration::from_millis(100));
    }

    #[test]
    fn test_timeout_after_configured_budget() {
        let region = region();
        let ring = LogRing::attach(Arc::clone(&region), 32).unwrap();
        let config = HandshakeConfig {
            max_attempts: 7,
            poll_interval: Duration::from_millis(3),
        };

        let mut slept = Vec::new();
        let mut sleeper = |d: Duration| slept.push(d);
        let result = host_handshake(ring, 256, &config, &mut sleeper);

        match result {
            Err(BridgeError::HandshakeTimeout { attempts }) => assert_eq!(attempts, 7),
            Err(e) => panic!("Expected HandshakeTimeout, got {e}"),
            Ok(_) => panic!("Handshake must not succeed without an acknowledgement"),
        }
        assert_eq!(slept, vec![Duration::from_millis(3); 7]);
    }

    #[test]
    fn test_host_publishes_ready_magic_and_sizes_header() {
        let region = region();
        let observer = LogRing::attach(Arc::clone(&region), 32).unwrap();
        let ring = LogRing::attach(Arc::clone(&region), 32).unwrap();

        // Pretend a previous run left garbage behind.
        observer.header().head.store(9, Ordering::Relaxed);
        observer.header().tail.store(4, Ordering::Relaxed);

        let config = HandshakeConfig {
            max_attempts: 0,
            ..HandshakeConfig::default()
        };
        let _ = host_handshake(ring, 256, &config, &mut ThreadSleep);

        let header = observer.header();
        assert_eq!(header.init_flag.load(Ordering::Acquire), MAGIC_HOST_READY);
        assert_eq!(
            header.capacity.load(Ordering::Acquire) as usize,
            256 - LOG_HEADER_SIZE
        );
        assert_eq!(header.head.load(Ordering::Acquire), 0);
        assert_eq!(header.tail.load(Ordering::Acquire), 0);
    }

    #[test]
    fn test_mcu_does_not_accept_before_host_is_ready() {
        let region = region();
        let ring = LogRing::attach(Arc::clone(&region), 32).unwrap();

        let ring = match try_accept_host(ring) {
            Ok(_) => panic!("Zeroed header must not hand out a producer"),
            Err(ring) => ring,
        };
        assert_eq!(ring.header().init_flag.load(Ordering::Acquire), 0);
    }

    #[test]
    fn test_handshake_with_mcu_thread() {
        let region = region();
        let host_ring = LogRing::attach(Arc::clone(&region), 32).unwrap();
        let mcu_ring = LogRing::attach(Arc::clone(&region), 32).unwrap();

        let mcu = thread::spawn(move || {
            let mut producer = block_until_host_ready(mcu_ring, std::hint::spin_loop);
            producer.write(b"booted\n")
        });

        let mut consumer = host_handshake(
            host_ring,
            512,
            &HandshakeConfig {
                max_attempts: 5_000,
                poll_interval: Duration::from_millis(1),
            },
            &mut ThreadSleep,
        )
        .expect("microcontroller thread acknowledges");

        assert_eq!(mcu.join().unwrap(), 7);
        assert_eq!(consumer.capacity(), 512 - LOG_HEADER_SIZE);

        let mut buf = [0u8; 32];
        let n = consumer.read(&mut buf);
        assert_eq!(&buf[..n], b"booted\n");
    }

    #[test]
    fn test_rejects_window_too_small_before_publishing() {
        let region = region();
        let observer = LogRing::attach(Arc::clone(&region), 32).unwrap();
        let ring = LogRing::attach(Arc::clone(&region), 32).unwrap();

        let result = host_handshake(
            ring,
            LOG_HEADER_SIZE + 1,
            &HandshakeConfig::default(),
            &mut ThreadSleep,
        );
        assert!(matches!(result, Err(BridgeError::WindowTooSmall { .. })));
        assert_eq!(
            observer.header().init_flag.load(Ordering::Acquire),
            0,
            "Nothing is published for an invalid window"
        );
    }

    #[test]
    fn test_rejects_window_past_region_end() {
        let region = region();
        let ring = LogRing::attach(Arc::clone(&region), 32).unwrap();

        let result = host_handshake(ring, 4096, &HandshakeConfig::default(), &mut ThreadSleep);
        assert!(matches!(
            result,
            Err(BridgeError::RegionTooSmall {
                offset: 32,
                length: 4096,
                region_size: 4096
            })
        ));
    }
}

//! Firmware bring-up order.
//!
//! 1. Spin on the log header until the host has published it, then
//!    acknowledge and take over as producer.
//! 2. Announce the log buffer on the new console.
//! 3. Attach the duty struct and zero it before any carrier timer is armed.

use crate::console::Console;
use crate::console_log;
use bridge::layout::{DEFAULT_DUTY_OFFSET, DEFAULT_LOG_OFFSET};
use bridge::{BridgeError, DutyControl, LogRing, SharedRegion, block_until_host_ready};
use std::sync::Arc;

/// Where the firmware finds its structures inside the shared window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootLayout {
    pub log_offset: usize,
    pub duty_offset: usize,
}

impl Default for BootLayout {
    fn default() -> Self {
        Self {
            log_offset: DEFAULT_LOG_OFFSET,
            duty_offset: DEFAULT_DUTY_OFFSET,
        }
    }
}

pub struct Booted {
    pub console: Console,
    pub duty: DutyControl,
}

/// Run the boot sequence. Blocks until the host driver shows up.
///
/// `relax` runs between handshake polls. Errors are only possible for a
/// layout that does not fit the region; the wait itself cannot fail.
pub fn bring_up(
    region: Arc<SharedRegion>,
    layout: &BootLayout,
    relax: impl FnMut(),
) -> Result<Booted, BridgeError> {
    let ring = LogRing::attach(Arc::clone(&region), layout.log_offset)?;
    let duty = DutyControl::attach(region, layout.duty_offset)?;

    let producer = block_until_host_ready(ring, relax);
    let capacity = producer.capacity();
    let mut console = Console::new(producer);
    console_log!(
        console,
        "Load log buffer on: {:#x} ({capacity} bytes)",
        layout.log_offset
    );

    console_log!(console, "Load duty struct on: {:#x}", layout.duty_offset);
    duty.mute();

    Ok(Booted { console, duty })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge::{Channel, HandshakeConfig, ThreadSleep, host_handshake};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_bring_up_waits_for_host_and_zeroes_duty() {
        let region = Arc::new(SharedRegion::anonymous(8192).unwrap());
        let layout = BootLayout::default();

        // Stale duty from a previous session.
        let stale = DutyControl::attach(Arc::clone(&region), layout.duty_offset).unwrap();
        stale.store(Channel::Left, 77);
        stale.store(Channel::Right, 88);

        let mcu_region = Arc::clone(&region);
        let mcu = thread::spawn(move || bring_up(mcu_region, &layout, std::hint::spin_loop));

        let mut consumer = host_handshake(
            LogRing::attach(Arc::clone(&region), layout.log_offset).unwrap(),
            1024,
            &HandshakeConfig {
                max_attempts: 5_000,
                poll_interval: Duration::from_millis(1),
            },
            &mut ThreadSleep,
        )
        .unwrap();

        let booted = mcu.join().unwrap().unwrap();
        assert_eq!(booted.duty.load(Channel::Left), 0);
        assert_eq!(stale.load(Channel::Right), 0);

        let mut out = Vec::new();
        consumer.read_to(usize::MAX, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Load log buffer on: 0x20"));
        assert!(text.contains("Load duty struct on: 0x0\n"));
    }

    #[test]
    fn test_bring_up_rejects_layout_outside_region() {
        let region = Arc::new(SharedRegion::anonymous(64).unwrap());
        let layout = BootLayout {
            log_offset: 4096,
            duty_offset: 0,
        };
        let result = bring_up(region, &layout, || {});
        assert!(matches!(result, Err(BridgeError::OffsetOutOfRange { .. })));
    }
}

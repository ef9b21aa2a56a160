use crate::errors::BridgeError;
use crate::region::SharedRegion;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Left = 0,
    Right = 1,
}

/// Duty values for the soft-PWM carrier, in timer ticks.
///
/// Each field is in `[0, carrier_period)`; `0` is mute. The host's sampling
/// callback is the only writer, the carrier interrupt the only reader. There
/// is no handshake: zero-initialized memory already means "silent".
#[repr(C)]
#[derive(Debug, Default)]
pub struct DutyCycle {
    left: AtomicU32,
    right: AtomicU32,
}

impl DutyCycle {
    pub const SIZE: usize = std::mem::size_of::<Self>();
    pub const ALIGN: usize = std::mem::align_of::<Self>();

    pub const fn new() -> Self {
        Self {
            left: AtomicU32::new(0),
            right: AtomicU32::new(0),
        }
    }

    fn field(&self, channel: Channel) -> &AtomicU32 {
        match channel {
            Channel::Left => &self.left,
            Channel::Right => &self.right,
        }
    }

    #[inline]
    pub fn load(&self, channel: Channel) -> u32 {
        self.field(channel).load(Ordering::Acquire)
    }

    #[inline]
    pub fn store(&self, channel: Channel, duty: u32) {
        self.field(channel).store(duty, Ordering::Release);
    }

    /// Mono playback drives both fields with the same value.
    #[inline]
    pub fn store_mono(&self, duty: u32) {
        self.left.store(duty, Ordering::Release);
        self.right.store(duty, Ordering::Release);
    }

    #[inline]
    pub fn mute(&self) {
        self.store_mono(0);
    }
}

/// Handle on the duty struct inside a shared region.
pub struct DutyControl {
    _region: Arc<SharedRegion>,
    duty: &'static DutyCycle,
}

impl DutyControl {
    /// Attach to the duty struct at `offset`.
    pub fn attach(region: Arc<SharedRegion>, offset: usize) -> Result<Self, BridgeError> {
        let ptr = region.window(offset, DutyCycle::SIZE, DutyCycle::ALIGN)?;

        // SAFETY: the window is in bounds and aligned, and the region is kept
        // alive by `_region` for as long as this reference is reachable. The
        // struct only contains atomics, so shared access is sound.
        let duty = unsafe { &*(ptr.as_ptr() as *const DutyCycle) };

        Ok(Self {
            _region: region,
            duty,
        })
    }

    pub fn cycle(&self) -> &DutyCycle {
        self.duty
    }
}

impl std::ops::Deref for DutyControl {
    type Target = DutyCycle;

    fn deref(&self) -> &DutyCycle {
        self.duty
    }
}

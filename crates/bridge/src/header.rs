use std::sync::atomic::{AtomicU32, AtomicUsize};

/// SAFETY & MEMORY ORDERING:
///
/// This header sits at the log offset of the shared window and is followed
/// directly by `capacity` bytes of ring storage.
///
/// Ownership:
/// - `init_flag`: host writes `MAGIC_HOST_READY`, microcontroller answers with
///   `MAGIC_MCU_ACK`. Nothing else touches it.
/// - `capacity`: written once by the host before the handshake.
/// - `head`: written only by the producer (microcontroller).
/// - `tail`: written only by the consumer (host).
///
/// Producer protocol:
/// 1. Load `tail` with `Ordering::Acquire`
/// 2. Copy payload bytes into the free slots
/// 3. Publish `head` with `Ordering::Release`
///
/// Consumer protocol:
/// 1. Load `head` once with `Ordering::Acquire`
/// 2. Copy the readable bytes out
/// 3. Publish `tail` with `Ordering::Release`
///
/// Field order and widths match the C layout used by the firmware
/// (`u32, u32, size_t, size_t`). Both sides must agree on the pointer width.
#[repr(C)]
pub struct LogHeader {
    pub init_flag: AtomicU32,
    pub capacity: AtomicU32,
    pub head: AtomicUsize,
    pub tail: AtomicUsize,
}

impl LogHeader {
    pub const SIZE: usize = std::mem::size_of::<Self>();
    pub const ALIGN: usize = std::mem::align_of::<Self>();
}

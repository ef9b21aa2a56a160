//! Wire contract of the shared window.
//!
//! Both cores are built against these constants. Changing any of them breaks
//! compatibility with firmware already flashed to the microcontroller.

use crate::duty::DutyCycle;
use crate::header::LogHeader;

/// Stored by the host into `init_flag` once the log header is sized and
/// zeroed ("MCUL").
pub const MAGIC_HOST_READY: u32 = 0x4D43_554C;

/// Stored back by the microcontroller when it takes over as producer ("ULOG").
pub const MAGIC_MCU_ACK: u32 = 0x554C_4F47;

/// Byte size of the log header preceding the ring storage.
pub const LOG_HEADER_SIZE: usize = std::mem::size_of::<LogHeader>();

/// Byte size of the duty-cycle struct.
pub const DUTY_STRUCT_SIZE: usize = std::mem::size_of::<DutyCycle>();

/// The ring keeps one slot free, so a usable log window needs room for at
/// least two bytes of storage.
pub const MIN_LOG_WINDOW: usize = LOG_HEADER_SIZE + 2;

/// Region file used when both binaries run on one machine.
pub const DEFAULT_REGION_PATH: &str = "/dev/shm/mcu_shared_region";

/// Size of the reserved window on the board.
pub const DEFAULT_REGION_SIZE: usize = 16 * 1024;

/// The duty struct sits at the start of the window.
pub const DEFAULT_DUTY_OFFSET: usize = 0;

/// The log header follows the duty struct, on a 32-byte boundary.
pub const DEFAULT_LOG_OFFSET: usize = 32;

/// Header plus ring storage.
pub const DEFAULT_LOG_LENGTH: usize = 4096;

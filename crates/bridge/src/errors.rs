use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Window at offset {offset} does not fit in a {region_size}-byte region")]
    OffsetOutOfRange { offset: usize, region_size: usize },

    #[error(
        "Window of {length} bytes at offset {offset} exceeds the {region_size}-byte region"
    )]
    RegionTooSmall {
        offset: usize,
        length: usize,
        region_size: usize,
    },

    #[error("Log window of {length} bytes is too small (need at least {minimum})")]
    WindowTooSmall { length: usize, minimum: usize },

    #[error("Log window of {length} bytes is too large (at most {maximum})")]
    WindowTooLarge { length: usize, maximum: usize },

    #[error("Offset {offset} is not aligned to {align} bytes")]
    Misaligned { offset: usize, align: usize },

    #[error("Shared region must not be empty")]
    EmptyRegion,

    #[error("Handshake with the microcontroller timed out after {attempts} attempts")]
    HandshakeTimeout { attempts: u32 },
}

//! Byte-oriented circular log buffer.
//!
//! The microcontroller is the only producer, the host the only consumer.
//! `head` and `tail` each have exactly one writer, so no lock protects them;
//! one slot always stays empty so that `head == tail` means "empty".

use crate::errors::BridgeError;
use crate::header::LogHeader;
use crate::layout::{MAGIC_HOST_READY, MIN_LOG_WINDOW};
use crate::region::SharedRegion;
use std::io::{self, Write};
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{Ordering, fence};

/// Bytes currently held, for indices already reduced modulo `capacity`.
#[inline]
fn used(head: usize, tail: usize, capacity: usize) -> usize {
    if head >= tail {
        head - tail
    } else {
        capacity - tail + head
    }
}

/// Ring capacity of a `length`-byte window as stored in the header.
fn capacity_word(length: usize) -> Result<u32, BridgeError> {
    let capacity = length.saturating_sub(LogHeader::SIZE);
    u32::try_from(capacity).map_err(|_| BridgeError::WindowTooLarge {
        length,
        maximum: LogHeader::SIZE.saturating_add(u32::MAX as usize),
    })
}

/// Attachment to a log header inside a shared region, before either side
/// has claimed it.
pub struct LogRing {
    region: Arc<SharedRegion>,
    offset: usize,
    header: NonNull<LogHeader>,
    data: NonNull<u8>,
    /// Ring bytes that physically exist behind the header.
    max_capacity: usize,
}

// The pointers target the region kept alive by `region`; all shared fields
// are atomics.
unsafe impl Send for LogRing {}

impl LogRing {
    /// Attach to the header at `offset`. Only the header itself has to fit:
    /// the microcontroller learns the ring size from the host.
    pub fn attach(region: Arc<SharedRegion>, offset: usize) -> Result<Self, BridgeError> {
        let base = region.window(offset, LogHeader::SIZE, LogHeader::ALIGN)?;
        let max_capacity = region.len() - offset - LogHeader::SIZE;

        // SAFETY: the header window was bounds- and alignment-checked.
        let data = unsafe { base.add(LogHeader::SIZE) };

        Ok(Self {
            region,
            offset,
            header: base.cast(),
            data,
            max_capacity,
        })
    }

    pub fn header(&self) -> &LogHeader {
        // SAFETY: in bounds, aligned, atomics only, region kept alive by self.
        unsafe { self.header.as_ref() }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn region(&self) -> &Arc<SharedRegion> {
        &self.region
    }

    /// Host half of the bring-up: size and zero the header, then publish
    /// `MAGIC_HOST_READY`. Returns the ring capacity.
    pub(crate) fn publish_ready(&self, length: usize) -> Result<usize, BridgeError> {
        if length < MIN_LOG_WINDOW {
            return Err(BridgeError::WindowTooSmall {
                length,
                minimum: MIN_LOG_WINDOW,
            });
        }
        self.region.window(self.offset, length, LogHeader::ALIGN)?;

        let capacity = length - LogHeader::SIZE;
        let capacity_word = capacity_word(length)?;

        let header = self.header();
        header.capacity.store(capacity_word, Ordering::Relaxed);
        header.head.store(0, Ordering::Relaxed);
        header.tail.store(0, Ordering::Relaxed);
        fence(Ordering::Release);
        header.init_flag.store(MAGIC_HOST_READY, Ordering::Release);

        Ok(capacity)
    }

    pub(crate) fn into_consumer(self, capacity: usize) -> LogConsumer {
        LogConsumer {
            ring: self,
            capacity,
        }
    }

    /// The capacity comes from the host; it is clamped to what the region can
    /// actually hold so a corrupted header cannot push writes out of bounds.
    pub(crate) fn into_producer(self) -> LogProducer {
        let announced = self.header().capacity.load(Ordering::Acquire) as usize;
        let capacity = announced.min(self.max_capacity);
        LogProducer {
            ring: self,
            capacity,
        }
    }

    /// Copy `src` into ring storage starting at `at`, splitting at the end.
    ///
    /// # Safety
    /// `at < capacity`, `src.len() < capacity`, and the target slots must be
    /// free (not readable by the consumer).
    unsafe fn copy_in(&self, capacity: usize, at: usize, src: &[u8]) {
        let to_end = capacity - at;
        let data = self.data.as_ptr();
        unsafe {
            if src.len() > to_end {
                std::ptr::copy_nonoverlapping(src.as_ptr(), data.add(at), to_end);
                std::ptr::copy_nonoverlapping(
                    src.as_ptr().add(to_end),
                    data,
                    src.len() - to_end,
                );
            } else {
                std::ptr::copy_nonoverlapping(src.as_ptr(), data.add(at), src.len());
            }
        }
    }

    /// The (up to) two contiguous segments holding `len` bytes from `at`.
    ///
    /// # Safety
    /// `at < capacity`, `len < capacity`, and the slots must be readable
    /// (published by the producer, not yet released by the consumer).
    unsafe fn segments(&self, capacity: usize, at: usize, len: usize) -> (&[u8], &[u8]) {
        let to_end = capacity - at;
        let data = self.data.as_ptr();
        unsafe {
            if len > to_end {
                (
                    std::slice::from_raw_parts(data.add(at), to_end),
                    std::slice::from_raw_parts(data, len - to_end),
                )
            } else {
                (std::slice::from_raw_parts(data.add(at), len), &[][..])
            }
        }
    }
}

/// Microcontroller side of the log ring. Only one exists per ring: it is
/// handed out by the handshake.
pub struct LogProducer {
    ring: LogRing,
    capacity: usize,
}

impl LogProducer {
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current `(head, tail)` as seen from the producer.
    pub fn indices(&self) -> (usize, usize) {
        let header = self.ring.header();
        (
            header.head.load(Ordering::Relaxed),
            header.tail.load(Ordering::Acquire),
        )
    }

    /// Bytes that can be written right now without dropping anything.
    pub fn free(&self) -> usize {
        if self.capacity < 2 {
            return 0;
        }
        let (head, tail) = self.indices();
        let held = used(head % self.capacity, tail % self.capacity, self.capacity);
        self.capacity - held - 1
    }

    /// Write as much of `bytes` as fits and return how many were taken.
    ///
    /// Never blocks and never fails: anything beyond the free space is
    /// dropped. `head` is published last so the consumer never sees it past
    /// bytes that are not written yet.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let capacity = self.capacity;
        if capacity < 2 || bytes.is_empty() {
            return 0;
        }

        let header = self.ring.header();
        let tail = header.tail.load(Ordering::Acquire) % capacity;
        let head = header.head.load(Ordering::Relaxed) % capacity;

        let free = capacity - used(head, tail, capacity) - 1;
        let len = bytes.len().min(free);
        if len == 0 {
            return 0;
        }

        // SAFETY: head < capacity, len <= free < capacity, and slots in
        // [head, head + len) are not readable by the consumer until `head`
        // is published below.
        unsafe { self.ring.copy_in(capacity, head, &bytes[..len]) };

        header.head.store((head + len) % capacity, Ordering::Release);
        len
    }
}

/// Host side of the log ring, handed out by a successful handshake.
pub struct LogConsumer {
    ring: LogRing,
    capacity: usize,
}

impl LogConsumer {
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current `(head, tail)` as seen from the consumer.
    pub fn indices(&self) -> (usize, usize) {
        let header = self.ring.header();
        (
            header.head.load(Ordering::Acquire),
            header.tail.load(Ordering::Relaxed),
        )
    }

    /// Bytes waiting to be read.
    pub fn available(&self) -> usize {
        let (head, tail) = self.indices();
        used(head % self.capacity, tail % self.capacity, self.capacity)
    }

    /// Copy up to `buf.len()` bytes out. Returns `0` immediately when the
    /// ring is empty; callers wanting a stream must poll.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let max = buf.len();
        let mut dst: &mut [u8] = buf;
        // Writing into a slice never fails once `max` caps the length.
        self.read_to(max, &mut dst).unwrap_or(0)
    }

    /// Deliver up to `max` bytes into `out`.
    ///
    /// If `out` fails, the error is returned and `tail` is left where it was,
    /// so the same bytes are offered again on the next call.
    pub fn read_to<W: Write + ?Sized>(&mut self, max: usize, out: &mut W) -> io::Result<usize> {
        let capacity = self.capacity;
        let header = self.ring.header();

        // Single snapshot of `head` for the whole operation.
        let head = header.head.load(Ordering::Acquire) % capacity;
        let tail = header.tail.load(Ordering::Relaxed) % capacity;

        let avail = used(head, tail, capacity);
        if avail == 0 || max == 0 {
            return Ok(0);
        }
        let len = max.min(avail);

        // SAFETY: tail < capacity, len <= avail < capacity, and the slots in
        // [tail, tail + len) were published by the producer and are not
        // reused until `tail` moves past them.
        let (first, second) = unsafe { self.ring.segments(capacity, tail, len) };
        out.write_all(first)?;
        if !second.is_empty() {
            out.write_all(second)?;
        }

        header.tail.store((tail + len) % capacity, Ordering::Release);
        Ok(len)
    }
}

use crate::errors::BridgeError;
use memmap2::{MmapMut, MmapOptions};
use std::fs::OpenOptions;
use std::path::Path;
use std::ptr::NonNull;

/// Keeps the mapping alive for as long as the region exists.
enum Backing {
    Mapped(MmapMut),
    /// Memory owned by the platform (linker-reserved carve-out).
    External,
}

/// A window of memory visible to both cores.
///
/// The region never hands out `&[u8]`/`&mut [u8]` views of itself: the other
/// core writes into it concurrently, so every access goes through the typed
/// views (`LogRing`, `DutyControl`) using atomics and raw copies.
pub struct SharedRegion {
    _backing: Backing,
    base: NonNull<u8>,
    len: usize,
}

// The region is plain shared memory; synchronization is the business of the
// typed views layered on top of it.
unsafe impl Send for SharedRegion {}
unsafe impl Sync for SharedRegion {}

impl SharedRegion {
    /// Create or open a region file and map it.
    ///
    /// Creates the file if it doesn't exist and grows it if undersized. The
    /// contents are left as they are: the handshake, not the mapping, decides
    /// what the bytes mean.
    pub fn create_and_init(path: impl AsRef<Path>, size: usize) -> Result<Self, BridgeError> {
        if size == 0 {
            return Err(BridgeError::EmptyRegion);
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if file.metadata()?.len() < size as u64 {
            file.set_len(size as u64)?;
        }

        let mmap = unsafe { MmapOptions::new().len(size).map_mut(&file)? };

        Ok(Self::from_mmap(mmap))
    }

    /// Map a region file created by the other side.
    ///
    /// Returns an error if the file doesn't exist or is empty.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        if file.metadata()?.len() == 0 {
            return Err(BridgeError::EmptyRegion);
        }

        let mmap = unsafe { MmapOptions::new().map_mut(&file)? };

        Ok(Self::from_mmap(mmap))
    }

    /// Zero-filled region private to this process, for tests and
    /// single-process simulation.
    pub fn anonymous(size: usize) -> Result<Self, BridgeError> {
        if size == 0 {
            return Err(BridgeError::EmptyRegion);
        }
        let mmap = MmapOptions::new().len(size).map_anon()?;
        Ok(Self::from_mmap(mmap))
    }

    /// Wrap memory the platform reserved for the other core.
    ///
    /// # Safety
    /// `base` must point to `len` bytes that stay valid and writable for the
    /// lifetime of the returned region, and must not be handed out to Rust
    /// code as ordinary references elsewhere.
    pub unsafe fn from_raw_parts(base: NonNull<u8>, len: usize) -> Self {
        Self {
            _backing: Backing::External,
            base,
            len,
        }
    }

    fn from_mmap(mut mmap: MmapMut) -> Self {
        let len = mmap.len();
        // A mapping is never null; dangling only happens for zero-length maps,
        // which the constructors reject.
        let base = NonNull::new(mmap.as_mut_ptr()).unwrap_or(NonNull::dangling());
        Self {
            _backing: Backing::Mapped(mmap),
            base,
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Validates that `length` bytes starting at `offset` lie inside the
    /// region and that `offset` satisfies `align`, then returns a pointer to
    /// the start of the window.
    pub(crate) fn window(
        &self,
        offset: usize,
        length: usize,
        align: usize,
    ) -> Result<NonNull<u8>, BridgeError> {
        if offset > self.len {
            return Err(BridgeError::OffsetOutOfRange {
                offset,
                region_size: self.len,
            });
        }
        if length > self.len - offset {
            return Err(BridgeError::RegionTooSmall {
                offset,
                length,
                region_size: self.len,
            });
        }

        let addr = self.base.as_ptr() as usize + offset;
        if !addr.is_multiple_of(align) {
            return Err(BridgeError::Misaligned { offset, align });
        }

        // SAFETY: offset <= len was checked above.
        Ok(unsafe { self.base.add(offset) })
    }
}

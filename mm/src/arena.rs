//! Bump arena over a fixed byte region.
//!
//! Every allocation is rounded up to [`ARENA_ALIGN`] and carved off the front
//! of the remaining space. The cursor only moves forward: [`Arena::free`] is a
//! no-op and a request that does not fit fails instead of wrapping. Once the
//! region is used up, every later request fails as well.
//!
//! That is only acceptable because total allocation volume on the boot path is
//! small and bounded compared with the region size. Long-running consumers
//! that churn through buffers will eventually exhaust it.

use core::alloc::Layout;
use core::marker::PhantomData;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};

use bootcore_lib::{checked_align_up_usize, klog_debug};

use crate::error::{MmError, MmResult};

/// Minimum alignment of every pointer handed out by an [`Arena`].
pub const ARENA_ALIGN: usize = 16;

pub struct Arena<'r> {
    base: NonNull<u8>,
    capacity: usize,
    /// Offset of the first free byte from `base`. Never decreases.
    cursor: AtomicUsize,
    _region: PhantomData<&'r mut [u8]>,
}

// SAFETY: the cursor is advanced with a compare-exchange, so two callers can
// never be handed overlapping ranges, and the region itself is exclusively
// borrowed for `'r`.
unsafe impl Send for Arena<'_> {}
unsafe impl Sync for Arena<'_> {}

impl<'r> Arena<'r> {
    /// Take exclusive ownership of `region` for the arena's lifetime.
    pub fn new(region: &'r mut [u8]) -> Self {
        let capacity = region.len();
        // A slice pointer is never null, even for an empty slice.
        let base = NonNull::from(region).cast::<u8>();
        Self {
            base,
            capacity,
            cursor: AtomicUsize::new(0),
            _region: PhantomData,
        }
    }

    /// Allocate `size` bytes aligned to [`ARENA_ALIGN`].
    pub fn allocate(&self, size: usize) -> MmResult<NonNull<u8>> {
        self.allocate_aligned(size, ARENA_ALIGN)
    }

    /// Allocate for `layout`, honouring alignments stricter than [`ARENA_ALIGN`].
    pub fn allocate_layout(&self, layout: Layout) -> MmResult<NonNull<u8>> {
        self.allocate_aligned(layout.size(), layout.align().max(ARENA_ALIGN))
    }

    fn allocate_aligned(&self, size: usize, align: usize) -> MmResult<NonNull<u8>> {
        let base_addr = self.base.as_ptr() as usize;

        loop {
            let cursor = self.cursor.load(Ordering::Relaxed);
            let exhausted = MmError::AllocationExhausted {
                requested: size,
                remaining: self.capacity - cursor,
            };

            let offset = match base_addr
                .checked_add(cursor)
                .and_then(|addr| checked_align_up_usize(addr, align))
            {
                Some(aligned) => aligned - base_addr,
                None => return Err(exhausted),
            };
            let end = match offset.checked_add(size) {
                Some(end) => end,
                None => return Err(exhausted),
            };
            // `offset < capacity` keeps zero-sized requests from succeeding on
            // a spent arena.
            if end > self.capacity || offset >= self.capacity {
                klog_debug!(
                    "arena: request for {} bytes failed ({} of {} used)",
                    size,
                    cursor,
                    self.capacity
                );
                return Err(exhausted);
            }

            if self
                .cursor
                .compare_exchange_weak(cursor, end, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                // SAFETY: offset < capacity, so the pointer stays inside the region.
                return Ok(unsafe { self.base.add(offset) });
            }
        }
    }

    /// Give a block back. Arenas never reclaim, so this does nothing.
    #[inline]
    pub fn free(&self, _ptr: NonNull<u8>) {}

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes consumed so far, alignment padding included.
    pub fn used(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.used()
    }
}

impl core::fmt::Debug for Arena<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Arena")
            .field("base", &self.base)
            .field("capacity", &self.capacity)
            .field("used", &self.used())
            .finish()
    }
}

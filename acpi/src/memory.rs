//! Views over physical memory.
//!
//! Firmware tables are found by physical address. Everything that reads them
//! goes through [`PhysMemory`], which hands out bounds-checked byte slices
//! instead of raw pointers. On the machine that is [`OffsetMapped`] (physical
//! memory mapped at a fixed virtual offset); in tests it is one or more
//! [`MemoryWindow`]s over ordinary buffers.

/// Read access to physical memory.
pub trait PhysMemory {
    /// Bytes `[phys, phys + len)`, or `None` if any part of the range is not
    /// readable through this view.
    fn slice(&self, phys: u64, len: usize) -> Option<&[u8]>;
}

impl<M: PhysMemory + ?Sized> PhysMemory for &M {
    fn slice(&self, phys: u64, len: usize) -> Option<&[u8]> {
        (**self).slice(phys, len)
    }
}

/// A byte buffer standing in for physical memory starting at `base`.
#[derive(Clone, Copy, Debug)]
pub struct MemoryWindow<'a> {
    base: u64,
    bytes: &'a [u8],
}

impl<'a> MemoryWindow<'a> {
    pub const fn new(base: u64, bytes: &'a [u8]) -> Self {
        Self { base, bytes }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    /// One past the last physical address covered.
    pub fn end(&self) -> u64 {
        self.base.saturating_add(self.bytes.len() as u64)
    }
}

impl PhysMemory for MemoryWindow<'_> {
    fn slice(&self, phys: u64, len: usize) -> Option<&[u8]> {
        let offset = usize::try_from(phys.checked_sub(self.base)?).ok()?;
        let end = offset.checked_add(len)?;
        self.bytes.get(offset..end)
    }
}

/// Several disjoint windows; a range must fall entirely inside one of them.
impl PhysMemory for [MemoryWindow<'_>] {
    fn slice(&self, phys: u64, len: usize) -> Option<&[u8]> {
        self.iter().find_map(|window| window.slice(phys, len))
    }
}

/// Physical memory mapped linearly at `phys + offset` (identity when the
/// offset is zero), readable below `phys_limit`.
#[derive(Clone, Copy, Debug)]
pub struct OffsetMapped {
    offset: u64,
    phys_limit: u64,
}

impl OffsetMapped {
    /// # Safety
    ///
    /// Every physical address below `phys_limit` that this view is asked
    /// about (the BIOS data area, the EBDA, the BIOS ROM window, and whatever
    /// the firmware tables point at) must be mapped and readable at
    /// `phys + offset` for the lifetime of the view.
    pub const unsafe fn new(offset: u64, phys_limit: u64) -> Self {
        Self { offset, phys_limit }
    }

    /// One past the highest physical address this view will read.
    pub fn phys_limit(&self) -> u64 {
        self.phys_limit
    }
}

impl PhysMemory for OffsetMapped {
    fn slice(&self, phys: u64, len: usize) -> Option<&[u8]> {
        if phys == 0 {
            return None;
        }
        let phys_end = phys.checked_add(len as u64)?;
        if phys_end > self.phys_limit {
            return None;
        }
        let virt = phys.checked_add(self.offset)?;
        virt.checked_add(len as u64)?;
        let virt = usize::try_from(virt).ok()?;
        // SAFETY: the range lies below `phys_limit`, covered by the contract
        // of `OffsetMapped::new`.
        Some(unsafe { core::slice::from_raw_parts(virt as *const u8, len) })
    }
}

/// Little-endian field reads from firmware structures. Out-of-range reads
/// yield `None` rather than panicking.
pub(crate) trait ByteReader {
    fn read8(&self, index: usize) -> Option<u8>;
    fn read16(&self, index: usize) -> Option<u16>;
    fn read32(&self, index: usize) -> Option<u32>;
    fn read64(&self, index: usize) -> Option<u64>;
    fn read_array<const N: usize>(&self, index: usize) -> Option<[u8; N]>;
}

impl ByteReader for [u8] {
    fn read8(&self, index: usize) -> Option<u8> {
        self.get(index).copied()
    }

    fn read16(&self, index: usize) -> Option<u16> {
        self.read_array(index).map(u16::from_le_bytes)
    }

    fn read32(&self, index: usize) -> Option<u32> {
        self.read_array(index).map(u32::from_le_bytes)
    }

    fn read64(&self, index: usize) -> Option<u64> {
        self.read_array(index).map(u64::from_le_bytes)
    }

    fn read_array<const N: usize>(&self, index: usize) -> Option<[u8; N]> {
        let end = index.checked_add(N)?;
        self.get(index..end)?.try_into().ok()
    }
}

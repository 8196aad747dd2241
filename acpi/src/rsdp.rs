//! Root System Description Pointer discovery.
//!
//! The RSDP is found by scanning for the `"RSD PTR "` signature on 16-byte
//! boundaries, first in the first KiB of the Extended BIOS Data Area (whose
//! segment is stored at physical `0x40E`), then across the BIOS ROM window
//! `0xE0000..0x100000`.
//!
//! A candidate is accepted once its first 20 bytes (the ACPI 1.0 layout) sum
//! to zero. Revision 2+ descriptors additionally carry a length, an XSDT
//! address and an extended checksum over the whole structure; if that second
//! check fails the descriptor is still usable through its 1.0 fields.

use bootcore_lib::{klog_debug, klog_info, klog_warn};

use crate::error::{AcpiError, AcpiResult};
use crate::memory::{ByteReader, PhysMemory};
use crate::tables::checksum;

pub const RSDP_SIGNATURE: &[u8; 8] = b"RSD PTR ";

/// Size of the ACPI 1.0 descriptor, covered by the legacy checksum.
pub const RSDP_V1_LEN: usize = 20;
/// Size of the ACPI 2.0+ descriptor.
pub const RSDP_V2_LEN: usize = 36;
/// Largest declared descriptor length that is mapped for the extended checksum.
pub const RSDP_MAX_LEN: usize = 4096;

/// Physical address of the BDA word holding the EBDA segment.
pub const EBDA_SEGMENT_PTR: u64 = 0x40E;
pub const EBDA_SEARCH_LEN: u64 = 1024;
pub const BIOS_ROM_START: u64 = 0xE0000;
pub const BIOS_ROM_END: u64 = 0x100000;
pub const RSDP_SCAN_STEP: usize = 16;

/// Fields of the ACPI 1.0 descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RsdpV1 {
    /// Physical address the descriptor was found at.
    pub address: u64,
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub revision: u8,
    pub rsdt_address: u32,
}

/// An ACPI 2.0+ descriptor whose extended checksum has been verified.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RsdpV2 {
    pub v1: RsdpV1,
    pub length: u32,
    pub xsdt_address: u64,
    pub extended_checksum: u8,
}

/// A validated root descriptor. The variant is decided once, while parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RootDescriptor {
    V1(RsdpV1),
    V2(RsdpV2),
}

impl RootDescriptor {
    pub fn legacy(&self) -> &RsdpV1 {
        match self {
            Self::V1(v1) => v1,
            Self::V2(v2) => &v2.v1,
        }
    }

    pub fn address(&self) -> u64 {
        self.legacy().address
    }

    pub fn revision(&self) -> u8 {
        self.legacy().revision
    }

    pub fn oem_id(&self) -> &[u8; 6] {
        &self.legacy().oem_id
    }

    pub fn rsdt_address(&self) -> u32 {
        self.legacy().rsdt_address
    }

    /// XSDT address, only for a validated 2.0+ descriptor.
    pub fn xsdt_address(&self) -> Option<u64> {
        match self {
            Self::V1(_) => None,
            Self::V2(v2) => Some(v2.xsdt_address),
        }
    }
}

/// Find and validate the root descriptor.
pub fn locate_root<M: PhysMemory + ?Sized>(mem: &M) -> AcpiResult<RootDescriptor> {
    if let Some(ebda) = ebda_base(mem) {
        if let Some(root) = scan_region(mem, ebda, EBDA_SEARCH_LEN) {
            klog_info!("ACPI: RSDP revision {} found in EBDA at {:#x}", root.revision(), root.address());
            return Ok(root);
        }
    }

    if let Some(root) = scan_region(mem, BIOS_ROM_START, BIOS_ROM_END - BIOS_ROM_START) {
        klog_info!(
            "ACPI: RSDP revision {} found in BIOS area at {:#x}",
            root.revision(),
            root.address()
        );
        return Ok(root);
    }

    klog_warn!("ACPI: RSDP not found");
    Err(AcpiError::NotFound)
}

fn ebda_base<M: PhysMemory + ?Sized>(mem: &M) -> Option<u64> {
    let segment = mem.slice(EBDA_SEGMENT_PTR, 2)?.read16(0)?;
    if segment == 0 {
        return None;
    }
    Some(u64::from(segment) << 4)
}

fn scan_region<M: PhysMemory + ?Sized>(mem: &M, start: u64, len: u64) -> Option<RootDescriptor> {
    (start..start.saturating_add(len))
        .step_by(RSDP_SCAN_STEP)
        .find_map(|addr| parse_at(mem, addr))
}

/// Validate a descriptor candidate at `addr`.
pub fn parse_at<M: PhysMemory + ?Sized>(mem: &M, addr: u64) -> Option<RootDescriptor> {
    let bytes = mem.slice(addr, RSDP_V1_LEN)?;
    if bytes.read_array::<8>(0)? != *RSDP_SIGNATURE {
        return None;
    }
    if checksum(bytes) != 0 {
        klog_warn!("ACPI: RSDP candidate at {:#x} has a bad checksum, skipping", addr);
        return None;
    }

    let v1 = RsdpV1 {
        address: addr,
        checksum: bytes.read8(8)?,
        oem_id: bytes.read_array(9)?,
        revision: bytes.read8(15)?,
        rsdt_address: bytes.read32(16)?,
    };

    if v1.revision >= 2 {
        if let Some(v2) = parse_extended(mem, v1) {
            return Some(RootDescriptor::V2(v2));
        }
        klog_warn!(
            "ACPI: revision {} RSDP at {:#x} failed extended validation, using 1.0 fields",
            v1.revision,
            addr
        );
    }
    Some(RootDescriptor::V1(v1))
}

fn parse_extended<M: PhysMemory + ?Sized>(mem: &M, v1: RsdpV1) -> Option<RsdpV2> {
    let head = mem.slice(v1.address, RSDP_V2_LEN)?;
    let length = head.read32(20)?;
    if (length as usize) < RSDP_V2_LEN {
        klog_debug!("ACPI: RSDP length {} shorter than the 2.0 layout", length);
        return None;
    }
    if length as usize > RSDP_MAX_LEN {
        klog_debug!("ACPI: RSDP length {:#x} is implausible", length);
        return None;
    }
    let full = mem.slice(v1.address, length as usize)?;
    if checksum(full) != 0 {
        return None;
    }
    Some(RsdpV2 {
        v1,
        length,
        xsdt_address: head.read64(24)?,
        extended_checksum: head.read8(32)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryWindow, OffsetMapped};
    use crate::test_fixtures::{FirmwareImage, rsdp_v1, rsdp_v2};
    use std::vec;

    #[test]
    fn test_v1_found_in_ebda() {
        let mut image = FirmwareImage::new();
        image.set_ebda_segment(0x9FC0);
        image.place(0x9FC00 + 0x40, rsdp_v1(0x1234_0000));
        let mem = image.memory();

        let root = locate_root(mem.as_slice()).unwrap();
        assert_eq!(root.address(), 0x9FC40);
        assert_eq!(root.rsdt_address(), 0x1234_0000);
        assert_eq!(root.revision(), 0);
        assert!(matches!(root, RootDescriptor::V1(_)));
        assert_eq!(root.oem_id(), b"BOOTCR");
    }

    #[test]
    fn test_v2_found_in_bios_area() {
        let mut image = FirmwareImage::new();
        image.place(0xF5A30, rsdp_v2(0x7FE1_0000, 0x7FE2_0000));
        let mem = image.memory();

        let root = locate_root(mem.as_slice()).unwrap();
        assert_eq!(root.address(), 0xF5A30);
        assert_eq!(root.xsdt_address(), Some(0x7FE2_0000));
        match root {
            RootDescriptor::V2(v2) => assert_eq!(v2.length as usize, RSDP_V2_LEN),
            RootDescriptor::V1(_) => panic!("expected extended descriptor"),
        }
    }

    #[test]
    fn test_ebda_searched_before_bios_area() {
        let mut image = FirmwareImage::new();
        image.set_ebda_segment(0x9000);
        image.place(0x90000, rsdp_v1(0xAAAA));
        image.place(0xE0000, rsdp_v1(0xBBBB));
        let mem = image.memory();

        assert_eq!(locate_root(mem.as_slice()).unwrap().rsdt_address(), 0xAAAA);
    }

    #[test]
    fn test_ebda_scan_limited_to_first_kib() {
        let mut image = FirmwareImage::new();
        image.set_ebda_segment(0x9FC0);
        image.place(0x9FC00 + EBDA_SEARCH_LEN, rsdp_v1(0xAAAA));
        let mem = image.memory();
        assert_eq!(locate_root(mem.as_slice()), Err(AcpiError::NotFound));

        image.place(0xE0000, rsdp_v1(0xBBBB));
        let mem = image.memory();
        let root = locate_root(mem.as_slice()).unwrap();
        assert_eq!(root.address(), 0xE0000);
        assert_eq!(root.rsdt_address(), 0xBBBB);
    }

    #[test]
    fn test_misaligned_signature_is_ignored() {
        let mut image = FirmwareImage::new();
        image.place(0xE0008, rsdp_v1(0x1000));
        let mem = image.memory();

        assert_eq!(locate_root(mem.as_slice()), Err(AcpiError::NotFound));
    }

    #[test]
    fn test_not_found_when_both_regions_empty() {
        let image = FirmwareImage::new();
        let mem = image.memory();
        assert_eq!(locate_root(mem.as_slice()), Err(AcpiError::NotFound));
    }

    #[test]
    fn test_any_single_bit_flip_in_v1_is_rejected() {
        let good = rsdp_v1(0x00C0_FFEE);
        for byte in 0..RSDP_V1_LEN {
            for bit in 0..8 {
                let mut bad = good.clone();
                bad[byte] ^= 1 << bit;
                let window = MemoryWindow::new(0xE0000, &bad);
                assert!(parse_at(&window, 0xE0000).is_none(), "byte {} bit {}", byte, bit);
            }
        }
        let window = MemoryWindow::new(0xE0000, &good);
        assert!(parse_at(&window, 0xE0000).is_some());
    }

    #[test]
    fn test_corrupt_candidate_skipped_for_later_valid_one() {
        let mut image = FirmwareImage::new();
        let mut bad = rsdp_v1(0x1111);
        bad[16] ^= 0xFF;
        image.place(0xE0000, bad);
        image.place(0xE0010, rsdp_v1(0x2222));
        let mem = image.memory();

        let root = locate_root(mem.as_slice()).unwrap();
        assert_eq!(root.address(), 0xE0010);
        assert_eq!(root.rsdt_address(), 0x2222);
    }

    #[test]
    fn test_bad_extended_checksum_falls_back_to_v1() {
        let mut bytes = rsdp_v2(0x4000, 0x8000);
        // Corrupt only the extended area; the first 20 bytes still sum to zero.
        bytes[24] ^= 0x01;
        let window = MemoryWindow::new(0xE0000, &bytes);

        let root = parse_at(&window, 0xE0000).unwrap();
        assert!(matches!(root, RootDescriptor::V1(_)));
        assert_eq!(root.revision(), 2);
        assert_eq!(root.xsdt_address(), None);
        assert_eq!(root.rsdt_address(), 0x4000);
    }

    #[test]
    fn test_short_declared_length_falls_back_to_v1() {
        let mut bytes = rsdp_v2(0x4000, 0x8000);
        bytes[20..24].copy_from_slice(&20u32.to_le_bytes());
        crate::test_fixtures::fix_checksum(&mut bytes[..RSDP_V1_LEN], 8);
        let window = MemoryWindow::new(0xE0000, &bytes);

        assert!(matches!(
            parse_at(&window, 0xE0000),
            Some(RootDescriptor::V1(_))
        ));
    }

    #[test]
    fn test_oversized_length_on_bounded_view_falls_back_to_v1() {
        for declared in [0xFFFF_FF00u32, 0x100] {
            let mut buf = vec![0u8; 64];
            buf[..RSDP_V2_LEN].copy_from_slice(&rsdp_v2(0x4000, 0x8000));
            buf[20..24].copy_from_slice(&declared.to_le_bytes());
            let offset = (buf.as_ptr() as u64).wrapping_sub(0x1000);
            let mem = unsafe { OffsetMapped::new(offset, 0x1000 + buf.len() as u64) };

            let root = parse_at(&mem, 0x1000).unwrap();
            assert!(matches!(root, RootDescriptor::V1(_)), "length {:#x}", declared);
            assert_eq!(root.rsdt_address(), 0x4000);
        }
    }

    #[test]
    fn test_truncated_memory_at_region_end() {
        // A signature in the last 16 bytes of the ROM window cannot hold a
        // full descriptor and must not be read past the end.
        let mut rom = vec![0u8; (BIOS_ROM_END - BIOS_ROM_START) as usize];
        let tail = rom.len() - 16;
        rom[tail..tail + 8].copy_from_slice(RSDP_SIGNATURE);
        let window = MemoryWindow::new(BIOS_ROM_START, &rom);

        assert_eq!(locate_root(&window), Err(AcpiError::NotFound));
    }
}

//! Synthetic firmware images for host tests.
//!
//! Builders produce byte-exact RSDP, RSDT/XSDT and FADT blobs with correct
//! checksums; [`FirmwareImage`] places them at physical addresses and exposes
//! the result as a list of [`MemoryWindow`]s.

use std::vec;
use std::vec::Vec;

use crate::memory::MemoryWindow;
use crate::rsdp::{BIOS_ROM_END, BIOS_ROM_START, EBDA_SEARCH_LEN, EBDA_SEGMENT_PTR, RSDP_SIGNATURE};
use crate::tables::{RSDT_SIGNATURE, SDT_HEADER_LEN, XSDT_SIGNATURE, checksum};

pub const OEM_ID: &[u8; 6] = b"BOOTCR";

/// Make `bytes` sum to zero by adjusting the byte at `index`.
pub fn fix_checksum(bytes: &mut [u8], index: usize) {
    bytes[index] = 0;
    bytes[index] = 0u8.wrapping_sub(checksum(bytes));
}

pub fn rsdp_v1(rsdt_address: u32) -> Vec<u8> {
    let mut b = vec![0u8; 20];
    b[..8].copy_from_slice(RSDP_SIGNATURE);
    b[9..15].copy_from_slice(OEM_ID);
    b[15] = 0;
    b[16..20].copy_from_slice(&rsdt_address.to_le_bytes());
    fix_checksum(&mut b, 8);
    b
}

pub fn rsdp_v2(rsdt_address: u32, xsdt_address: u64) -> Vec<u8> {
    let mut b = vec![0u8; 36];
    b[..8].copy_from_slice(RSDP_SIGNATURE);
    b[9..15].copy_from_slice(OEM_ID);
    b[15] = 2;
    b[16..20].copy_from_slice(&rsdt_address.to_le_bytes());
    b[20..24].copy_from_slice(&36u32.to_le_bytes());
    b[24..32].copy_from_slice(&xsdt_address.to_le_bytes());
    fix_checksum(&mut b[..20], 8);
    fix_checksum(&mut b, 32);
    b
}

/// A table with a standard header around `payload`.
pub fn sdt(signature: &[u8; 4], revision: u8, payload: &[u8]) -> Vec<u8> {
    let length = (SDT_HEADER_LEN + payload.len()) as u32;
    let mut b = vec![0u8; SDT_HEADER_LEN];
    b[..4].copy_from_slice(signature);
    b[4..8].copy_from_slice(&length.to_le_bytes());
    b[8] = revision;
    b[10..16].copy_from_slice(OEM_ID);
    b[16..24].copy_from_slice(b"BOOTCORE");
    b[24..28].copy_from_slice(&1u32.to_le_bytes());
    b[28..32].copy_from_slice(b"BCTL");
    b[32..36].copy_from_slice(&0x2026_0101u32.to_le_bytes());
    b.extend_from_slice(payload);
    fix_checksum(&mut b, 9);
    b
}

pub fn rsdt(entries: &[u32]) -> Vec<u8> {
    let payload: Vec<u8> = entries.iter().flat_map(|e| e.to_le_bytes()).collect();
    sdt(RSDT_SIGNATURE, 1, &payload)
}

pub fn xsdt(entries: &[u64]) -> Vec<u8> {
    let payload: Vec<u8> = entries.iter().flat_map(|e| e.to_le_bytes()).collect();
    sdt(XSDT_SIGNATURE, 1, &payload)
}

/// FADT field values; [`FadtBuilder::build`] lays them out at their ACPI
/// offsets. Defaults resemble a QEMU PIIX4 machine.
#[derive(Clone, Debug)]
pub struct FadtBuilder {
    pub revision: u8,
    /// Total table length; 116 for an ACPI 1.0 table.
    pub length: usize,
    pub firmware_ctrl: u32,
    pub dsdt: u32,
    pub sci_interrupt: u16,
    pub smi_command: u32,
    pub acpi_enable: u8,
    pub acpi_disable: u8,
    pub pm1a_event: u32,
    pub pm1b_event: u32,
    pub pm1a_control: u32,
    pub pm1b_control: u32,
    pub pm_timer: u32,
    pub flags: u32,
    /// `(address space, address, value)` of the reset register.
    pub reset: Option<(u8, u64, u8)>,
}

impl Default for FadtBuilder {
    fn default() -> Self {
        Self {
            revision: 3,
            length: 244,
            firmware_ctrl: 0x7FE4_0000,
            dsdt: 0x7FE4_0040,
            sci_interrupt: 9,
            smi_command: 0xB2,
            acpi_enable: 0xF1,
            acpi_disable: 0xF0,
            pm1a_event: 0x600,
            pm1b_event: 0,
            pm1a_control: 0x604,
            pm1b_control: 0,
            pm_timer: 0x608,
            flags: 0,
            reset: None,
        }
    }
}

impl FadtBuilder {
    pub fn build(&self) -> Vec<u8> {
        let mut p = vec![0u8; self.length - SDT_HEADER_LEN];
        // Offsets below are relative to the end of the header.
        let mut put = |offset: usize, bytes: &[u8]| {
            let at = offset - SDT_HEADER_LEN;
            if at + bytes.len() <= p.len() {
                p[at..at + bytes.len()].copy_from_slice(bytes);
            }
        };
        put(36, &self.firmware_ctrl.to_le_bytes());
        put(40, &self.dsdt.to_le_bytes());
        put(46, &self.sci_interrupt.to_le_bytes());
        put(48, &self.smi_command.to_le_bytes());
        put(52, &[self.acpi_enable]);
        put(53, &[self.acpi_disable]);
        put(56, &self.pm1a_event.to_le_bytes());
        put(60, &self.pm1b_event.to_le_bytes());
        put(64, &self.pm1a_control.to_le_bytes());
        put(68, &self.pm1b_control.to_le_bytes());
        put(76, &self.pm_timer.to_le_bytes());
        put(88, &[4]);
        put(89, &[2]);
        put(91, &[4]);
        put(112, &self.flags.to_le_bytes());
        if let Some((space, address, value)) = self.reset {
            put(116, &[space, 8, 0, 1]);
            put(120, &address.to_le_bytes());
            put(128, &[value]);
        }
        sdt(b"FACP", self.revision, &p)
    }
}

/// Sparse physical memory assembled from byte regions.
pub struct FirmwareImage {
    regions: Vec<(u64, Vec<u8>)>,
}

impl FirmwareImage {
    /// The BIOS data area and the BIOS ROM window, both zeroed.
    pub fn new() -> Self {
        Self {
            regions: vec![
                (0x400, vec![0u8; 0x100]),
                (BIOS_ROM_START, vec![0u8; (BIOS_ROM_END - BIOS_ROM_START) as usize]),
            ],
        }
    }

    /// Store the EBDA segment in the BDA and back the EBDA with zeroes.
    pub fn set_ebda_segment(&mut self, segment: u16) {
        self.place(EBDA_SEGMENT_PTR, segment.to_le_bytes().to_vec());
        let base = u64::from(segment) << 4;
        if self.region_for(base, EBDA_SEARCH_LEN as usize).is_none() {
            self.regions.push((base, vec![0u8; EBDA_SEARCH_LEN as usize]));
        }
    }

    /// Copy `bytes` to `addr`, inside an existing region if one covers it.
    pub fn place(&mut self, addr: u64, bytes: Vec<u8>) {
        match self.region_for(addr, bytes.len()) {
            Some(i) => {
                let (base, region) = &mut self.regions[i];
                let at = (addr - *base) as usize;
                region[at..at + bytes.len()].copy_from_slice(&bytes);
            }
            None => self.regions.push((addr, bytes)),
        }
    }

    fn region_for(&self, addr: u64, len: usize) -> Option<usize> {
        self.regions.iter().position(|(base, region)| {
            addr >= *base && addr + len as u64 <= *base + region.len() as u64
        })
    }

    pub fn memory(&self) -> Vec<MemoryWindow<'_>> {
        self.regions
            .iter()
            .map(|(base, bytes)| MemoryWindow::new(*base, bytes))
            .collect()
    }
}

pub const RSDP_AT: u64 = 0xF0000;
pub const RSDT_AT: u64 = 0x7FE0_0000;
pub const XSDT_AT: u64 = 0x7FE0_0200;
pub const FADT_AT: u64 = 0x7FE0_1000;

/// A revision 2 RSDP whose RSDT and XSDT both list a single FADT.
pub fn image_with_fadt(fadt: &FadtBuilder) -> FirmwareImage {
    let mut image = FirmwareImage::new();
    image.place(RSDP_AT, rsdp_v2(RSDT_AT as u32, XSDT_AT));
    image.place(RSDT_AT, rsdt(&[FADT_AT as u32]));
    image.place(XSDT_AT, xsdt(&[FADT_AT]));
    image.place(FADT_AT, fadt.build());
    image
}
